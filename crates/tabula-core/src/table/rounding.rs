use tabula_engine::engine::{reduce_to_significant_figures, round_to_places};

use super::{Diagnostic, Table};

impl Table {
    /// One digit per column, the last repeated for any remaining columns.
    fn digits_per_column(&mut self, spec: &str) -> Option<Vec<u32>> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }
        let digits: Option<Vec<u32>> = spec.chars().map(|c| c.to_digit(10)).collect();
        let Some(mut digits) = digits else {
            self.report(Diagnostic::Unknown(spec.to_string()));
            return None;
        };
        let last = *digits.last()?;
        if digits.len() < self.cols {
            digits.resize(self.cols, last);
        }
        Some(digits)
    }

    fn round_cells(&mut self, digits: &[u32], round: fn(&str, u32) -> String) {
        for row in &mut self.data {
            for (cell, n) in row.iter_mut().zip(digits) {
                *cell = round(cell, *n);
            }
        }
    }

    /// Round numbers to a fixed number of decimal places.
    pub fn decimal_places(&mut self, spec: &str) {
        if let Some(digits) = self.digits_per_column(spec) {
            self.round_cells(&digits, round_to_places);
        }
    }

    /// Round numbers to significant figures.
    pub fn significant_figures(&mut self, spec: &str) {
        if let Some(digits) = self.digits_per_column(spec) {
            self.round_cells(&digits, reduce_to_significant_figures);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableOptions;

    fn table(rows: &[&[&str]]) -> Table {
        Table::from_rows(rows.iter().map(|r| r.iter().copied()), TableOptions::default())
    }

    #[test]
    fn test_last_digit_repeats() {
        let mut t = table(&[&["1.2345", "2.5", "3.14159"]]);
        t.decimal_places("20");
        assert_eq!(t.data()[0], vec!["1.23", "2", "3"]);
    }

    #[test]
    fn test_text_passes_through() {
        let mut t = table(&[&["Total", "1234.5678"]]);
        t.significant_figures("3");
        assert_eq!(t.data()[0], vec!["Total", "1230"]);
    }

    #[test]
    fn test_bad_spec_reported() {
        let mut t = table(&[&["1.5"]]);
        t.decimal_places("x");
        assert_eq!(t.data()[0], vec!["1.5"]);
        assert_eq!(t.diagnostics().len(), 1);
    }
}
