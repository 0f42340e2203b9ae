use super::{Diagnostic, Table};

/// One resolved column specifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ColumnSpec {
    pub index: usize,
    /// The letter was upper case (descending sort, roll up).
    pub upper: bool,
}

impl Table {
    /// Resolve a single-character column specifier.
    ///
    /// Letters count from `a`, digits from `0`; both clamp to the last
    /// column. Anything else is reported and yields `None`.
    pub(crate) fn column_spec(&mut self, spec: char) -> Option<ColumnSpec> {
        if self.cols == 0 {
            return None;
        }
        let upper = spec.is_ascii_uppercase();
        let index = match spec.to_ascii_lowercase() {
            c @ 'a'..='z' => (c as u8 - b'a') as usize,
            c @ '0'..='9' => (c as u8 - b'0') as usize,
            _ => {
                self.report(Diagnostic::Unknown(spec.to_string()));
                return None;
            }
        };
        Some(ColumnSpec {
            index: index.min(self.cols - 1),
            upper,
        })
    }

    /// Resolve every character of `specs`, skipping (and reporting) the bad
    /// ones. An empty string means `default`.
    pub(crate) fn column_specs(&mut self, specs: &str, default: &str) -> Vec<ColumnSpec> {
        let specs = if specs.trim().is_empty() { default } else { specs };
        specs
            .chars()
            .filter(|c| !c.is_whitespace())
            .filter_map(|c| self.column_spec(c))
            .collect()
    }
}
