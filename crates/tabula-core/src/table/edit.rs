//! Verbs that add, move or touch up rows: add, ditto, dup, gen, label,
//! noblanks, nospace, pop, push, rule.

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use tabula_engine::engine::{Value, classify, column_letter};

use super::{Annotation, Diagnostic, Table};

const DITTO: &str = "\"";
const DEFAULT_GENERATED_ROWS: i64 = 10;
/// `gen` refuses to build more rows than this.
const MAX_GENERATED_ROWS: i64 = 1_000_000;

fn range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(-?\d+)\D(-?\d+)$").expect("range regex must compile"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Footer {
    Sum,
    Mean,
    Median,
    Min,
    Max,
}

/// The rows `add summary` appends, in order.
const SUMMARY: [(Footer, &str); 4] = [
    (Footer::Min, "Min"),
    (Footer::Median, "Median"),
    (Footer::Mean, "Mean"),
    (Footer::Max, "Max"),
];

impl Footer {
    fn parse(name: &str) -> Option<(Footer, &'static str)> {
        Some(match name {
            "" | "total" => (Footer::Sum, "Total"),
            "sum" => (Footer::Sum, "Sum"),
            "mean" => (Footer::Mean, "Mean"),
            "median" => (Footer::Median, "Median"),
            "min" => (Footer::Min, "Min"),
            "max" => (Footer::Max, "Max"),
            _ => return None,
        })
    }

    fn apply(self, mut values: Vec<Decimal>, finish: impl Fn(Decimal) -> Decimal) -> Option<Decimal> {
        let sum = |values: &[Decimal]| {
            values
                .iter()
                .try_fold(Decimal::ZERO, |acc, n| acc.checked_add(*n).map(&finish))
        };
        match self {
            Footer::Sum => sum(&values),
            Footer::Mean => sum(&values)?
                .checked_div(Decimal::from(values.len()))
                .map(|d| finish(d).normalize()),
            Footer::Median => {
                values.sort();
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    values[mid - 1]
                        .checked_add(values[mid])
                        .and_then(|s| s.checked_div(Decimal::TWO))
                        .map(|d| finish(d).normalize())
                } else {
                    Some(values[mid])
                }
            }
            Footer::Min => values.into_iter().min(),
            Footer::Max => values.into_iter().max(),
        }
    }
}

impl Table {
    /// Append a rule and a footer row reducing each numeric column.
    /// Columns with no numbers show the reduction's name. `summary` appends
    /// min, median, mean and max rows, each reducing everything above it.
    pub fn add_footer(&mut self, name: &str) {
        let name = name.trim().to_lowercase();
        if name == "summary" {
            self.annotate(Annotation::Rule);
            for (footer, label) in SUMMARY {
                let row = self.footer_row(footer, label);
                self.append(row);
            }
            return;
        }
        let Some((footer, label)) = Footer::parse(&name) else {
            self.report(Diagnostic::Unknown(name));
            return;
        };
        let row = self.footer_row(footer, label);
        self.annotate(Annotation::Rule);
        self.append(row);
    }

    fn footer_row(&self, footer: Footer, label: &str) -> Vec<String> {
        let precision = self.options.precision;
        (0..self.cols)
            .map(|c| {
                let numbers: Vec<Decimal> = self
                    .data
                    .iter()
                    .filter_map(|row| match classify(&row[c]) {
                        Value::Number(n) => Some(n),
                        _ => None,
                    })
                    .collect();
                if numbers.is_empty() {
                    return label.to_string();
                }
                footer
                    .apply(numbers, |d| precision.finish(d))
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| self.options.filler.clone())
            })
            .collect()
    }

    /// Replace ditto marks with the cell above.
    pub fn ditto(&mut self) {
        for r in 1..self.rows() {
            for c in 0..self.cols {
                if self.data[r][c] == DITTO {
                    self.data[r][c] = self.data[r - 1][c].clone();
                }
            }
        }
    }

    /// Append numbered rows: `gen 5` gives 1 to 5, `gen 3-7` gives 3 to 7.
    pub fn generate(&mut self, arg: &str) {
        let arg = arg.trim();
        let (mut first, mut last) = match arg.parse::<i64>() {
            Ok(n) => (1, n),
            Err(_) => match range_re().captures(arg) {
                Some(caps) => (
                    caps[1].parse().unwrap_or(1),
                    caps[2].parse().unwrap_or(DEFAULT_GENERATED_ROWS),
                ),
                None => (1, DEFAULT_GENERATED_ROWS),
            },
        };
        if first > last {
            std::mem::swap(&mut first, &mut last);
        }
        if last.saturating_sub(first) >= MAX_GENERATED_ROWS {
            self.report(Diagnostic::Unknown(arg.to_string()));
            return;
        }
        for i in first..=last {
            self.append(vec![i.to_string()]);
        }
    }

    /// Insert a header row of column letters. Annotations stay with their
    /// rows; one above the first row stays above the new header.
    pub fn label(&mut self) {
        let header = (0..self.cols)
            .map(|c| column_letter(c).map_or_else(|| c.to_string(), |l| l.to_string()))
            .collect();
        self.data.insert(0, header);
        let old = std::mem::take(&mut self.annotations);
        self.annotations = old
            .into_iter()
            .map(|(index, set)| (if index == 0 { 0 } else { index + 1 }, set))
            .collect();
    }

    pub fn remove_blanks(&mut self) {
        for set in self.annotations.values_mut() {
            set.remove(&Annotation::Blank);
        }
        self.annotations.retain(|_, set| !set.is_empty());
    }

    /// Close up the spaces inside cells: joined with `fill`, or run together
    /// in CamelCase when `fill` is empty.
    pub fn remove_spaces(&mut self, fill: &str) {
        let fill = fill.trim();
        for cell in self.data.iter_mut().flatten() {
            if !cell.contains(char::is_whitespace) {
                continue;
            }
            *cell = if fill.is_empty() {
                cell.split_whitespace().map(capitalize).collect()
            } else {
                cell.split_whitespace().collect::<Vec<_>>().join(fill)
            };
        }
    }

    /// Take out a row (the last by default) and keep it for `push`.
    /// Annotations stay where they are.
    pub fn pop(&mut self, arg: &str) {
        let Some(last) = self.rows().checked_sub(1) else {
            return;
        };
        let Some(index) = self.row_arg(arg, last) else {
            return;
        };
        if let Some(row) = self.remove_row(index) {
            self.popped.push(row);
        }
    }

    /// Put back the most recently popped row, at the end by default.
    pub fn push(&mut self, arg: &str) {
        let Some(index) = self.row_arg(arg, self.rows()) else {
            return;
        };
        if let Some(row) = self.popped.pop() {
            self.insert_row(index, row);
        }
    }

    /// Repeat a row (the last by default) just below itself.
    pub fn duplicate(&mut self, arg: &str) {
        let Some(last) = self.rows().checked_sub(1) else {
            return;
        };
        let Some(index) = self.row_arg(arg, last) else {
            return;
        };
        if let Some(row) = self.data.get(index).cloned() {
            self.insert_row(index + 1, row);
        }
    }

    /// Draw a rule before row `arg`, or after the last row.
    pub fn rule(&mut self, arg: &str) {
        let Some(index) = self.row_arg(arg, self.rows()) else {
            return;
        };
        self.annotations
            .entry(index.min(self.rows()))
            .or_default()
            .insert(Annotation::Rule);
    }

    /// A row number argument: empty means `default`, negatives count back
    /// from the end. Out of range negatives give `None` quietly.
    fn row_arg(&mut self, arg: &str, default: usize) -> Option<usize> {
        let arg = arg.trim();
        if arg.is_empty() {
            return Some(default);
        }
        match arg.parse::<i64>() {
            Ok(n) if n >= 0 => usize::try_from(n).ok(),
            Ok(n) => usize::try_from(n.unsigned_abs())
                .ok()
                .and_then(|back| self.rows().checked_sub(back)),
            Err(_) => {
                self.report(Diagnostic::Unknown(arg.to_string()));
                None
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
