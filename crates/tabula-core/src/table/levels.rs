//! `levels`: a one-line report on what each chosen column holds.

use rust_decimal::Decimal;
use tabula_engine::engine::{Value, classify, column_letter};

use super::{Diagnostic, Table};

impl Table {
    /// Describe the columns in `spec`. An upper case letter treats the first
    /// row as the column's name; a lower case one names the column by its
    /// letter and looks at every row.
    pub fn levels(&mut self, spec: &str) {
        for col in self.column_specs(spec, "") {
            let (name, values): (String, Vec<&str>) = if col.upper {
                (
                    self.data.first().map_or_else(String::new, |r| r[col.index].clone()),
                    self.data.iter().skip(1).map(|r| r[col.index].as_str()).collect(),
                )
            } else {
                (
                    spec_letter(col.index),
                    self.data.iter().map(|r| r[col.index].as_str()).collect(),
                )
            };
            let report = format!("# {name}: {}", self.describe(&values));
            self.report(Diagnostic::Note(report));
        }
    }

    fn describe(&self, values: &[&str]) -> String {
        let numbers: Option<Vec<(Decimal, &str)>> = values
            .iter()
            .map(|v| match classify(v) {
                Value::Number(n) => Some((n, *v)),
                _ => None,
            })
            .collect();
        match numbers {
            Some(numbers) if !numbers.is_empty() => self.describe_numbers(numbers),
            _ => describe_words(values),
        }
    }

    fn describe_numbers(&self, mut numbers: Vec<(Decimal, &str)>) -> String {
        numbers.sort_by(|a, b| a.0.cmp(&b.0));
        let sorted: Vec<Decimal> = numbers.iter().map(|(n, _)| *n).collect();
        let filler = &self.options.filler;
        let quarter = |i, places| {
            quartile(&sorted, i).map_or_else(|| filler.clone(), |q| at_least_places(q, places))
        };
        let total = sorted
            .iter()
            .try_fold(Decimal::ZERO, |acc, n| acc.checked_add(*n));
        let mean = total
            .and_then(|t| t.checked_div(Decimal::from(sorted.len())))
            .map_or_else(
                || filler.clone(),
                |m| self.options.precision.finish(m).normalize().to_string(),
            );
        format!(
            "Min: {}  Q25: {}  Median: {}  Mean: {}  Q75: {}  Max: {}",
            numbers[0].1,
            quarter(1, 2),
            quarter(2, 1),
            mean,
            quarter(3, 2),
            numbers[numbers.len() - 1].1,
        )
    }
}

fn spec_letter(index: usize) -> String {
    column_letter(index).map_or_else(|| index.to_string(), |l| l.to_string())
}

fn describe_words(values: &[&str]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == *value) {
            Some((_, n)) => *n += 1,
            None => counts.push((*value, 1)),
        }
    }
    if counts.iter().all(|(_, n)| *n == 1) {
        return "All distinct.".to_string();
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .iter()
        .map(|(v, n)| format!("{v} {n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The `i`th quarter point of sorted values, interpolating inclusively.
fn quartile(sorted: &[Decimal], i: usize) -> Option<Decimal> {
    let m = sorted.len() - 1;
    let j = i * m / 4;
    let delta = Decimal::from(i * m - 4 * j);
    let low = *sorted.get(j)?;
    let high = sorted.get(j + 1).copied().unwrap_or(low);
    let four = Decimal::from(4);
    low.checked_mul(four - delta)?
        .checked_add(high.checked_mul(delta)?)?
        .checked_div(four)
}

fn at_least_places(value: Decimal, places: u32) -> String {
    let mut value = value.normalize();
    if value.scale() < places {
        value.rescale(places);
    }
    value.to_string()
}
