//! Name bindings visible to a formula.
//!
//! A fresh [`EvalContext`] is built for every row. Column letters `a`, `b`,
//! ... hold the row's classified cells and the upper-case letters hold running
//! totals of each column, carried between rows by [`Accumulators`].

use rust_decimal::Decimal;
use std::collections::HashMap;

use super::classify::classify;
use super::value::Value;

/// Letter naming column `index`, if it has one.
pub fn column_letter(index: usize) -> Option<char> {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| (b'a' + i) as char)
}

/// Column letters for a table `cols` wide (`"abc..."`).
pub fn column_letters(cols: usize) -> String {
    (0..cols).filter_map(column_letter).collect()
}

#[derive(Clone, Debug, Default)]
pub struct EvalContext {
    values: HashMap<String, Value>,
}

impl EvalContext {
    pub fn new() -> EvalContext {
        EvalContext::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Context for one row of a table.
    ///
    /// Numeric cells are added into the running totals before the context is
    /// returned, so `B` on row 3 includes row 3's `b`.
    pub fn for_row(
        row: &[String],
        row_number: usize,
        stats: &TableStats,
        accumulators: &mut Accumulators,
    ) -> EvalContext {
        let mut ctx = EvalContext::new();
        let mut row_total = Decimal::ZERO;

        for (i, cell) in row.iter().enumerate() {
            let Some(letter) = column_letter(i) else {
                break;
            };
            let value = classify(cell);
            if let Value::Number(n) = value {
                accumulators.add(i, n);
                row_total = row_total.checked_add(n).unwrap_or(row_total);
            }
            ctx.set(letter.to_string(), value);
            ctx.set(
                letter.to_ascii_uppercase().to_string(),
                Value::Number(accumulators.total(i)),
            );
        }

        // x y z w address the last columns from the end, unless a real
        // column already has that letter.
        for (back, alias) in ["z", "y", "x", "w"].iter().enumerate() {
            if ctx.contains(alias) || row.len() <= back {
                continue;
            }
            let index = row.len() - 1 - back;
            if let Some(value) = column_letter(index).and_then(|l| ctx.get(&l.to_string())) {
                let value = value.clone();
                ctx.set(*alias, value);
            }
        }

        ctx.set("row_number", Decimal::from(row_number));
        ctx.set("rows", Decimal::from(stats.rows));
        ctx.set("cols", Decimal::from(stats.cols));
        ctx.set("total", stats.total);
        ctx.set("row_total", row_total);
        ctx
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// Whole-table figures computed once per operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableStats {
    pub rows: usize,
    pub cols: usize,
    pub total: Decimal,
}

impl TableStats {
    pub fn of(data: &[Vec<String>]) -> TableStats {
        let cols = data.iter().map(Vec::len).max().unwrap_or(0);
        let total = data
            .iter()
            .flatten()
            .filter_map(|cell| match classify(cell) {
                Value::Number(n) => Some(n),
                _ => None,
            })
            .fold(Decimal::ZERO, |acc, n| acc.checked_add(n).unwrap_or(acc));
        TableStats {
            rows: data.len(),
            cols,
            total,
        }
    }
}

/// Running per-column sums, threaded from one row's evaluation to the next.
#[derive(Clone, Debug, Default)]
pub struct Accumulators {
    totals: Vec<Decimal>,
}

impl Accumulators {
    pub fn new(cols: usize) -> Accumulators {
        Accumulators {
            totals: vec![Decimal::ZERO; cols],
        }
    }

    pub fn add(&mut self, col: usize, n: Decimal) {
        if col >= self.totals.len() {
            self.totals.resize(col + 1, Decimal::ZERO);
        }
        self.totals[col] = self.totals[col].checked_add(n).unwrap_or(self.totals[col]);
    }

    pub fn total(&self, col: usize) -> Decimal {
        self.totals.get(col).copied().unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(3), "abc");
        assert_eq!(column_letter(25), Some('z'));
        assert_eq!(column_letter(26), None);
    }

    #[test]
    fn test_row_binding() {
        let data = vec![row(&["x", "4"]), row(&["y", "6"])];
        let stats = TableStats::of(&data);
        let mut acc = Accumulators::new(2);
        let ctx = EvalContext::for_row(&data[0], 1, &stats, &mut acc);
        assert_eq!(ctx.get("a"), Some(&Value::text("x")));
        assert_eq!(ctx.get("b"), Some(&Value::Number(Decimal::from(4))));
        assert_eq!(ctx.get("total"), Some(&Value::Number(Decimal::from(10))));
        assert_eq!(ctx.get("rows"), Some(&Value::Number(Decimal::from(2))));
    }

    #[test]
    fn test_accumulators_carry_between_rows() {
        let data = vec![row(&["1.5"]), row(&["2"]), row(&["x"])];
        let stats = TableStats::of(&data);
        let mut acc = Accumulators::new(1);
        let mut last = None;
        for (i, r) in data.iter().enumerate() {
            last = Some(EvalContext::for_row(r, i + 1, &stats, &mut acc));
        }
        let ctx = last.unwrap();
        assert_eq!(ctx.get("A"), Some(&Value::Number(Decimal::from_str("3.5").unwrap())));
    }

    #[test]
    fn test_aliases_from_the_end() {
        let data = vec![row(&["1", "2", "3", "4", "5"])];
        let stats = TableStats::of(&data);
        let mut acc = Accumulators::new(5);
        let ctx = EvalContext::for_row(&data[0], 1, &stats, &mut acc);
        assert_eq!(ctx.get("z"), Some(&Value::Number(Decimal::from(5))));
        assert_eq!(ctx.get("y"), Some(&Value::Number(Decimal::from(4))));
        assert_eq!(ctx.get("x"), Some(&Value::Number(Decimal::from(3))));
        assert_eq!(ctx.get("w"), Some(&Value::Number(Decimal::from(2))));
    }

    #[test]
    fn test_row_total_ignores_text() {
        let data = vec![row(&["Mon", "2", "3.5"])];
        let stats = TableStats::of(&data);
        let mut acc = Accumulators::new(3);
        let ctx = EvalContext::for_row(&data[0], 1, &stats, &mut acc);
        assert_eq!(
            ctx.get("row_total"),
            Some(&Value::Number(Decimal::from_str("5.5").unwrap()))
        );
    }
}
