//! Verbs that run formulas: `arr`, `tap` and `filter`.

use rust_decimal::Decimal;
use tabula_engine::builtins::random_decimal;
use tabula_engine::engine::{
    Accumulators, CompiledExpr, EvalContext, Fallback, TableStats, Value, classify, column_letters,
    compile, evaluate_with,
};
use tracing::debug;

use super::{Diagnostic, Table};

/// Pseudo-columns: row number, row count, random number.
const SPECIALS: &str = ".;?";

/// One output column of `arr`.
enum Term {
    Copy(usize),
    RowNumber,
    RowCount,
    Random,
    Formula(CompiledExpr),
}

/// Split an `arr` argument into single-character terms and parenthesised
/// formulas. `{...}` is accepted for `(...)`; an unclosed formula is closed.
fn split_terms(perm: &str, identity: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut token = String::new();
    let mut depth = 0usize;
    for c in perm.chars() {
        let c = match c {
            '{' => '(',
            '}' => ')',
            other => other,
        };
        let known = identity.contains(c.to_ascii_lowercase()) || SPECIALS.contains(c);
        if depth == 0 && !known && c != '(' {
            continue;
        }
        token.push(c);
        match c {
            '(' => {
                depth += 1;
                continue;
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 {
            terms.push(std::mem::take(&mut token));
        }
    }
    if !token.is_empty() {
        token.push_str(&")".repeat(depth));
        terms.push(token);
    }
    terms
}

impl Table {
    /// Rearrange, delete, duplicate or compute columns.
    pub fn arrange(&mut self, perm: &str) {
        self.try_arrange(perm);
    }

    /// `arrange`, reporting whether the table changed shape as asked (false
    /// when a formula failed to compile).
    pub(crate) fn try_arrange(&mut self, perm: &str) -> bool {
        let identity = column_letters(self.cols);
        let mut perm = perm.replace('~', &identity);
        if perm == "-z" {
            perm = identity.chars().take(self.cols.saturating_sub(1)).collect();
        } else if let Some(deleted) = perm.strip_prefix('-') {
            perm = identity.chars().filter(|c| !deleted.contains(*c)).collect();
        }

        let mut terms = Vec::new();
        for text in split_terms(&perm, &identity) {
            let term = match text.as_str() {
                "." => Term::RowNumber,
                ";" => Term::RowCount,
                "?" => Term::Random,
                t if t.len() == 1 && identity.contains(t) => {
                    Term::Copy(identity.find(t).unwrap_or(0))
                }
                t => match compile(t) {
                    Ok(compiled) => Term::Formula(compiled),
                    Err(err) => {
                        self.report(Diagnostic::Compile(err));
                        return false;
                    }
                },
            };
            terms.push(term);
        }
        debug!(perm, terms = terms.len(), "arrange");

        let stats = TableStats::of(&self.data);
        let mut accumulators = Accumulators::new(self.cols);
        let rows = self.rows();
        let precision = self.options.precision;
        let filler = self.options.filler.clone();
        let data: Vec<Vec<String>> = self
            .data
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let needs_context = terms.iter().any(|t| matches!(t, Term::Formula(_)));
                let ctx = needs_context
                    .then(|| EvalContext::for_row(row, i + 1, &stats, &mut accumulators));
                let mut out = Vec::with_capacity(terms.len());
                for term in &terms {
                    match term {
                        Term::Copy(c) => out.push(row.get(*c).cloned().unwrap_or_default()),
                        Term::RowNumber => out.push((i + 1).to_string()),
                        Term::RowCount => out.push(rows.to_string()),
                        Term::Random => out.push(random_decimal().to_string()),
                        Term::Formula(compiled) => {
                            let Some(ctx) = &ctx else { continue };
                            match evaluate_with(compiled, ctx, precision) {
                                Ok(result) => out.extend(result.into_cells()),
                                Err(Fallback::Substituted(text)) => out.push(text),
                                Err(Fallback::Missing) => out.push(filler.clone()),
                            }
                        }
                    }
                }
                out
            })
            .collect();
        self.replace_rows(data);
        true
    }

    /// Apply a formula to every numeric cell, bound to `x`.
    ///
    /// A formula starting with an operator works on `x` directly, so `tap
    /// *2` doubles every number. Cells whose evaluation falls back are left
    /// as they were.
    pub fn tap(&mut self, formula: &str) {
        let formula = formula.trim();
        if formula.is_empty() {
            return;
        }
        let source = if formula.starts_with(['+', '-', '*', '/', '%', '<', '>', '=', '!']) {
            format!("x{formula}")
        } else {
            formula.to_string()
        };
        let compiled = match compile(&source) {
            Ok(c) => c,
            Err(err) => {
                self.report(Diagnostic::Compile(err.relabel(formula)));
                return;
            }
        };

        let stats = TableStats::of(&self.data);
        let numbers: Vec<Vec<Option<Decimal>>> = self
            .data
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match classify(cell) {
                        Value::Number(n) => Some(n),
                        _ => None,
                    })
                    .collect()
            })
            .collect();
        let sum = |values: &mut dyn Iterator<Item = Decimal>| {
            values.fold(Decimal::ZERO, |acc, n| acc.checked_add(n).unwrap_or(acc))
        };
        let col_totals: Vec<Decimal> = (0..self.cols)
            .map(|c| sum(&mut numbers.iter().filter_map(|r| r.get(c).copied().flatten())))
            .collect();

        let precision = self.options.precision;
        let mut data = Vec::with_capacity(self.rows());
        for (r, row) in self.data.iter().enumerate() {
            let row_total = sum(&mut numbers[r].iter().copied().flatten());
            let mut out = Vec::with_capacity(row.len());
            for (c, cell) in row.iter().enumerate() {
                let Some(x) = numbers[r][c] else {
                    out.push(cell.clone());
                    continue;
                };
                let mut ctx = EvalContext::new();
                ctx.set("x", x);
                ctx.set("row_total", row_total);
                ctx.set("col_total", col_totals[c]);
                ctx.set("total", stats.total);
                ctx.set("row_number", Decimal::from(r + 1));
                ctx.set("col_number", Decimal::from(c + 1));
                ctx.set("rows", Decimal::from(stats.rows));
                ctx.set("cols", Decimal::from(stats.cols));
                match evaluate_with(&compiled, &ctx, precision) {
                    Ok(result) => out.extend(result.into_cells()),
                    Err(_) => out.push(cell.clone()),
                }
            }
            data.push(out);
        }
        self.replace_rows(data);
    }

    /// Keep the rows for which `predicate` is true. Rows where it cannot be
    /// evaluated (a header, say) are kept.
    pub fn filter(&mut self, predicate: &str) {
        if predicate.trim().is_empty() {
            return;
        }
        let compiled = match compile(predicate) {
            Ok(c) => c,
            Err(err) => {
                self.report(Diagnostic::Compile(err));
                return;
            }
        };
        let stats = TableStats::of(&self.data);
        let mut accumulators = Accumulators::new(self.cols);
        let precision = self.options.precision;
        let keep: Vec<bool> = self
            .data
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let ctx = EvalContext::for_row(row, i + 1, &stats, &mut accumulators);
                match evaluate_with(&compiled, &ctx, precision) {
                    Ok(result) => result.is_truthy(),
                    Err(_) => true,
                }
            })
            .collect();
        debug!(predicate, kept = keep.iter().filter(|k| **k).count(), "filter");
        self.retain_rows(&keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableOptions;

    fn table(rows: &[&[&str]]) -> Table {
        Table::from_rows(rows.iter().map(|r| r.iter().copied()), TableOptions::default())
    }

    fn cells(t: &Table) -> Vec<Vec<&str>> {
        t.data()
            .iter()
            .map(|r| r.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_split_terms() {
        assert_eq!(split_terms("ab(a+b)c", "abc"), vec!["a", "b", "(a+b)", "c"]);
        assert_eq!(split_terms("a{b*2}", "abc"), vec!["a", "(b*2)"]);
        assert_eq!(split_terms("a(b*(c+1)", "abc"), vec!["a", "(b*(c+1))"]);
        assert_eq!(split_terms("aC.", "abc"), vec!["a", "C", "."]);
        assert_eq!(split_terms("a x", "abc"), vec!["a"]);
    }

    #[test]
    fn test_identity_and_permutation() {
        let mut t = table(&[&["1", "2", "3"], &["4", "5", "6"]]);
        t.arrange("abc");
        assert_eq!(cells(&t), vec![vec!["1", "2", "3"], vec!["4", "5", "6"]]);
        t.arrange("cab");
        assert_eq!(cells(&t), vec![vec!["3", "1", "2"], vec!["6", "4", "5"]]);
    }

    #[test]
    fn test_delete_columns() {
        let mut t = table(&[&["1", "2", "3"]]);
        t.arrange("-b");
        assert_eq!(cells(&t), vec![vec!["1", "3"]]);
        let mut t = table(&[&["1", "2", "3"]]);
        t.arrange("-z");
        assert_eq!(cells(&t), vec![vec!["1", "2"]]);
    }

    #[test]
    fn test_pseudo_columns() {
        let mut t = table(&[&["x"], &["y"]]);
        t.arrange(".a;");
        assert_eq!(cells(&t), vec![vec!["1", "x", "2"], vec!["2", "y", "2"]]);
    }

    #[test]
    fn test_formula_column() {
        let mut t = table(&[&["30.2", "135", "4.5"]]);
        t.arrange("~(sqrt(b))");
        assert_eq!(cells(&t), vec![vec!["30.2", "135", "4.5", "11.6189500386"]]);
    }

    #[test]
    fn test_running_total_column() {
        let mut t = table(&[&["1"], &["2"], &["3"]]);
        t.arrange("aA");
        assert_eq!(cells(&t), vec![vec!["1", "1"], vec!["2", "3"], vec!["3", "6"]]);
    }

    #[test]
    fn test_formula_fallback_and_missing() {
        let mut t = table(&[&["Price", "Qty"], &["6", "0"]]);
        t.arrange("ab(a/b)");
        assert_eq!(cells(&t), vec![vec!["Price", "Qty", "Price/Qty"], vec!["6", "0", "-"]]);
    }

    #[test]
    fn test_compile_error_leaves_table() {
        let mut t = table(&[&["1", "2"]]);
        t.arrange("a(b+)");
        assert_eq!(cells(&t), vec![vec!["1", "2"]]);
        assert_eq!(t.diagnostics()[0].to_string(), "?! syntax (b+)");
    }

    #[test]
    fn test_tap() {
        let mut t = table(&[&["Mon", "2", "3.5"]]);
        t.tap("*2");
        assert_eq!(cells(&t), vec![vec!["Mon", "4", "7.0"]]);
        t.tap("x/row_total");
        assert_eq!(cells(&t), vec![vec!["Mon", "0.363636363636", "0.636363636364"]]);
    }

    #[test]
    fn test_tap_compile_error_uses_user_text() {
        let mut t = table(&[&["1"]]);
        t.tap("+(");
        assert_eq!(t.diagnostics()[0].to_string(), "?! tokens +(");
    }

    #[test]
    fn test_filter() {
        let mut t = table(&[&["Month", "Rain"], &["Jan", "12.5"], &["Feb", "8"], &["Mar", "10.1"]]);
        t.filter("b > 10");
        assert_eq!(
            cells(&t),
            vec![vec!["Month", "Rain"], vec!["Jan", "12.5"], vec!["Mar", "10.1"]]
        );
    }
}
