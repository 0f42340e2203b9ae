//! Verbs that reorder or reshape rows: sort, uniq, group, pivot, xp, roll,
//! shuffle.

use rand::seq::SliceRandom;
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::OnceLock;
use tabula_engine::engine::{parse_number, sort_key, strip_outer_parens};
use tracing::debug;

use super::{Annotation, Diagnostic, Table};

/// How `pivot wide` folds the values collected for one (key, name) cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reduction {
    Sum,
    Count,
    Mean,
    Any,
    First,
    Last,
}

const REDUCTIONS: &[(&str, Reduction)] = &[
    ("wide", Reduction::Sum),
    ("sum", Reduction::Sum),
    ("count", Reduction::Count),
    ("mean", Reduction::Mean),
    ("any", Reduction::Any),
    ("first", Reduction::First),
    ("last", Reduction::Last),
];

const NOT_AVAILABLE: &str = "NA";

fn long_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^long([1-9a-o])?$").expect("pivot long regex must compile"))
}

fn is_simple_sort_spec(spec: &str) -> bool {
    spec.chars().all(|c| c.is_ascii_alphanumeric())
}

impl Table {
    /// Stable sort by one or more columns, leftmost key first. An upper-case
    /// letter sorts that key descending. Anything other than column letters is
    /// treated as a formula to sort by. A leading `@` keeps the first row in
    /// place as a header.
    pub fn sort(&mut self, spec: &str) {
        if let Some(rest) = spec.trim_start().strip_prefix('@') {
            self.holding_header(|t| t.sort(rest));
            return;
        }
        let compact: String = spec.chars().filter(|c| !c.is_whitespace()).collect();
        if !compact.is_empty() && !is_simple_sort_spec(&compact) {
            self.sort_by_formula(spec.trim());
            return;
        }
        let keys = self.column_specs(&compact, "a");
        for key in keys.into_iter().rev() {
            let i = key.index;
            if key.upper {
                self.data
                    .sort_by_cached_key(|row| Reverse(sort_key(row.get(i).map(String::as_str), true)));
            } else {
                self.data
                    .sort_by_cached_key(|row| sort_key(row.get(i).map(String::as_str), false));
            }
        }
    }

    fn sort_by_formula(&mut self, formula: &str) {
        let cols = self.cols;
        let inner = strip_outer_parens(formula).unwrap_or(formula);
        if !self.try_arrange(&format!("~({inner})")) {
            return;
        }
        let Some(key_col) = self.cols.checked_sub(1).filter(|k| *k >= cols) else {
            return;
        };
        self.data
            .sort_by_cached_key(|row| sort_key(row.get(key_col).map(String::as_str), false));
        let data = self
            .data
            .iter()
            .map(|row| row[..cols.min(row.len())].to_vec())
            .collect();
        self.replace_rows(data);
    }

    /// Drop a row when its key columns match the row above. Only adjacent
    /// duplicates go, so sort first for a global dedup.
    pub fn uniq(&mut self, spec: &str) {
        let cols: Vec<usize> = if spec.trim().is_empty() {
            (0..self.cols).collect()
        } else {
            self.column_specs(spec, "a").iter().map(|s| s.index).collect()
        };
        if cols.is_empty() {
            return;
        }
        let key = |row: &Vec<String>| cols.iter().map(|c| row[*c].clone()).collect::<Vec<_>>();
        let mut keep = Vec::with_capacity(self.rows());
        let mut previous: Option<Vec<String>> = None;
        for row in &self.data {
            let this = key(row);
            keep.push(previous.as_ref() != Some(&this));
            previous = Some(this);
        }
        self.retain_rows(&keep);
    }

    /// Put a blank line before each row whose key differs from the row above,
    /// unless a rule is already there.
    pub fn group(&mut self, spec: &str) {
        let cols: Vec<usize> = self.column_specs(spec, "a").iter().map(|s| s.index).collect();
        if cols.is_empty() {
            return;
        }
        let changes: Vec<usize> = (1..self.rows())
            .filter(|r| cols.iter().any(|c| self.data[*r][*c] != self.data[r - 1][*c]))
            .collect();
        for r in changes {
            if !self.has_annotation(r, &Annotation::Rule) {
                self.annotations.entry(r).or_default().insert(Annotation::Blank);
            }
        }
    }

    /// Reshape between wide and long form. Row 0 is the header.
    pub fn pivot(&mut self, shape: &str) {
        let shape = shape.trim();
        if shape.is_empty() || self.cols < 3 || self.rows() == 0 {
            return;
        }
        let lower = shape.to_lowercase();
        let rule_under_header = self.has_annotation(1, &Annotation::Rule);

        if let Some((_, reduction)) = REDUCTIONS.iter().find(|(name, _)| name.starts_with(&lower)) {
            self.pivot_wide(*reduction);
        } else if let Some(caps) = long_re().captures(&lower) {
            let keys = match caps.get(1).and_then(|m| m.as_str().chars().next()) {
                None => 1,
                Some(d @ '1'..='9') => (d as u8 - b'0') as usize,
                Some(l) => (l as u8 - b'a') as usize + 1,
            };
            if self.cols <= keys + 1 {
                return;
            }
            self.pivot_long(keys);
        } else {
            self.report(Diagnostic::Unknown(shape.to_string()));
            return;
        }

        if rule_under_header && self.rows() > 1 {
            self.annotations.entry(1).or_default().insert(Annotation::Rule);
        }
    }

    fn pivot_wide(&mut self, reduction: Reduction) {
        let keys = self.cols - 2;
        let mut header = self.data[0][..keys].to_vec();
        let mut names: Vec<String> = Vec::new();
        let mut name_index: HashMap<String, usize> = HashMap::new();
        let mut key_rows: Vec<Vec<String>> = Vec::new();
        let mut key_index: HashMap<Vec<String>, usize> = HashMap::new();
        let mut bags: HashMap<(usize, usize), Vec<String>> = HashMap::new();

        for row in &self.data[1..] {
            let key = row[..keys].to_vec();
            let k = *key_index.entry(key.clone()).or_insert_with(|| {
                key_rows.push(key);
                key_rows.len() - 1
            });
            let name = &row[keys];
            let n = *name_index.entry(name.clone()).or_insert_with(|| {
                names.push(name.clone());
                names.len() - 1
            });
            bags.entry((k, n)).or_default().push(row[keys + 1].clone());
        }
        debug!(keys = key_rows.len(), names = names.len(), ?reduction, "pivot wide");

        let precision = self.options.precision;
        let mut data = Vec::with_capacity(key_rows.len() + 1);
        header.extend(names.iter().cloned());
        data.push(header);
        for (k, key) in key_rows.into_iter().enumerate() {
            let mut row = key;
            for n in 0..names.len() {
                let bag = bags.get(&(k, n)).map(Vec::as_slice).unwrap_or_default();
                row.push(reduce(bag, reduction, |d| precision.finish(d)));
            }
            data.push(row);
        }
        self.replace_data(data);
    }

    fn pivot_long(&mut self, keys: usize) {
        let mut header = self.data[0][..keys].to_vec();
        header.extend(["Name".to_string(), "Value".to_string()]);
        let names = self.data[0][keys..].to_vec();
        let mut data = vec![header];
        for row in &self.data[1..] {
            for (name, value) in names.iter().zip(&row[keys..]) {
                let mut out = row[..keys].to_vec();
                out.push(name.clone());
                out.push(value.clone());
                data.push(out);
            }
        }
        debug!(keys, rows = data.len(), "pivot long");
        self.replace_data(data);
    }

    /// Swap rows and columns.
    pub fn transpose(&mut self) {
        let data = (0..self.cols)
            .map(|c| self.data.iter().map(|row| row[c].clone()).collect())
            .collect();
        self.replace_data(data);
    }

    /// Rotate columns by one: a lower-case letter moves values down, upper
    /// case moves them up. With no spec the whole rows rotate down, leaving
    /// annotations where they are. A leading `@` keeps the header in place.
    pub fn roll(&mut self, spec: &str) {
        if let Some(rest) = spec.trim_start().strip_prefix('@') {
            self.holding_header(|t| t.roll(rest));
            return;
        }
        if self.rows() < 2 {
            return;
        }
        if spec.trim().is_empty() {
            self.data.rotate_right(1);
            return;
        }
        for col in self.column_specs(spec, "a") {
            let mut column: Vec<String> = self.data.iter().map(|r| r[col.index].clone()).collect();
            if col.upper {
                column.rotate_left(1);
            } else {
                column.rotate_right(1);
            }
            for (row, value) in self.data.iter_mut().zip(column) {
                row[col.index] = value;
            }
        }
    }

    /// Run `verb` on everything below the first row. Annotations are set
    /// aside and come back at the same positions.
    fn holding_header(&mut self, verb: impl FnOnce(&mut Table)) {
        let Some(header) = self.remove_row(0) else {
            return;
        };
        let annotations = std::mem::take(&mut self.annotations);
        verb(self);
        self.insert_row(0, header);
        self.annotations = annotations;
    }

    pub fn shuffle(&mut self) {
        self.data.shuffle(&mut rand::thread_rng());
        self.annotations.clear();
    }
}

fn reduce(bag: &[String], reduction: Reduction, finish: impl Fn(Decimal) -> Decimal) -> String {
    let numbers = || bag.iter().map(|v| parse_number(v).unwrap_or(Decimal::ZERO));
    let total = || {
        numbers().fold(Decimal::ZERO, |acc, n| finish(acc.checked_add(n).unwrap_or(acc)))
    };
    match reduction {
        Reduction::Sum => total().to_string(),
        Reduction::Count => bag.len().to_string(),
        Reduction::Mean => match Decimal::from(bag.len()) {
            n if n.is_zero() => NOT_AVAILABLE.to_string(),
            n => total()
                .checked_div(n)
                .map(|m| finish(m).to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        },
        Reduction::Any => {
            let any = numbers().any(|n| !n.is_zero());
            (if any { "True" } else { "False" }).to_string()
        }
        Reduction::First => bag.first().cloned().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        Reduction::Last => bag.last().cloned().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}
