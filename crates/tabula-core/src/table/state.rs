use std::collections::{BTreeMap, BTreeSet};
use tabula_engine::engine::{CompileError, Precision};
use thiserror::Error;

/// Default text for a missing cell.
pub const DEFAULT_FILLER: &str = "-";

/// Something drawn between rows rather than in them.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Annotation {
    Blank,
    Rule,
    Comment(String),
}

/// A problem with a verb's argument, shown alongside the table.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// The formula did not compile; the verb left the table alone.
    #[error("?! {0}")]
    Compile(CompileError),
    /// An unknown verb, column spec or reduction name.
    #[error("? {0}")]
    Unknown(String),
    /// A report about the table (`levels`), already formatted.
    #[error("{0}")]
    Note(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableOptions {
    pub precision: Precision,
    pub filler: String,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            precision: Precision::default(),
            filler: DEFAULT_FILLER.to_string(),
        }
    }
}

/// A rectangular grid of text cells with row annotations.
#[derive(Clone, Debug, Default)]
pub struct Table {
    pub(crate) data: Vec<Vec<String>>,
    pub(crate) cols: usize,
    /// Annotations keyed by the row they precede; `rows()` means after the
    /// last row.
    pub(crate) annotations: BTreeMap<usize, BTreeSet<Annotation>>,
    pub(crate) options: TableOptions,
    pub(crate) diagnostics: Vec<Diagnostic>,
    /// Rows taken out by `pop`, most recent last.
    pub(crate) popped: Vec<Vec<String>>,
    /// Leading spaces common to every input row, restored on output.
    pub indent: usize,
}

impl Table {
    pub fn new(options: TableOptions) -> Self {
        Table {
            options,
            ..Table::default()
        }
    }

    pub fn from_rows<I, R, S>(rows: I, options: TableOptions) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::new(options);
        for row in rows {
            table.append(row.into_iter().map(Into::into).collect());
        }
        table
    }

    pub fn rows(&self) -> usize {
        self.data.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[Vec<String>] {
        &self.data
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.data.get(index).map(Vec::as_slice)
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn annotations(&self) -> &BTreeMap<usize, BTreeSet<Annotation>> {
        &self.annotations
    }

    pub fn annotations_before(&self, row: usize) -> impl Iterator<Item = &Annotation> {
        self.annotations.get(&row).into_iter().flatten()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, "verb reported a problem");
        self.diagnostics.push(diagnostic);
    }

    /// Add a row, padding it or every existing row with the filler so the
    /// grid stays rectangular.
    pub fn append(&mut self, mut row: Vec<String>) {
        if row.len() > self.cols {
            self.cols = row.len();
            for existing in &mut self.data {
                existing.resize(self.cols, self.options.filler.clone());
            }
        }
        row.resize(self.cols, self.options.filler.clone());
        self.data.push(row);
    }

    /// Attach an annotation before the next row to be appended.
    pub fn annotate(&mut self, annotation: Annotation) {
        self.annotations
            .entry(self.rows())
            .or_default()
            .insert(annotation);
    }

    pub(crate) fn has_annotation(&self, row: usize, annotation: &Annotation) -> bool {
        self.annotations
            .get(&row)
            .is_some_and(|set| set.contains(annotation))
    }

    /// Replace the grid wholesale. Annotations no longer line up with rows
    /// and are dropped.
    pub(crate) fn replace_data(&mut self, data: Vec<Vec<String>>) {
        self.annotations.clear();
        self.replace_rows(data);
    }

    /// Replace the grid, keeping annotations at their row positions.
    pub(crate) fn replace_rows(&mut self, data: Vec<Vec<String>>) {
        self.data.clear();
        self.cols = 0;
        for row in data {
            self.append(row);
        }
        let rows = self.rows();
        self.annotations.retain(|index, _| *index <= rows);
    }

    /// Take out one row. Annotations keep their positions, so one past the
    /// new end is not drawn until the table grows back to it.
    pub(crate) fn remove_row(&mut self, index: usize) -> Option<Vec<String>> {
        (index < self.rows()).then(|| self.data.remove(index))
    }

    /// Put a row in before `index` (clamped to the end), padding as
    /// `append` does. Annotations keep their positions.
    pub(crate) fn insert_row(&mut self, index: usize, row: Vec<String>) {
        let index = index.min(self.rows());
        self.append(row);
        if let Some(row) = self.data.pop() {
            self.data.insert(index, row);
        }
    }

    /// Keep the rows flagged `true`. An annotation on a dropped row moves to
    /// the next row that survives.
    pub(crate) fn retain_rows(&mut self, keep: &[bool]) {
        let mut survivors_before = Vec::with_capacity(self.rows() + 1);
        let mut count = 0;
        for i in 0..=self.rows() {
            survivors_before.push(count);
            if keep.get(i).copied().unwrap_or(false) {
                count += 1;
            }
        }

        let old = std::mem::take(&mut self.annotations);
        for (index, set) in old {
            let target = survivors_before[index.min(survivors_before.len() - 1)];
            self.annotations.entry(target).or_default().extend(set);
        }

        let mut flags = keep.iter();
        self.data
            .retain(|_| flags.next().copied().unwrap_or(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> Table {
        Table::from_rows(rows.iter().map(|r| r.iter().copied()), TableOptions::default())
    }

    #[test]
    fn test_append_pads_short_and_long_rows() {
        let mut t = table(&[&["a", "b"]]);
        t.append(vec!["c".into()]);
        assert_eq!(t.data()[1], vec!["c", "-"]);
        t.append(vec!["1".into(), "2".into(), "3".into()]);
        assert_eq!(t.cols(), 3);
        assert_eq!(t.data()[0], vec!["a", "b", "-"]);
    }

    #[test]
    fn test_retain_moves_annotations_to_next_survivor() {
        let mut t = table(&[&["1"], &["2"], &["3"]]);
        t.annotations.entry(1).or_default().insert(Annotation::Rule);
        t.annotations.entry(3).or_default().insert(Annotation::Blank);
        t.retain_rows(&[true, false, true]);
        assert_eq!(t.rows(), 2);
        assert!(t.has_annotation(1, &Annotation::Rule));
        assert!(t.has_annotation(2, &Annotation::Blank));
    }

    #[test]
    fn test_diagnostics_display() {
        let compile = Diagnostic::Compile(CompileError::Syntax("a+".into()));
        assert_eq!(compile.to_string(), "?! syntax a+");
        assert_eq!(Diagnostic::Unknown("median".into()).to_string(), "? median");
    }

    #[test]
    fn test_remove_then_insert_restores_table() {
        let mut t = table(&[&["h"], &["1"], &["2"]]);
        t.annotations.entry(1).or_default().insert(Annotation::Rule);
        let header = t.remove_row(0).unwrap();
        assert_eq!(t.data(), &[vec!["1"], vec!["2"]]);
        assert!(t.has_annotation(1, &Annotation::Rule));
        t.insert_row(0, header);
        assert_eq!(t.data(), &[vec!["h"], vec!["1"], vec!["2"]]);
        assert!(t.has_annotation(1, &Annotation::Rule));
        assert_eq!(t.remove_row(3), None);
    }

    #[test]
    fn test_annotation_past_end_returns_with_row() {
        let mut t = table(&[&["1"], &["2"]]);
        t.annotate(Annotation::Blank);
        let row = t.remove_row(1).unwrap();
        t.remove_row(0);
        assert_eq!(t.annotations_before(0).count(), 0);
        t.insert_row(0, row.clone());
        t.insert_row(1, row);
        assert!(t.has_annotation(2, &Annotation::Blank));
        assert_eq!(t.rows(), 2);
    }

    #[test]
    fn test_insert_at_end_keeps_trailing_rule_above() {
        let mut t = table(&[&["1", "2"]]);
        t.annotate(Annotation::Rule);
        t.insert_row(99, vec!["x".into()]);
        assert_eq!(t.data()[1], vec!["x", "-"]);
        assert!(t.has_annotation(1, &Annotation::Rule));
    }

    #[test]
    fn test_annotate_before_next_row() {
        let mut t = table(&[&["x"]]);
        t.annotate(Annotation::Rule);
        t.append(vec!["y".into()]);
        assert_eq!(t.annotations_before(1).collect::<Vec<_>>(), vec![&Annotation::Rule]);
        assert_eq!(t.annotations_before(0).count(), 0);
    }
}
