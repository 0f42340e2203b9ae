//! Renders a table as lined-up plain text.

use crate::error::Result;
use crate::table::{Annotation, Table};
use std::fs;
use std::path::Path;
use tabula_engine::engine::parse_number;

const CELL_SEPARATOR: &str = "  ";

/// Write a rendered table to a file.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    fs::write(path, render(table))?;
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// A column is right-aligned when at least half of its cells are numbers
/// or the filler.
fn alignments(table: &Table) -> Vec<Align> {
    let filler = &table.options().filler;
    (0..table.cols())
        .map(|c| {
            let numeric = table
                .data()
                .iter()
                .filter(|row| row[c] == *filler || parse_number(&row[c]).is_some())
                .count();
            if 2 * numeric >= table.rows() {
                Align::Right
            } else {
                Align::Left
            }
        })
        .collect()
}

fn widths(table: &Table) -> Vec<usize> {
    (0..table.cols())
        .map(|c| {
            table
                .data()
                .iter()
                .map(|row| row[c].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect()
}

/// Render the table with aligned columns. Annotations print above the row
/// they precede; diagnostics are not included.
pub fn render(table: &Table) -> String {
    let widths = widths(table);
    let aligns = alignments(table);
    let margin = " ".repeat(table.indent);
    let full_width =
        widths.iter().sum::<usize>() + CELL_SEPARATOR.len() * widths.len().saturating_sub(1);

    let mut lines = Vec::new();
    for r in 0..=table.rows() {
        for annotation in table.annotations_before(r) {
            lines.push(match annotation {
                Annotation::Blank => String::new(),
                Annotation::Rule => format!("{margin}{}", "-".repeat(full_width)),
                Annotation::Comment(text) => text.clone(),
            });
        }
        let Some(row) = table.row(r) else {
            continue;
        };
        let cells: Vec<String> = row
            .iter()
            .zip(widths.iter().zip(&aligns))
            .map(|(cell, (&width, align))| match align {
                Align::Left => format!("{cell:<width$}"),
                Align::Right => format!("{cell:>width$}"),
            })
            .collect();
        let line = format!("{margin}{}", cells.join(CELL_SEPARATOR));
        lines.push(line.trim_end().to_string());
    }

    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::parse_lines;
    use crate::table::TableOptions;

    #[test]
    fn test_numbers_right_aligned() {
        let t = Table::from_rows(
            [["Name", "Qty"], ["apple", "5"], ["kiwi", "120"]],
            TableOptions::default(),
        );
        assert_eq!(render(&t), "Name   Qty\napple    5\nkiwi   120\n");
    }

    #[test]
    fn test_annotations_rendered() {
        let t = parse_lines("# fruit\nName  Qty\n---\napple  5\n\n", 2, TableOptions::default())
            .unwrap();
        assert_eq!(render(&t), "# fruit\nName   Qty\n----------\napple    5\n\n");
    }

    #[test]
    fn test_indent_restored() {
        let t = parse_lines("  a  1\n  bb  2\n", 2, TableOptions::default()).unwrap();
        assert_eq!(render(&t), "  a   1\n  bb  2\n");
    }

    #[test]
    fn test_write_table() {
        let path = std::env::temp_dir().join(format!(
            "tabula_write_{}_{:?}.txt",
            std::process::id(),
            std::thread::current().id(),
        ));
        let t = Table::from_rows([["x", "1"]], TableOptions::default());
        write_table(&path, &t).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(written, "x  1\n");
    }
}
