//! Parser for plain-text tables: cells separated by runs of spaces.

use crate::error::{Result, TabulaError};
use crate::table::{Annotation, Table, TableOptions};
use regex::Regex;
use std::io::Read;
use std::path::Path;

/// Largest input `read_table` will accept.
pub const MAX_INPUT_BYTES: u64 = 16 * 1_048_576; // 16 MiB

const TAB: &str = "    ";

/// Parse a file into a table.
pub fn read_table(path: &Path, separator: usize, options: TableOptions) -> Result<Table> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_INPUT_BYTES {
        return Err(TabulaError::TooLarge {
            bytes: meta.len(),
            max: MAX_INPUT_BYTES,
        });
    }
    parse_lines(&std::fs::read_to_string(path)?, separator, options)
}

/// Read at most `MAX_INPUT_BYTES` from a reader (stdin, usually) and parse it.
pub fn read_from(reader: impl Read, separator: usize, options: TableOptions) -> Result<Table> {
    let mut content = String::new();
    reader.take(MAX_INPUT_BYTES + 1).read_to_string(&mut content)?;
    let bytes = content.len() as u64;
    if bytes > MAX_INPUT_BYTES {
        return Err(TabulaError::TooLarge {
            bytes,
            max: MAX_INPUT_BYTES,
        });
    }
    parse_lines(&content, separator, options)
}

/// Parse table text. Cells are split on runs of at least `separator`
/// whitespace characters. Blank lines, lines of dashes and `#` comments
/// become annotations on the following row.
pub fn parse_lines(content: &str, separator: usize, options: TableOptions) -> Result<Table> {
    if separator == 0 {
        return Err(TabulaError::InvalidSeparator(separator));
    }
    let splitter = Regex::new(&format!(r"\s{{{separator},}}"))
        .map_err(|_| TabulaError::InvalidSeparator(separator))?;

    let mut table = Table::new(options);
    let mut indent: Option<usize> = None;
    for raw in content.lines() {
        let line = raw.replace('\t', TAB);
        let stripped = line.trim();
        if stripped.is_empty() {
            table.annotate(Annotation::Blank);
        } else if stripped.chars().all(|c| c == '-') {
            table.annotate(Annotation::Rule);
        } else if stripped.starts_with('#') {
            table.annotate(Annotation::Comment(stripped.to_string()));
        } else {
            table.append(splitter.split(stripped).map(str::to_string).collect());
            let leading = line.len() - line.trim_start().len();
            indent = Some(indent.map_or(leading, |i| i.min(leading)));
        }
    }
    table.indent = indent.unwrap_or(0);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Table {
        parse_lines(content, 2, TableOptions::default()).unwrap()
    }

    #[test]
    fn test_split_on_two_spaces() {
        let t = parse("First Name  Age\nAda Lovelace  36\n");
        assert_eq!(t.data(), &[vec!["First Name", "Age"], vec!["Ada Lovelace", "36"]]);
    }

    #[test]
    fn test_tabs_count_as_spaces() {
        let t = parse("a\tb\n");
        assert_eq!(t.data(), &[vec!["a", "b"]]);
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let t = parse("a  b  c\nd\n");
        assert_eq!(t.data()[1], vec!["d", "-", "-"]);
    }

    #[test]
    fn test_annotations() {
        let t = parse("Name  Qty\n---------\nx  1\n\n# done\ny  2\n");
        assert_eq!(t.rows(), 3);
        assert!(t.has_annotation(1, &Annotation::Rule));
        assert!(t.has_annotation(2, &Annotation::Blank));
        assert!(t.has_annotation(2, &Annotation::Comment("# done".into())));
    }

    #[test]
    fn test_indent_is_common_prefix() {
        let t = parse("    a  b\n      c  d\n");
        assert_eq!(t.indent, 4);
        assert_eq!(t.data()[1], vec!["c", "d"]);
        assert_eq!(parse("\n\n").indent, 0);
    }

    #[test]
    fn test_custom_separator() {
        let t = parse_lines("a b  c\n", 1, TableOptions::default()).unwrap();
        assert_eq!(t.data(), &[vec!["a", "b", "c"]]);
        let err = parse_lines("a\n", 0, TableOptions::default()).unwrap_err();
        assert!(matches!(err, TabulaError::InvalidSeparator(0)));
    }

    #[test]
    fn test_read_table_refuses_oversized_input() {
        let path = std::env::temp_dir().join(format!(
            "tabula_oversized_{}_{:?}.txt",
            std::process::id(),
            std::thread::current().id(),
        ));
        struct Cleanup(std::path::PathBuf);
        impl Drop for Cleanup {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }
        let _cleanup = Cleanup(path.clone());

        std::fs::write(&path, "a".repeat(MAX_INPUT_BYTES as usize + 1)).unwrap();
        let err = read_table(&path, 2, TableOptions::default()).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
