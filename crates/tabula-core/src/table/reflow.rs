//! Reflow verbs: zip, unzip, wrap, unwrap. Each one changes which cells
//! share a row, so annotations are dropped.

use super::{Diagnostic, Table};

const DEFAULT_GROUPS: usize = 2;

impl Table {
    /// Parse the group count shared by the reflow verbs. `None` means do
    /// nothing.
    fn group_count(&mut self, arg: &str) -> Option<usize> {
        let arg = arg.trim();
        let n = if arg.is_empty() {
            DEFAULT_GROUPS
        } else {
            match arg.parse::<usize>() {
                Ok(n) => n,
                Err(_) => {
                    self.report(Diagnostic::Unknown(arg.to_string()));
                    return None;
                }
            }
        };
        (n >= 2 && self.rows() > 0).then_some(n)
    }

    /// Join each run of `n` rows into one row.
    pub fn zip(&mut self, arg: &str) {
        let Some(n) = self.group_count(arg) else {
            return;
        };
        let data = self.data.chunks(n).map(|chunk| chunk.concat()).collect();
        self.replace_data(data);
    }

    /// Split each row into `n` rows of (at most) `cols / n` cells.
    pub fn unzip(&mut self, arg: &str) {
        let Some(n) = self.group_count(arg) else {
            return;
        };
        let width = self.cols.div_ceil(n).max(1);
        let data = self
            .data
            .iter()
            .flat_map(|row| row.chunks(width).map(<[String]>::to_vec))
            .collect();
        self.replace_data(data);
    }

    /// Lay the rows out in `n` side-by-side blocks, like newspaper columns.
    pub fn wrap(&mut self, arg: &str) {
        let Some(n) = self.group_count(arg) else {
            return;
        };
        let per_block = self.rows().div_ceil(n);
        let data = (0..per_block)
            .map(|i| {
                (0..n)
                    .filter_map(|j| self.data.get(i + j * per_block))
                    .flat_map(|row| row.iter().cloned())
                    .collect()
            })
            .collect();
        self.replace_data(data);
    }

    /// Undo `wrap`: cut the columns into `n` blocks and stack the blocks.
    pub fn unwrap(&mut self, arg: &str) {
        let Some(n) = self.group_count(arg) else {
            return;
        };
        let mut blocks = Vec::with_capacity(n);
        let mut start = 0;
        for parts in (1..=n).rev() {
            let size = (self.cols - start).div_ceil(parts);
            if size > 0 {
                blocks.push(start..start + size);
            }
            start += size;
        }
        let data = blocks
            .iter()
            .flat_map(|block| self.data.iter().map(move |row| row[block.clone()].to_vec()))
            .collect();
        self.replace_data(data);
    }
}
