//! Reading and writing plain-text tables.

mod parser;
mod writer;

pub use parser::{MAX_INPUT_BYTES, parse_lines, read_from, read_table};
pub use writer::{render, write_table};
