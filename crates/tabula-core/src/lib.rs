//! tabula-core - the table model, its verbs and plain-text storage.

pub mod error;
pub mod storage;
pub mod table;

pub use error::{Result, TabulaError};
pub use table::{Annotation, Diagnostic, Table, TableOptions};
