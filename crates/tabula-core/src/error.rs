//! Error types for Tabula core.

use thiserror::Error;

/// Errors from reading or writing tables. Problems with a verb's argument are
/// not errors; they are collected on the table as diagnostics.
#[derive(Error, Debug)]
pub enum TabulaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input too large: {bytes} bytes, max {max}")]
    TooLarge { bytes: u64, max: u64 },

    #[error("Cell separator must be at least one space, got {0}")]
    InvalidSeparator(usize),
}

pub type Result<T> = std::result::Result<T, TabulaError>;
