//! Table formula engine API.
//!
//! This module provides everything a verb needs to read cells and run
//! formulas against them:
//!
//! - [`Value`], [`classify`] - What a cell's text means (number, bool, text)
//! - [`round_to_places`], [`reduce_to_significant_figures`] - `dp` and `sf`
//! - [`sort_key`], [`SortKey`] - Mixed-type ordering of cells
//! - [`parse_date`], [`parse_datetime`] - Lenient calendar parsing
//! - [`compile`], [`CompiledExpr`] - Formula text to a checked expression
//! - [`EvalContext`], [`TableStats`], [`Accumulators`] - Per-row name bindings
//! - [`evaluate`], [`Evaluated`], [`Fallback`] - Run a compiled formula
//! - [`Precision`] - Significant digits kept by arithmetic

mod ast;
pub(crate) mod classify;
mod compile;
mod context;
pub(crate) mod dates;
pub(crate) mod eval;
pub(crate) mod format;
mod lexer;
mod parser;
pub(crate) mod precision;
mod preprocess;
mod sort_key;
pub(crate) mod value;

pub use classify::{classify, parse_number, reduce_to_significant_figures, round_to_places};
pub use compile::{CompileError, CompiledExpr, compile};
pub use context::{Accumulators, EvalContext, TableStats, column_letter, column_letters};
pub use dates::{parse_date, parse_datetime};
pub use eval::{
    EvalError, Evaluated, Fallback, evaluate, evaluate_with, strip_outer_parens, substitute,
};
pub use format::{format_template, format_value};
pub use precision::{DEFAULT_PRECISION, Precision};
pub use preprocess::preprocess_formula;
pub use sort_key::{SENTINEL, SortKey, sort_key};
pub use value::Value;
