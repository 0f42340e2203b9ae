//! The table model and the verbs that reshape it.
//!
//! `Table` lives in `state.rs`; each other file adds one family of verbs
//! through its own `impl Table` block. `verbs.rs` maps verb names onto them.

mod colspec;
mod compute;
mod edit;
mod levels;
mod reflow;
mod reshape;
mod rounding;
mod state;
mod verbs;

pub use state::{Annotation, DEFAULT_FILLER, Diagnostic, Table, TableOptions};
pub use verbs::{VERBS, is_verb};
