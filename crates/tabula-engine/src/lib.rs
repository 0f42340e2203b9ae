//! tabula_engine - Cell classification, sort keys and the formula language.

pub mod builtins;
pub mod engine;
