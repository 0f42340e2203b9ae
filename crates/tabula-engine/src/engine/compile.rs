use thiserror::Error;
use tracing::debug;

use super::ast::Expr;
use super::lexer::{decimalize, tokenize};
use super::parser::parse;
use super::preprocess::preprocess_formula;

/// Why a formula could not be compiled. Displays as `<kind> <formula>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("tokens {0}")]
    Tokens(String),
    #[error("syntax {0}")]
    Syntax(String),
}

impl CompileError {
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Tokens(_) => "tokens",
            CompileError::Syntax(_) => "syntax",
        }
    }

    pub fn formula(&self) -> &str {
        match self {
            CompileError::Tokens(f) | CompileError::Syntax(f) => f,
        }
    }

    /// Same failure, reported against different text (the user's spelling
    /// rather than an internally expanded formula).
    pub fn relabel(self, formula: impl Into<String>) -> CompileError {
        match self {
            CompileError::Tokens(_) => CompileError::Tokens(formula.into()),
            CompileError::Syntax(_) => CompileError::Syntax(formula.into()),
        }
    }
}

/// A parsed formula, ready to evaluate against any number of rows.
#[derive(Clone, Debug)]
pub struct CompiledExpr {
    source: String,
    pub(crate) expr: Expr,
}

impl CompiledExpr {
    pub fn source(&self) -> &str {
        &self.source
    }
}

pub fn compile(formula: &str) -> Result<CompiledExpr, CompileError> {
    let rewritten = preprocess_formula(formula);
    let tokens = tokenize(&rewritten).map_err(|err| {
        debug!(formula, %err, "formula failed to tokenize");
        CompileError::Tokens(formula.to_string())
    })?;
    let expr = parse(&decimalize(tokens)).map_err(|err| {
        debug!(formula, %err, "formula failed to parse");
        CompileError::Syntax(formula.to_string())
    })?;
    Ok(CompiledExpr {
        source: formula.to_string(),
        expr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_ok() {
        let compiled = compile("sqrt(b) + 1").unwrap();
        assert_eq!(compiled.source(), "sqrt(b) + 1");
    }

    #[test]
    fn test_token_errors() {
        assert_eq!(
            compile("x==4)").unwrap_err().to_string(),
            "tokens x==4)"
        );
        assert_eq!(compile("'open").unwrap_err().kind(), "tokens");
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(compile("(2..3)").unwrap_err().to_string(), "syntax (2..3)");
        assert_eq!(compile("x!4").unwrap_err().to_string(), "syntax x!4");
        assert_eq!(compile("").unwrap_err().kind(), "syntax");
    }

    #[test]
    fn test_shorthands_compile() {
        assert!(compile("a <> b").is_ok());
        assert!(compile("a mod 7").is_ok());
        assert!(compile("a++b").is_ok());
        assert!(compile("a = 1").is_ok());
    }

    #[test]
    fn test_relabel() {
        let err = compile("x/").unwrap_err().relabel("/");
        assert_eq!(err.to_string(), "syntax /");
    }
}
