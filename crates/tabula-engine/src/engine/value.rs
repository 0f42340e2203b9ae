//! Classified cell values.
//!
//! A [`Value`] is what a cell's text means once the classifier has looked at
//! it: an exact decimal, a boolean, or plain text. The evaluator also produces
//! [`Value::List`] for tuple results (`divmod`, `sorted`, `a, b`), which the
//! reshape verbs spread across several output cells.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt;

/// The interpretation of a cell, or the result of evaluating a formula.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(Decimal),
    Bool(bool),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    /// Zero, false, "" and () are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => !n.is_zero(),
            Value::Bool(b) => *b,
            Value::Text(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
        }
    }

    /// Numeric view of the value. Booleans count as 0 and 1.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
            _ => None,
        }
    }

    /// The value as a machine integer, if it is a whole number.
    pub fn as_integer(&self) -> Option<i64> {
        let n = self.as_number()?;
        if n.fract().is_zero() { n.to_i64() } else { None }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Text(_) => "str",
            Value::List(_) => "tuple",
        }
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Number(Decimal::ZERO).is_truthy());
        assert!(Value::Number(Decimal::from_str("0.1").unwrap()).is_truthy());
        assert!(!Value::text("").is_truthy());
        assert!(Value::text("x").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
    }

    #[test]
    fn test_display_keeps_decimal_scale() {
        let v = Value::Number(Decimal::from_str("5.0").unwrap());
        assert_eq!(v.to_string(), "5.0");
        assert_eq!(Value::Bool(true).to_string(), "True");
    }

    #[test]
    fn test_display_list() {
        let v = Value::List(vec![Value::Number(Decimal::from(3)), Value::text("x")]);
        assert_eq!(v.to_string(), "(3, x)");
    }

    #[test]
    fn test_as_integer_requires_whole_number() {
        assert_eq!(Value::Number(Decimal::from(7)).as_integer(), Some(7));
        assert_eq!(Value::Number(Decimal::from_str("7.5").unwrap()).as_integer(), None);
        assert_eq!(Value::Bool(true).as_integer(), Some(1));
    }
}
