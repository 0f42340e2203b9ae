//! Built-in formula functions and their metadata.
//!
//! Conventions:
//! - `BUILTINS` is the whole function namespace of the formula language. A
//!   call to a name that is not listed here is a `NameError`, whatever else
//!   is in scope.
//! - Every builtin takes the evaluated arguments and the active precision,
//!   and reports failures as [`EvalError`] so the evaluator can fall back.
//! - If you add a builtin, add its row here; the lexer and parser need no
//!   changes.

mod aggregate;
mod dates;
mod maths;
mod text;

use rust_decimal::Decimal;

use crate::engine::eval::EvalError;
use crate::engine::precision::Precision;
use crate::engine::value::Value;

pub(crate) use maths::power;
pub use maths::random_decimal;

pub(crate) type BuiltinFn = fn(&[Value], &Precision) -> Result<Value, EvalError>;

pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
    /// One line for `--help`.
    pub description: &'static str,
}

macro_rules! builtin {
    ($name:literal, $func:path, $description:literal) => {
        Builtin {
            name: $name,
            func: $func,
            description: $description,
        }
    };
}

pub const BUILTINS: &[Builtin] = &[
    // arithmetic and conversions
    builtin!("abs", maths::abs, "Absolute value"),
    builtin!("bool", text::bool, "Truth value of the argument"),
    builtin!("chr", text::chr, "Character with the given code point"),
    builtin!("divmod", maths::divmod, "Floor quotient and remainder as a pair"),
    builtin!("floor", maths::floor, "Largest integer not above x"),
    builtin!("ceil", maths::ceil, "Smallest integer not below x"),
    builtin!("format", text::format, "Format a value with a format spec"),
    builtin!("int", maths::int, "Truncate toward zero"),
    builtin!("len", text::len, "Length of a string or tuple"),
    builtin!("ord", text::ord, "Code point of a single character"),
    builtin!("pow", maths::pow, "x ** y, or x ** y % z with three arguments"),
    builtin!("round", maths::round, "Round half-even to n places"),
    builtin!("str", text::str, "Text of a value"),
    builtin!("Decimal", maths::decimal, "Exact decimal from a literal"),
    // calendar
    builtin!("base", dates::base, "Day number of a date (0001-01-01 is 1)"),
    builtin!("date", dates::date, "ISO date for a day number or epoch time"),
    builtin!("dow", dates::dow, "Format a date, weekday name by default"),
    builtin!("hms", dates::hms, "Fractional hours as h:mm:ss.fff"),
    builtin!("hr", dates::hr, "Hours from h:mm:ss"),
    builtin!("mins", dates::mins, "Minutes from h:mm:ss"),
    builtin!("secs", dates::secs, "Seconds from h:mm:ss"),
    builtin!("epoch", dates::epoch, "Unix seconds for a date and time"),
    builtin!("as_time", dates::as_time, "24-hour hh:mm from 9am, noon and so on"),
    // maths
    builtin!("sin", maths::sin, "Sine of radians"),
    builtin!("cos", maths::cos, "Cosine of radians"),
    builtin!("tan", maths::tan, "Tangent of radians"),
    builtin!("sind", maths::sind, "Sine of degrees"),
    builtin!("cosd", maths::cosd, "Cosine of degrees"),
    builtin!("tand", maths::tand, "Tangent of degrees"),
    builtin!("degrees", maths::degrees, "Radians to degrees"),
    builtin!("radians", maths::radians, "Degrees to radians"),
    builtin!("angle", maths::angle, "Angle in degrees of the vector (x, y)"),
    builtin!("dir", maths::dir, "Compass bearing of the vector (x, y)"),
    builtin!("pi", pi, "The constant pi"),
    builtin!("tau", tau, "The constant 2 pi"),
    builtin!("hex", maths::hex, "Hexadecimal text, with fraction digits"),
    builtin!("oct", maths::oct, "Octal text, with fraction digits"),
    builtin!("pyth_add", maths::pyth_add, "Pythagorean sum sqrt(a*a + b*b)"),
    builtin!("factors", maths::factors, "Prime factors as a tuple"),
    builtin!("exp", maths::exp, "e to the power x"),
    builtin!("log", maths::log, "Natural log, or log to a given base"),
    builtin!("ln", maths::ln, "Natural log"),
    builtin!("log10", maths::log10, "Log base 10"),
    builtin!("sqrt", maths::sqrt, "Square root"),
    builtin!("mexp", maths::mexp, "Ten to the power x"),
    builtin!("mlog", maths::mlog, "Log base 10 with no error at zero"),
    builtin!("si", maths::si, "Expand or apply an SI suffix"),
    builtin!("random", maths::random, "Random decimal in [0, 1)"),
    // aggregates
    builtin!("all", aggregate::all, "True if every argument is truthy"),
    builtin!("any", aggregate::any, "True if some argument is truthy"),
    builtin!("max", aggregate::max, "Largest argument"),
    builtin!("min", aggregate::min, "Smallest argument"),
    builtin!("nzmin", aggregate::nzmin, "Smallest non-zero argument"),
    builtin!("sum", aggregate::sum, "Sum of the arguments"),
    builtin!("sorted", aggregate::sorted, "Arguments in ascending order"),
    // strings
    builtin!("upper", text::upper, "Upper-case text"),
    builtin!("lower", text::lower, "Lower-case text"),
    builtin!("caps", text::caps, "Title-case text"),
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// Value of a constant name (`pi`, `tau`) at the given precision.
pub fn constant(name: &str, precision: &Precision) -> Option<Value> {
    match name {
        "pi" => Some(Value::Number(maths::pi(precision))),
        "tau" => Some(Value::Number(maths::tau(precision))),
        _ => None,
    }
}

fn pi(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("pi", args, 0, 0)?;
    Ok(Value::Number(maths::pi(precision)))
}

fn tau(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("tau", args, 0, 0)?;
    Ok(Value::Number(maths::tau(precision)))
}

pub(crate) fn expect_args(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let wanted = if min == max {
        format!("{min}")
    } else {
        format!("{min} to {max}")
    };
    Err(EvalError::Type(format!(
        "{name}() takes {wanted} arguments ({} given)",
        args.len()
    )))
}

pub(crate) fn number(name: &str, value: &Value) -> Result<Decimal, EvalError> {
    value.as_number().ok_or_else(|| {
        EvalError::Type(format!(
            "{name}() needs a number, not {}",
            value.type_name()
        ))
    })
}

pub(crate) fn integer(name: &str, value: &Value) -> Result<i64, EvalError> {
    value.as_integer().ok_or_else(|| {
        EvalError::Type(format!("{name}() needs an integer, not '{value}'"))
    })
}

pub(crate) fn invalid(message: impl Into<String>) -> EvalError {
    EvalError::InvalidOperation(message.into())
}

/// A lone tuple argument stands for its items.
pub(crate) fn flatten(args: &[Value]) -> &[Value] {
    match args {
        [Value::List(items)] => items,
        _ => args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for builtin in BUILTINS {
            assert!(seen.insert(builtin.name), "duplicate builtin {}", builtin.name);
        }
    }

    #[test]
    fn test_lookup_is_closed() {
        assert!(lookup("sqrt").is_some());
        assert!(lookup("Decimal").is_some());
        assert!(lookup("eval").is_none());
        assert!(lookup("__import__").is_none());
        assert!(lookup("open").is_none());
    }

    #[test]
    fn test_constants() {
        let p = Precision::default();
        assert_eq!(constant("pi", &p).unwrap().to_string(), "3.14159265359");
        assert_eq!(constant("tau", &p).unwrap().to_string(), "6.28318530718");
        assert!(constant("e", &p).is_none());
        assert_eq!((lookup("pi").unwrap().func)(&[], &p).unwrap(), constant("pi", &p).unwrap());
    }

    #[test]
    fn test_arity_errors() {
        let err = expect_args("abs", &[], 1, 1).unwrap_err();
        assert_eq!(err.to_string(), "type error: abs() takes 1 arguments (0 given)");
        assert!(expect_args("log", &[Value::Bool(true)], 1, 2).is_ok());
    }
}
