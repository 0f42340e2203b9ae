//! String and conversion builtins.

use rust_decimal::Decimal;

use super::{expect_args, integer, invalid};
use crate::engine::eval::{EvalError, title_case};
use crate::engine::format::format_value;
use crate::engine::precision::Precision;
use crate::engine::value::Value;

pub(crate) fn upper(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("upper", args, 1, 1)?;
    Ok(Value::Text(args[0].to_string().to_uppercase()))
}

pub(crate) fn lower(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("lower", args, 1, 1)?;
    Ok(Value::Text(args[0].to_string().to_lowercase()))
}

pub(crate) fn caps(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("caps", args, 1, 1)?;
    Ok(Value::Text(title_case(&args[0].to_string())))
}

pub(crate) fn str(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("str", args, 0, 1)?;
    Ok(Value::Text(args.first().map(Value::to_string).unwrap_or_default()))
}

pub(crate) fn len(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("len", args, 1, 1)?;
    let n = match &args[0] {
        Value::Text(s) => s.chars().count(),
        Value::List(items) => items.len(),
        other => {
            return Err(EvalError::Type(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
    };
    Ok(Value::Number(Decimal::from(n)))
}

pub(crate) fn chr(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("chr", args, 1, 1)?;
    let code = integer("chr", &args[0])?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|c| Value::Text(c.to_string()))
        .ok_or_else(|| invalid(format!("chr() arg not in range: {code}")))
}

pub(crate) fn ord(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("ord", args, 1, 1)?;
    let Value::Text(s) = &args[0] else {
        return Err(EvalError::Type("ord() expected a character".into()));
    };
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Number(Decimal::from(u32::from(c)))),
        _ => Err(EvalError::Type(format!(
            "ord() expected a character, but string of length {} found",
            s.chars().count()
        ))),
    }
}

pub(crate) fn bool(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("bool", args, 0, 1)?;
    Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
}

/// `format(value, spec)`, the functional form of `"{:spec}".format(value)`.
pub(crate) fn format(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("format", args, 1, 2)?;
    let spec = args.get(1).map(Value::to_string).unwrap_or_default();
    format_value(&args[0], &spec).map(Value::Text)
}
