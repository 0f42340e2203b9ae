//! Aggregates over either one iterable or several arguments.

use rust_decimal::Decimal;
use std::cmp::Ordering;

use super::{flatten, invalid, number};
use crate::engine::eval::{EvalError, order};
use crate::engine::precision::Precision;
use crate::engine::value::Value;

pub(crate) fn all(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    Ok(Value::Bool(flatten(args).iter().all(Value::is_truthy)))
}

pub(crate) fn any(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    Ok(Value::Bool(flatten(args).iter().any(Value::is_truthy)))
}

fn extreme(name: &str, args: &[Value], wanted: Ordering) -> Result<Value, EvalError> {
    let items = flatten(args);
    let mut best = items
        .first()
        .ok_or_else(|| EvalError::Type(format!("{name}() arg is an empty sequence")))?;
    for item in &items[1..] {
        if order(item, best)? == wanted {
            best = item;
        }
    }
    Ok(best.clone())
}

pub(crate) fn max(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    extreme("max", args, Ordering::Greater)
}

pub(crate) fn min(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    extreme("min", args, Ordering::Less)
}

/// Smallest non-zero number; zero when there is none.
pub(crate) fn nzmin(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    let mut best: Option<Decimal> = None;
    for item in flatten(args) {
        let n = number("nzmin", item)?;
        if !n.is_zero() && best.is_none_or(|b| n < b) {
            best = Some(n);
        }
    }
    Ok(Value::Number(best.unwrap_or(Decimal::ZERO)))
}

pub(crate) fn sum(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    let mut total = Decimal::ZERO;
    for item in flatten(args) {
        let n = number("sum", item)?;
        total = precision.finish(
            total
                .checked_add(n)
                .ok_or_else(|| invalid("overflow in sum()"))?,
        );
    }
    Ok(Value::Number(total))
}

pub(crate) fn sorted(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    let mut items: Vec<Value> = flatten(args).to_vec();
    let mut failure = None;
    items.sort_by(|a, b| {
        order(a, b).unwrap_or_else(|err| {
            failure.get_or_insert(err);
            Ordering::Equal
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(Value::List(items)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn nums(values: &[&str]) -> Vec<Value> {
        values
            .iter()
            .map(|s| Value::Number(Decimal::from_str(s).unwrap()))
            .collect()
    }

    fn call(f: fn(&[Value], &Precision) -> Result<Value, EvalError>, args: &[Value]) -> String {
        f(args, &Precision::default()).unwrap().to_string()
    }

    #[test]
    fn test_one_iterable_or_many_arguments() {
        let many = nums(&["3", "1", "2"]);
        let one = vec![Value::List(many.clone())];
        assert_eq!(call(sorted, &many), "(1, 2, 3)");
        assert_eq!(call(sorted, &one), "(1, 2, 3)");
        assert_eq!(call(max, &many), "3");
        assert_eq!(call(min, &one), "1");
        assert_eq!(call(sum, &one), "6");
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(call(all, &nums(&["1", "2"])), "True");
        assert_eq!(call(all, &nums(&["1", "0"])), "False");
        assert_eq!(call(any, &nums(&["0", "0"])), "False");
        assert_eq!(call(any, &[Value::List(vec![])]), "False");
    }

    #[test]
    fn test_nzmin() {
        assert_eq!(call(nzmin, &nums(&["0", "4", "2.5", "0"])), "2.5");
        assert_eq!(call(nzmin, &nums(&["0", "0"])), "0");
        assert_eq!(call(nzmin, &[]), "0");
    }

    #[test]
    fn test_mixed_types_do_not_order() {
        let args = vec![Value::text("a"), Value::Number(Decimal::ONE)];
        assert!(sorted(&args, &Precision::default()).is_err());
        assert!(max(&args, &Precision::default()).is_err());
        assert!(max(&[], &Precision::default()).is_err());
    }

    #[test]
    fn test_sum_is_exact() {
        assert_eq!(call(sum, &nums(&["0.1", "0.2"])), "0.3");
        assert!(sum(&[Value::text("x")], &Precision::default()).is_err());
    }
}
