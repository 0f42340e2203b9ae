//! Formula evaluation.
//!
//! [`evaluate`] walks a compiled formula against one row's [`EvalContext`].
//! Names resolve to context bindings first and builtin constants second;
//! calls resolve only through the builtin table. Failures never escape as
//! errors: they become a [`Fallback`], either the formula text with the
//! row's values substituted in, or a missing-value marker for division by
//! zero.

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::trace;

use super::ast::{BinaryOp, CompareOp, Expr, UnaryOp};
use super::compile::CompiledExpr;
use super::context::EvalContext;
use super::format::format_template;
use super::precision::Precision;
use super::value::Value;
use crate::builtins;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("type error: {0}")]
    Type(String),
    #[error("name '{0}' is not defined")]
    Name(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid decimal operation: {0}")]
    InvalidOperation(String),
    #[error("no attribute '{0}'")]
    Attribute(String),
    #[error("index out of range")]
    Index,
}

/// A successful evaluation: one cell, or several cells from a tuple result.
#[derive(Clone, Debug, PartialEq)]
pub enum Evaluated {
    Single(Value),
    Spread(Vec<Value>),
}

impl Evaluated {
    pub fn into_cells(self) -> Vec<String> {
        match self {
            Evaluated::Single(v) => vec![v.to_string()],
            Evaluated::Spread(items) => items.iter().map(Value::to_string).collect(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Evaluated::Single(v) => v.is_truthy(),
            Evaluated::Spread(items) => !items.is_empty(),
        }
    }
}

/// What to show when a formula cannot be evaluated for a row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fallback {
    /// The formula with its names replaced by the row's values.
    Substituted(String),
    /// Division by zero; shown as the table's filler.
    Missing,
}

pub fn evaluate(compiled: &CompiledExpr, ctx: &EvalContext) -> Result<Evaluated, Fallback> {
    evaluate_with(compiled, ctx, Precision::default())
}

pub fn evaluate_with(
    compiled: &CompiledExpr,
    ctx: &EvalContext,
    precision: Precision,
) -> Result<Evaluated, Fallback> {
    let evaluator = Evaluator { ctx, precision };
    match evaluator.eval(&compiled.expr) {
        Ok(Value::List(items)) => Ok(Evaluated::Spread(items)),
        Ok(value) => Ok(Evaluated::Single(value)),
        Err(EvalError::DivisionByZero) => Err(Fallback::Missing),
        Err(err) => {
            trace!(formula = compiled.source(), %err, "evaluation fell back");
            Err(Fallback::Substituted(substitute(compiled.source(), ctx)))
        }
    }
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("name regex must compile"))
}

/// Replace every bound name in `source` with its value's text, then drop a
/// redundant outer pair of parentheses and a trailing `+0`.
pub fn substitute(source: &str, ctx: &EvalContext) -> String {
    let replaced = name_re().replace_all(source, |caps: &regex::Captures| {
        let name = &caps[0];
        ctx.get(name)
            .map(Value::to_string)
            .unwrap_or_else(|| name.to_string())
    });
    let mut text = replaced.trim().to_string();
    if let Some(inner) = strip_outer_parens(&text) {
        text = inner.to_string();
    }
    if let Some(stripped) = text.strip_suffix("+0") {
        text = stripped.to_string();
    }
    text
}

pub fn strip_outer_parens(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

struct Evaluator<'a> {
    ctx: &'a EvalContext,
    precision: Precision,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Text(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Name(name) => self.lookup(name),
            Expr::Tuple(items) | Expr::List(items) => {
                let values = items.iter().map(|e| self.eval(e)).collect::<Result<_, _>>()?;
                Ok(Value::List(values))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                self.unary(*op, value)
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right, self.precision)
            }
            Expr::Compare(first, rest) => {
                let mut left = self.eval(first)?;
                for (op, expr) in rest {
                    let right = self.eval(expr)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() { self.eval(right) } else { Ok(left) }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() { Ok(left) } else { self.eval(right) }
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Call { name, args } => {
                let builtin =
                    builtins::lookup(name).ok_or_else(|| EvalError::Name(name.clone()))?;
                let args = args.iter().map(|e| self.eval(e)).collect::<Result<Vec<_>, _>>()?;
                (builtin.func)(&args, &self.precision)
            }
            Expr::Method {
                receiver,
                name,
                args,
            } => {
                let receiver = self.eval(receiver)?;
                let args = args.iter().map(|e| self.eval(e)).collect::<Result<Vec<_>, _>>()?;
                method(&receiver, name, &args)
            }
            Expr::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                subscript(&target, &index)
            }
            Expr::Slice {
                target,
                start,
                stop,
            } => {
                let target = self.eval(target)?;
                let start = start.as_deref().map(|e| self.eval(e)).transpose()?;
                let stop = stop.as_deref().map(|e| self.eval(e)).transpose()?;
                slice(&target, start.as_ref(), stop.as_ref())
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        if let Some(value) = self.ctx.get(name) {
            return Ok(value.clone());
        }
        builtins::constant(name, &self.precision).ok_or_else(|| EvalError::Name(name.to_string()))
    }

    fn unary(&self, op: UnaryOp, value: Value) -> Result<Value, EvalError> {
        match op {
            UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
            UnaryOp::Neg => Ok(Value::Number(-numeric(&value, "unary -")?)),
            UnaryOp::Pos => Ok(Value::Number(numeric(&value, "unary +")?)),
        }
    }
}

fn numeric(value: &Value, op: &str) -> Result<Decimal, EvalError> {
    value
        .as_number()
        .ok_or_else(|| EvalError::Type(format!("bad operand type for {op}: {}", value.type_name())))
}

fn operands(left: &Value, right: &Value, op: &str) -> Result<(Decimal, Decimal), EvalError> {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(EvalError::Type(format!(
            "unsupported operand types for {op}: {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn overflow() -> EvalError {
    EvalError::InvalidOperation("overflow".into())
}

fn repeat<T: Clone>(items: &[T], times: &Value) -> Result<Vec<T>, EvalError> {
    let n = times
        .as_integer()
        .ok_or_else(|| EvalError::Type("can't multiply sequence by non-int".into()))?;
    let n = usize::try_from(n.max(0)).map_err(|_| overflow())?;
    if n.saturating_mul(items.len()) > 1_000_000 {
        return Err(overflow());
    }
    Ok(items.iter().cloned().cycle().take(items.len() * n).collect())
}

pub(crate) fn binary(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    precision: Precision,
) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinaryOp::Add, Value::Text(a), Value::Text(b)) => return Ok(Value::Text(format!("{a}{b}"))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            return Ok(Value::List(a.iter().chain(b).cloned().collect()));
        }
        (BinaryOp::Mul, Value::Text(s), n) | (BinaryOp::Mul, n, Value::Text(s)) => {
            let chars: Vec<char> = s.chars().collect();
            return Ok(Value::Text(repeat(&chars, n)?.into_iter().collect()));
        }
        (BinaryOp::Mul, Value::List(items), n) | (BinaryOp::Mul, n, Value::List(items)) => {
            return Ok(Value::List(repeat(items, n)?));
        }
        _ => {}
    }

    let (a, b) = operands(left, right, op_symbol(op))?;
    let result = match op {
        BinaryOp::Add => a.checked_add(b).ok_or_else(overflow)?,
        BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
        BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
        BinaryOp::Div => divide(a, b)?,
        BinaryOp::FloorDiv => floor_div(a, b)?,
        BinaryOp::Mod => floor_mod(a, b)?,
        BinaryOp::Pow => return builtins::power(a, b, &precision).map(Value::Number),
    };
    Ok(Value::Number(precision.finish(result)))
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::FloorDiv => "//",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "**",
    }
}

pub(crate) fn divide(a: Decimal, b: Decimal) -> Result<Decimal, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    a.checked_div(b).ok_or_else(overflow)
}

pub(crate) fn floor_div(a: Decimal, b: Decimal) -> Result<Decimal, EvalError> {
    Ok(divide(a, b)?.floor())
}

/// Remainder with the sign of the divisor, so `floor_div(a, b) * b +
/// floor_mod(a, b) == a`.
pub(crate) fn floor_mod(a: Decimal, b: Decimal) -> Result<Decimal, EvalError> {
    let q = floor_div(a, b)?;
    let product = q.checked_mul(b).ok_or_else(overflow)?;
    a.checked_sub(product).ok_or_else(overflow)
}

/// Order two values. Numbers (and booleans) compare numerically, text
/// lexically and tuples element by element; anything else is a type error.
pub(crate) fn order(left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    match (left, right) {
        (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                let ord = order(x, y)?;
                if ord != Ordering::Equal {
                    return Ok(ord);
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => {
            let (a, b) = operands(left, right, "comparison")?;
            Ok(a.cmp(&b))
        }
    }
}

fn equal(left: &Value, right: &Value) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => a == b,
        _ => match (left, right) {
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equal(x, y))
            }
            _ => left == right,
        },
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    Ok(match op {
        CompareOp::Eq => equal(left, right),
        CompareOp::Ne => !equal(left, right),
        CompareOp::Lt => order(left, right)? == Ordering::Less,
        CompareOp::Le => order(left, right)? != Ordering::Greater,
        CompareOp::Gt => order(left, right)? == Ordering::Greater,
        CompareOp::Ge => order(left, right)? != Ordering::Less,
    })
}

/// Upper-case the first letter of every word, lower-case the rest.
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn method(receiver: &Value, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let Value::Text(s) = receiver else {
        return Err(EvalError::Attribute(format!(
            "{} has no attribute '{name}'",
            receiver.type_name()
        )));
    };
    let no_args = || {
        if args.is_empty() {
            Ok(())
        } else {
            Err(EvalError::Type(format!("{name}() takes no arguments")))
        }
    };
    match name {
        "format" => format_template(s, args).map(Value::Text),
        "upper" => no_args().map(|_| Value::Text(s.to_uppercase())),
        "lower" => no_args().map(|_| Value::Text(s.to_lowercase())),
        "title" => no_args().map(|_| Value::Text(title_case(s))),
        "strip" => no_args().map(|_| Value::Text(s.trim().to_string())),
        _ => Err(EvalError::Attribute(name.to_string())),
    }
}

fn index_of(index: &Value, len: usize) -> Result<usize, EvalError> {
    let i = index
        .as_integer()
        .ok_or_else(|| EvalError::Type("indices must be integers".into()))?;
    let len = i64::try_from(len).map_err(|_| EvalError::Index)?;
    let resolved = if i < 0 { i + len } else { i };
    if (0..len).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(EvalError::Index)
    }
}

fn subscript(target: &Value, index: &Value) -> Result<Value, EvalError> {
    match target {
        Value::Text(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = index_of(index, chars.len())?;
            Ok(Value::Text(chars[i].to_string()))
        }
        Value::List(items) => {
            let i = index_of(index, items.len())?;
            Ok(items[i].clone())
        }
        other => Err(EvalError::Type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// Resolve a slice bound the forgiving way: negative counts from the end and
/// out-of-range values clamp.
fn slice_bound(bound: Option<&Value>, len: usize, default: usize) -> Result<usize, EvalError> {
    let Some(bound) = bound else {
        return Ok(default);
    };
    let i = bound
        .as_integer()
        .ok_or_else(|| EvalError::Type("slice indices must be integers".into()))?;
    let len_i = len.to_i64().unwrap_or(i64::MAX);
    let resolved = if i < 0 { (i + len_i).max(0) } else { i.min(len_i) };
    Ok(resolved as usize)
}

fn slice(target: &Value, start: Option<&Value>, stop: Option<&Value>) -> Result<Value, EvalError> {
    match target {
        Value::Text(s) => {
            let chars: Vec<char> = s.chars().collect();
            let from = slice_bound(start, chars.len(), 0)?;
            let to = slice_bound(stop, chars.len(), chars.len())?;
            Ok(Value::Text(if from < to { chars[from..to].iter().collect() } else { String::new() }))
        }
        Value::List(items) => {
            let from = slice_bound(start, items.len(), 0)?;
            let to = slice_bound(stop, items.len(), items.len())?;
            Ok(Value::List(if from < to { items[from..to].to_vec() } else { Vec::new() }))
        }
        other => Err(EvalError::Type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}
