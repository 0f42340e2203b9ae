//! `format()` specs and `"...".format()` templates.
//!
//! Supports `[[fill]align][sign][0][width][,|_][.precision][type]` with types
//! `s d f F % e E x X o b` (or none). Decimal values are formatted exactly;
//! nothing goes through binary floating point.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::eval::EvalError;
use super::precision::{exponent, round_significant};
use super::value::Value;

#[derive(Debug, Default, PartialEq)]
struct Spec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<u32>,
    kind: Option<char>,
}

fn bad_spec(spec: &str) -> EvalError {
    EvalError::Type(format!("invalid format spec '{spec}'"))
}

fn parse_spec(spec: &str) -> Result<Spec, EvalError> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = Spec::default();
    let mut i = 0;
    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');

    if chars.len() >= 2 && is_align(chars[1]) {
        out.fill = Some(chars[0]);
        out.align = Some(chars[1]);
        i = 2;
    } else if chars.first().is_some_and(|c| is_align(*c)) {
        out.align = Some(chars[0]);
        i = 1;
    }
    if let Some(&c) = chars.get(i)
        && matches!(c, '+' | '-' | ' ')
    {
        out.sign = Some(c);
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        out.zero = true;
        i += 1;
    }
    let start = i;
    while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
        i += 1;
    }
    if i > start {
        let digits: String = chars[start..i].iter().collect();
        out.width = digits.parse().map_err(|_| bad_spec(spec))?;
    }
    if let Some(&c) = chars.get(i)
        && matches!(c, ',' | '_')
    {
        out.grouping = Some(c);
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
        let digits: String = chars[start..i].iter().collect();
        out.precision = Some(digits.parse().map_err(|_| bad_spec(spec))?);
    }
    if let Some(&c) = chars.get(i) {
        if !"sdfF%eExXob".contains(c) {
            return Err(bad_spec(spec));
        }
        out.kind = Some(c);
        i += 1;
    }
    if i != chars.len() {
        return Err(bad_spec(spec));
    }
    Ok(out)
}

/// Format one value according to a spec, like the `format` builtin.
pub fn format_value(value: &Value, spec: &str) -> Result<String, EvalError> {
    let parsed = parse_spec(spec)?;
    match value {
        Value::Number(n) => format_number(*n, &parsed, spec),
        Value::Bool(b) if parsed.kind.is_some_and(|k| k != 's') => {
            format_number(Decimal::from(*b as u8), &parsed, spec)
        }
        Value::Text(_) | Value::Bool(_) | Value::List(_) => {
            if parsed.kind.is_some_and(|k| k != 's') || parsed.sign.is_some() {
                return Err(bad_spec(spec));
            }
            let mut text = value.to_string();
            if let Some(p) = parsed.precision {
                text = text.chars().take(p as usize).collect();
            }
            Ok(pad(String::new(), text, &parsed, '<'))
        }
    }
}

fn format_number(n: Decimal, spec: &Spec, raw: &str) -> Result<String, EvalError> {
    let negative = n.is_sign_negative() && !n.is_zero();
    let magnitude = n.abs();
    let mut body = match spec.kind {
        Some('f' | 'F') => fixed(magnitude, spec.precision.unwrap_or(6)),
        Some('%') => {
            let scaled = magnitude
                .checked_mul(Decimal::ONE_HUNDRED)
                .ok_or_else(|| EvalError::InvalidOperation("overflow".into()))?;
            format!("{}%", fixed(scaled, spec.precision.unwrap_or(6)))
        }
        Some('e' | 'E') => scientific(magnitude, spec.precision.unwrap_or(6), spec.kind == Some('E')),
        Some(kind @ ('d' | 'x' | 'X' | 'o' | 'b')) => {
            if !magnitude.fract().is_zero() {
                return Err(bad_spec(raw));
            }
            let int = magnitude.to_u128().ok_or_else(|| bad_spec(raw))?;
            match kind {
                'd' => int.to_string(),
                'x' => format!("{int:x}"),
                'X' => format!("{int:X}"),
                'o' => format!("{int:o}"),
                _ => format!("{int:b}"),
            }
        }
        Some(_) => return Err(bad_spec(raw)),
        None => match spec.precision {
            Some(p) => round_significant(magnitude, p.max(1)).to_string(),
            None => magnitude.to_string(),
        },
    };

    if let Some(sep) = spec.grouping {
        body = group_digits(&body, sep);
    }
    let sign = match (negative, spec.sign) {
        (true, _) => "-",
        (false, Some('+')) => "+",
        (false, Some(' ')) => " ",
        _ => "",
    };
    Ok(pad(sign.to_string(), body, spec, '>'))
}

fn fixed(n: Decimal, places: u32) -> String {
    let mut rounded = n.round_dp_with_strategy(places.min(28), RoundingStrategy::MidpointNearestEven);
    rounded.rescale(places.min(28));
    rounded.to_string()
}

fn scientific(n: Decimal, places: u32, upper: bool) -> String {
    let places = places.min(27);
    let mut exp = if n.is_zero() { 0 } else { exponent(&n) };
    let mut mantissa = shift_decimal(n, -exp);
    let mut rounded = mantissa.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
    if rounded >= Decimal::TEN {
        exp += 1;
        mantissa = shift_decimal(n, -exp);
        rounded = mantissa.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
    }
    rounded.rescale(places);
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{rounded}{e}{sign}{:02}", exp.abs())
}

/// Multiply by `10^places` (which may be negative).
fn shift_decimal(n: Decimal, places: i64) -> Decimal {
    let mut out = n;
    let step = if places >= 0 { Decimal::TEN } else { Decimal::new(1, 1) };
    for _ in 0..places.unsigned_abs().min(56) {
        match out.checked_mul(step) {
            Some(next) => out = next,
            None => break,
        }
    }
    out
}

fn group_digits(body: &str, sep: char) -> String {
    let split = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
    let (int, rest) = body.split_at(split);
    let mut grouped = String::new();
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(sep);
        }
        grouped.push(c);
    }
    grouped.push_str(rest);
    grouped
}

fn pad(sign: String, body: String, spec: &Spec, default_align: char) -> String {
    let len = sign.chars().count() + body.chars().count();
    if len >= spec.width {
        return sign + &body;
    }
    let gap = spec.width - len;
    let (fill, align) = match (spec.fill, spec.align, spec.zero) {
        (fill, Some(align), _) => (fill.unwrap_or(' '), align),
        (_, None, true) => ('0', '='),
        (_, None, false) => (' ', default_align),
    };
    let fill_str = |n: usize| fill.to_string().repeat(n);
    match align {
        '<' => sign + &body + &fill_str(gap),
        '^' => fill_str(gap / 2) + &sign + &body + &fill_str(gap - gap / 2),
        '=' => sign + &fill_str(gap) + &body,
        _ => fill_str(gap) + &sign + &body,
    }
}

/// Expand a `"...".format()` template: `{}`, `{0}`, `{:spec}`, `{1:spec}`,
/// with `{{` and `}}` as literal braces.
pub fn format_template(template: &str, args: &[Value]) -> Result<String, EvalError> {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    let mut auto_index = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(EvalError::Type("single '}' in format string".into())),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => field.push(ch),
                        None => return Err(EvalError::Type("unclosed '{' in format string".into())),
                    }
                }
                let (id, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                let index = if id.is_empty() {
                    auto_index += 1;
                    auto_index - 1
                } else {
                    id.parse::<usize>()
                        .map_err(|_| EvalError::Type(format!("unsupported field '{id}'")))?
                };
                let value = args.get(index).ok_or(EvalError::Index)?;
                out.push_str(&format_value(value, spec)?);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
