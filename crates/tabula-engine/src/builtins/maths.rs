//! Numeric builtins.

use rand::Rng;
use regex::Regex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use std::sync::OnceLock;

use super::{expect_args, integer, invalid, number};
use crate::engine::classify::parse_number;
use crate::engine::eval::{EvalError, divide, floor_div, floor_mod};
use crate::engine::precision::Precision;
use crate::engine::value::Value;

/// Upper bound for trial division in `factors`.
const MAX_FACTOR_INPUT: i64 = 1_000_000_000_000;

pub(crate) fn pi(precision: &Precision) -> Decimal {
    precision.finish(Decimal::PI)
}

pub(crate) fn tau(precision: &Precision) -> Decimal {
    precision.finish(Decimal::TWO_PI)
}

pub(crate) fn abs(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("abs", args, 1, 1)?;
    Ok(Value::Number(number("abs", &args[0])?.abs()))
}

pub(crate) fn divmod(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("divmod", args, 2, 2)?;
    let a = number("divmod", &args[0])?;
    let b = number("divmod", &args[1])?;
    Ok(Value::List(vec![
        Value::Number(floor_div(a, b)?),
        Value::Number(floor_mod(a, b)?),
    ]))
}

pub(crate) fn floor(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("floor", args, 1, 1)?;
    Ok(Value::Number(number("floor", &args[0])?.floor()))
}

pub(crate) fn ceil(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("ceil", args, 1, 1)?;
    Ok(Value::Number(number("ceil", &args[0])?.ceil()))
}

/// `int(x)` truncates toward zero; text is classified first.
pub(crate) fn int(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("int", args, 1, 1)?;
    let n = match &args[0] {
        Value::Text(s) => parse_number(s)
            .ok_or_else(|| invalid(format!("invalid literal for int(): '{s}'")))?,
        other => number("int", other)?,
    };
    Ok(Value::Number(n.trunc()))
}

/// `Decimal("2.5")`: the constructor that fractional literals compile to.
pub(crate) fn decimal(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("Decimal", args, 0, 1)?;
    let Some(arg) = args.first() else {
        return Ok(Value::Number(Decimal::ZERO));
    };
    match arg {
        Value::Text(s) => {
            let mut literal = s.trim().to_string();
            if literal.starts_with('.') {
                literal.insert(0, '0');
            }
            if literal.ends_with('.') {
                literal.push('0');
            }
            parse_number(&literal)
                .map(Value::Number)
                .ok_or_else(|| invalid(format!("cannot convert '{s}' to Decimal")))
        }
        other => Ok(Value::Number(number("Decimal", other)?)),
    }
}

/// `a ** b`. Whole exponents are exact; fractional ones need a non-negative
/// base.
pub(crate) fn power(a: Decimal, b: Decimal, precision: &Precision) -> Result<Decimal, EvalError> {
    if b.fract().is_zero()
        && let Some(exp) = b.to_i64()
    {
        if a.is_zero() && exp < 0 {
            return Err(EvalError::DivisionByZero);
        }
        let magnitude = a
            .checked_powi(exp.saturating_abs())
            .ok_or_else(|| invalid("overflow in power"))?;
        let result = if exp < 0 {
            divide(Decimal::ONE, magnitude)?
        } else {
            magnitude
        };
        return Ok(precision.finish(result));
    }
    if a.is_sign_negative() {
        return Err(invalid("fractional power of a negative number"));
    }
    a.checked_powd(b)
        .map(|r| precision.finish(r))
        .ok_or_else(|| invalid("overflow in power"))
}

pub(crate) fn pow(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("pow", args, 2, 3)?;
    let a = number("pow", &args[0])?;
    let b = number("pow", &args[1])?;
    let result = power(a, b, precision)?;
    match args.get(2) {
        Some(m) => Ok(Value::Number(floor_mod(result, number("pow", m)?)?)),
        None => Ok(Value::Number(result)),
    }
}

/// `round(x)` gives a whole number, `round(x, n)` keeps `n` places (half to
/// even in both cases).
pub(crate) fn round(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("round", args, 1, 2)?;
    let x = number("round", &args[0])?;
    let places = match args.get(1) {
        Some(n) => integer("round", n)?,
        None => 0,
    };
    if places >= 0 {
        let places = places.min(28) as u32;
        let mut rounded = x.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
        if args.len() == 2 {
            rounded.rescale(places);
        }
        return Ok(Value::Number(rounded));
    }
    let factor = Decimal::from_i128(10i128.pow(places.unsigned_abs().min(28) as u32))
        .ok_or_else(|| invalid("round"))?;
    let rounded = divide(x, factor)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .checked_mul(factor)
        .ok_or_else(|| invalid("round"))?;
    Ok(Value::Number(rounded))
}

pub(crate) fn sqrt(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("sqrt", args, 1, 1)?;
    let x = number("sqrt", &args[0])?;
    if x.is_sign_negative() && !x.is_zero() {
        return Err(invalid("square root of a negative number"));
    }
    let root = precision.finish(x.sqrt().ok_or_else(|| invalid("sqrt"))?);
    let exact = root.normalize();
    if exact.checked_mul(exact) == Some(x) {
        return Ok(Value::Number(exact));
    }
    Ok(Value::Number(root))
}

fn checked_unary(
    name: &str,
    args: &[Value],
    precision: &Precision,
    f: impl Fn(Decimal) -> Option<Decimal>,
) -> Result<Value, EvalError> {
    expect_args(name, args, 1, 1)?;
    let x = number(name, &args[0])?;
    f(x).map(|r| Value::Number(precision.finish(r)))
        .ok_or_else(|| invalid(format!("{name}({x}) is undefined")))
}

pub(crate) fn exp(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    checked_unary("exp", args, precision, |x| x.checked_exp())
}

pub(crate) fn ln(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    checked_unary("ln", args, precision, |x| x.checked_ln())
}

pub(crate) fn log10(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    checked_unary("log10", args, precision, |x| x.checked_log10())
}

/// Natural logarithm, or `log(x, base)`.
pub(crate) fn log(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("log", args, 1, 2)?;
    let Some(base) = args.get(1) else {
        return ln(args, precision);
    };
    let x = number("log", &args[0])?;
    let base = number("log", base)?;
    let num = x.checked_ln().ok_or_else(|| invalid("log of a non-positive number"))?;
    let den = base.checked_ln().ok_or_else(|| invalid("log base must be positive"))?;
    Ok(Value::Number(precision.finish(divide(num, den)?)))
}

pub(crate) fn mexp(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    checked_unary("mexp", args, precision, |x| {
        x.checked_div(Decimal::from(256))?.checked_exp()
    })
}

pub(crate) fn mlog(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    checked_unary("mlog", args, precision, |x| {
        x.checked_ln()?.checked_mul(Decimal::from(256))
    })
}

/// Run a float function and quantize the result to ten places.
fn via_float(name: &str, x: Decimal, f: impl Fn(f64) -> f64) -> Result<Decimal, EvalError> {
    let input = x.to_f64().ok_or_else(|| invalid(name.to_string()))?;
    let output = f(input);
    if !output.is_finite() {
        return Err(invalid(format!("{name}({x}) is undefined")));
    }
    let d = Decimal::from_f64(output).ok_or_else(|| invalid(name.to_string()))?;
    Ok(d
        .round_dp_with_strategy(10, RoundingStrategy::MidpointNearestEven)
        .normalize())
}

fn trig(name: &str, args: &[Value], degrees: bool, f: fn(f64) -> f64) -> Result<Value, EvalError> {
    expect_args(name, args, 1, 1)?;
    let x = number(name, &args[0])?;
    let result = if degrees {
        via_float(name, x, |d| f(d.to_radians()))?
    } else {
        via_float(name, x, f)?
    };
    Ok(Value::Number(result))
}

pub(crate) fn sin(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    trig("sin", args, false, f64::sin)
}

pub(crate) fn cos(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    trig("cos", args, false, f64::cos)
}

pub(crate) fn tan(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    trig("tan", args, false, f64::tan)
}

pub(crate) fn sind(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    trig("sind", args, true, f64::sin)
}

pub(crate) fn cosd(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    trig("cosd", args, true, f64::cos)
}

/// Tangent in degrees; undefined at odd multiples of 90, which shows as a
/// missing value.
pub(crate) fn tand(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("tand", args, 1, 1)?;
    let x = number("tand", &args[0])?;
    if floor_mod(x, Decimal::from(180))? == Decimal::from(90) {
        return Err(EvalError::DivisionByZero);
    }
    trig("tand", args, true, f64::tan)
}

pub(crate) fn degrees(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("degrees", args, 1, 1)?;
    let x = number("degrees", &args[0])?;
    if x.is_zero() {
        return Ok(Value::Number(Decimal::ZERO));
    }
    let scaled = precision
        .finish(divide(x, pi(precision))?)
        .checked_mul(Decimal::from(180))
        .ok_or_else(|| invalid("degrees"))?;
    Ok(Value::Number(precision.finish(scaled)))
}

pub(crate) fn radians(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("radians", args, 1, 1)?;
    let x = number("radians", &args[0])?;
    if x.is_zero() {
        return Ok(Value::Number(Decimal::ZERO));
    }
    let scaled = x
        .checked_mul(pi(precision))
        .map(|n| precision.finish(n))
        .ok_or_else(|| invalid("radians"))?;
    Ok(Value::Number(precision.finish(divide(scaled, Decimal::from(180))?)))
}

/// Bearing of the vector `(a, b)` in degrees, measured from the first axis.
pub(crate) fn angle(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("angle", args, 2, 2)?;
    let a = number("angle", &args[0])?
        .to_f64()
        .ok_or_else(|| invalid("angle"))?;
    let b = number("angle", &args[1])?;
    let radians = via_float("angle", b, |y| y.atan2(a))?;
    degrees(&[Value::Number(radians)], precision)
}

/// Unit vector for a bearing in degrees: `(cosd(t), sind(t))`.
pub(crate) fn dir(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("dir", args, 1, 1)?;
    let cos = cosd(args, precision)?;
    let sin = sind(args, precision)?;
    Ok(Value::List(vec![cos, sin]))
}

pub(crate) fn pyth_add(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("pyth_add", args, 2, 2)?;
    let a = number("pyth_add", &args[0])?;
    let b = number("pyth_add", &args[1])?;
    let sum = a
        .checked_mul(a)
        .zip(b.checked_mul(b))
        .and_then(|(x, y)| x.checked_add(y))
        .ok_or_else(|| invalid("pyth_add overflow"))?;
    sqrt(&[Value::Number(sum)], precision)
}

/// Radix expansion including fraction digits, up to the working precision.
fn to_radix(x: Decimal, radix: u32, prefix: &str, precision: &Precision) -> Result<String, EvalError> {
    const DIGITS: &[u8] = b"0123456789abcdef";
    let negative = x.is_sign_negative() && !x.is_zero();
    let x = x.abs();
    let whole = x.trunc().to_u128().ok_or_else(|| invalid("value too large"))?;
    let mut out = String::from(if negative { "-" } else { "" });
    out.push_str(prefix);
    out.push_str(&match radix {
        16 => format!("{whole:x}"),
        8 => format!("{whole:o}"),
        _ => format!("{whole:b}"),
    });

    let mut frac = x.fract();
    let limit = 2 + precision.digits() as usize;
    if !frac.is_zero() {
        out.push('.');
    }
    let base = Decimal::from(radix);
    while !frac.is_zero() && out.len() < limit {
        frac = frac.checked_mul(base).ok_or_else(|| invalid("radix"))?;
        let digit = frac.trunc().to_usize().unwrap_or(0);
        out.push(DIGITS[digit] as char);
        frac = frac.fract();
    }
    Ok(out)
}

pub(crate) fn hex(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("hex", args, 1, 1)?;
    let x = number("hex", &args[0])?;
    to_radix(x, 16, "0x", precision).map(Value::Text)
}

pub(crate) fn oct(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("oct", args, 1, 1)?;
    let x = number("oct", &args[0])?;
    to_radix(x, 8, "0o", precision).map(Value::Text)
}

/// Prime factors in ascending order, by wheel trial division.
pub(crate) fn factors(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("factors", args, 1, 1)?;
    let mut n = integer("factors", &args[0])?;
    if n > MAX_FACTOR_INPUT {
        return Err(invalid("factors() argument too large"));
    }
    let mut found = Vec::new();
    let mut f: i64 = 2;
    let increments = [1, 2, 2].into_iter().chain([4, 2, 4, 2, 4, 6, 2, 6].into_iter().cycle());
    for step in increments {
        if f * f > n {
            break;
        }
        while n % f == 0 {
            found.push(Value::Number(Decimal::from(f)));
            n /= f;
        }
        f += step;
    }
    if n > 1 {
        found.push(Value::Number(Decimal::from(n)));
    }
    Ok(Value::List(found))
}

fn si_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([-+]?(?:\d+\.\d*|\.\d+|0|[1-9]\d*))\s*([ kMGTPE])$")
            .expect("si regex must compile")
    })
}

/// Add the largest SI suffix to a number (`12315350` → `12.315 M`), or
/// expand a suffixed amount (`10M` → `10000000`).
pub(crate) fn si(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    const PREFIXES: &str = " kMGTPE";
    expect_args("si", args, 1, 1)?;
    let text = args[0].to_string();
    if let Some(caps) = si_re().captures(&text) {
        let mut digits = caps[1].to_string();
        if digits.starts_with('.') {
            digits.insert(0, '0');
        }
        let amount = parse_number(&digits).ok_or_else(|| invalid("si"))?;
        let power = PREFIXES.find(&caps[2]).unwrap_or(0) as i64 * 3;
        let scale = power_of_ten(power)?;
        return amount
            .checked_mul(scale)
            .map(|n| Value::Number(precision.finish(n)))
            .ok_or_else(|| invalid("si overflow"));
    }
    let Some(n) = args[0].as_number().or_else(|| parse_number(&text)) else {
        return Ok(args[0].clone());
    };
    let magnitude = n.abs();
    let group = if magnitude.is_zero() {
        0
    } else {
        let digits = crate::engine::precision::exponent(&magnitude);
        (digits.max(0) / 3).min(PREFIXES.len() as i64 - 1)
    };
    let scaled = divide(n, power_of_ten(group * 3)?)?;
    let mut rounded = scaled.round_dp_with_strategy(3, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(3);
    let suffix = &PREFIXES[group as usize..group as usize + 1];
    Ok(Value::Text(format!("{rounded} {suffix}").trim().to_string()))
}

fn power_of_ten(power: i64) -> Result<Decimal, EvalError> {
    let power = u32::try_from(power).map_err(|_| invalid("power of ten"))?;
    Decimal::from_i128(10i128.pow(power.min(28))).ok_or_else(|| invalid("power of ten"))
}

/// A fresh decimal in `[0, 1)` with twelve places.
pub(crate) fn random(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("random", args, 0, 0)?;
    Ok(Value::Number(random_decimal()))
}

pub fn random_decimal() -> Decimal {
    let mut rng = rand::thread_rng();
    Decimal::new(rng.gen_range(0..1_000_000_000_000i64), 12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn num(s: &str) -> Value {
        Value::Number(Decimal::from_str(s).unwrap())
    }

    fn call(f: fn(&[Value], &Precision) -> Result<Value, EvalError>, args: &[Value]) -> String {
        f(args, &Precision::default()).unwrap().to_string()
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(call(sqrt, &[num("135")]), "11.6189500386");
        assert_eq!(call(sqrt, &[num("30.2")]), "5.49545266561");
        assert_eq!(call(sqrt, &[num("4")]), "2");
        assert!(sqrt(&[num("-1")], &Precision::default()).is_err());
    }

    #[test]
    fn test_divmod() {
        assert_eq!(call(divmod, &[num("7"), num("2")]), "(3, 1)");
        assert_eq!(
            divmod(&[num("1"), num("0")], &Precision::default()),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_trig_in_degrees() {
        assert_eq!(call(sind, &[num("30")]), "0.5");
        assert_eq!(call(sind, &[num("90")]), "1");
        assert_eq!(call(cosd, &[num("60")]), "0.5");
        assert_eq!(call(tand, &[num("45")]), "1");
        assert_eq!(
            tand(&[num("90")], &Precision::default()),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_degrees_and_radians() {
        assert_eq!(call(degrees, &[num("1")]), "57.2957795131");
        assert_eq!(call(radians, &[num("90")]), "1.57079632679");
        assert_eq!(call(degrees, &[num("0")]), "0");
    }

    #[test]
    fn test_angle_and_dir() {
        assert_eq!(call(angle, &[num("4"), num("3")]), "36.8698976462");
        assert_eq!(call(dir, &[num("0")]), "(1, 0)");
    }

    #[test]
    fn test_pyth_add() {
        assert_eq!(call(pyth_add, &[num("5"), num("12")]), "13");
    }

    #[test]
    fn test_radix_text() {
        assert_eq!(call(hex, &[num("100")]), "0x64");
        assert_eq!(call(hex, &[num("0")]), "0x0");
        assert_eq!(call(hex, &[num("3.14")]), "0x3.23d70a3d70");
        assert_eq!(call(oct, &[num("3.14")]), "0o3.1075341217");
    }

    #[test]
    fn test_factors() {
        assert_eq!(call(factors, &[num("12345")]), "(3, 5, 823)");
        assert_eq!(call(factors, &[num("128")]), "(2, 2, 2, 2, 2, 2, 2)");
    }

    #[test]
    fn test_si() {
        assert_eq!(call(si, &[Value::text("10M")]), "10000000");
        assert_eq!(call(si, &[num("12315350")]), "12.315 M");
        assert_eq!(call(si, &[num("10")]), "10.000");
        assert_eq!(call(si, &[Value::text("Heading")]), "Heading");
    }

    #[test]
    fn test_round() {
        assert_eq!(call(round, &[num("2.5")]), "2");
        assert_eq!(call(round, &[num("2.675"), num("2")]), "2.68");
        assert_eq!(call(round, &[num("1250"), num("-2")]), "1200");
    }

    #[test]
    fn test_int_and_decimal() {
        assert_eq!(call(int, &[num("-7.9")]), "-7");
        assert_eq!(call(int, &[Value::text("12")]), "12");
        assert_eq!(call(decimal, &[Value::text("2.")]), "2.0");
        assert_eq!(call(decimal, &[Value::text(".5")]), "0.5");
    }

    #[test]
    fn test_power_exact_and_fractional() {
        let p = Precision::default();
        assert_eq!(power(Decimal::from(3), Decimal::from(4), &p).unwrap(), Decimal::from(81));
        assert_eq!(
            power(Decimal::ZERO, Decimal::from(-1), &p),
            Err(EvalError::DivisionByZero)
        );
        assert!(power(Decimal::from(-8), Decimal::from_str("0.5").unwrap(), &p).is_err());
    }

    #[test]
    fn test_random_range() {
        for _ in 0..100 {
            let n = random_decimal();
            assert!(n >= Decimal::ZERO && n < Decimal::ONE);
        }
    }
}
