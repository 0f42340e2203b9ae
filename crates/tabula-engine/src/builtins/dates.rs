//! Calendar and clock builtins.
//!
//! Dates are exchanged as day numbers (`base`), counted from 0001-01-01 as
//! day 1, so that date arithmetic is plain integer arithmetic in formulas.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt::Write;

use super::{expect_args, invalid, number};
use crate::engine::classify::parse_number;
use crate::engine::dates::{add_days, from_ordinal, ordinal, parse_date, today};
use crate::engine::eval::{EvalError, divide};
use crate::engine::precision::Precision;
use crate::engine::value::Value;

/// Largest day number chrono and the calendar agree on (9999-12-31).
const MAX_ORDINAL: i64 = 3_652_059;
/// Above this a number is read as epoch milliseconds.
const EPOCH_MILLIS_FLOOR: i64 = 100_000_000_000;

const EPOCH_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%b-%Y", "%Y%m%d"];
const EPOCH_TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%H%M%S"];

fn whole(value: &Value) -> Option<i64> {
    match value {
        Value::Text(s) => s.trim().parse().ok(),
        other => other.as_number().and_then(|n| n.trunc().to_i64()),
    }
}

/// Read a value as a date: a day number below 900000, or date text.
fn date_of(value: &Value) -> Option<NaiveDate> {
    if let Some(n) = whole(value)
        && 0 < n
        && n < 900_000
    {
        return from_ordinal(n);
    }
    parse_date(&value.to_string())
}

fn iso_datetime(dt: NaiveDateTime) -> String {
    if dt.and_utc().timestamp_subsec_nanos() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Day number of a date; today with no argument, or today plus `n` days for
/// small whole numbers.
pub(crate) fn base(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("base", args, 0, 1)?;
    let today = today();
    let Some(arg) = args.first() else {
        return Ok(Value::Number(Decimal::from(ordinal(today))));
    };
    if !matches!(arg, Value::Text(_))
        && let Some(n) = arg.as_integer()
        && n.abs() < 1000
    {
        let day = add_days(today, n).ok_or_else(|| invalid("date out of range"))?;
        return Ok(Value::Number(Decimal::from(ordinal(day))));
    }
    Ok(match date_of(arg) {
        Some(date) => Value::Number(Decimal::from(ordinal(date))),
        None => Value::Text(format!("base({arg})")),
    })
}

/// ISO date for a day number. Larger numbers are taken as epoch seconds, or
/// epoch milliseconds beyond about the year 5000.
pub(crate) fn date(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("date", args, 0, 1)?;
    let arg = args.first().cloned().unwrap_or(Value::Number(Decimal::ZERO));
    let n = match &arg {
        Value::Text(s) if s.trim().parse::<i64>().is_err() => match base(&[arg.clone()], precision)? {
            Value::Number(n) => n.to_i64().unwrap_or(0),
            other => return Ok(Value::Text(other.to_string().replacen("base", "date", 1))),
        },
        other => whole(other).unwrap_or(0),
    };

    let today = today();
    let text = if n.abs() < 1000 {
        add_days(today, n).unwrap_or(today).format("%Y-%m-%d").to_string()
    } else if n > EPOCH_MILLIS_FLOOR {
        let dt = DateTime::from_timestamp_millis(n).ok_or_else(|| invalid("timestamp out of range"))?;
        iso_datetime(dt.naive_utc())
    } else if n > MAX_ORDINAL {
        let dt = DateTime::from_timestamp(n, 0).ok_or_else(|| invalid("timestamp out of range"))?;
        iso_datetime(dt.naive_utc())
    } else {
        from_ordinal(n).unwrap_or(today).format("%Y-%m-%d").to_string()
    };
    Ok(Value::Text(text))
}

/// Format a date with a strftime pattern, `%a` (short weekday) by default.
/// Text that is not a date gives back the pattern.
pub(crate) fn dow(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("dow", args, 1, 2)?;
    let pattern = args.get(1).map_or_else(|| "%a".to_string(), Value::to_string);
    if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
        return Ok(Value::Text(pattern));
    }
    let Some(day) = date_of(&args[0]).and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return Ok(Value::Text(pattern));
    };
    let mut out = String::new();
    if write!(out, "{}", day.format(&pattern)).is_err() {
        return Ok(Value::Text(pattern));
    }
    Ok(Value::Text(out))
}

/// Fractional hours (or degrees) as `h:mm:ss.fff`.
pub(crate) fn hms(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("hms", args, 1, 1)?;
    let x = number("hms", &args[0])?;
    let sixty = Decimal::from(60);
    let hours = x.floor();
    let rest = (x - hours).checked_mul(sixty).ok_or_else(|| invalid("hms"))?;
    let minutes = rest.floor();
    let mut seconds = (rest - minutes)
        .checked_mul(sixty)
        .ok_or_else(|| invalid("hms"))?
        .round_dp(3);
    seconds.rescale(3);
    Ok(Value::Text(format!(
        "{hours}:{:0>2}:{:0>6}",
        minutes.to_string(),
        seconds.to_string()
    )))
}

/// Sum of colon-separated parts, the first scaled by `60^shift`, each later
/// one by a further 1/60.
fn clock_parts(name: &str, value: &Value, shift: i32, precision: &Precision) -> Result<Value, EvalError> {
    let text = value.to_string();
    let sixty = Decimal::from(60);
    let mut total = Decimal::ZERO;
    for (i, part) in text.split(':').enumerate() {
        let n = parse_number(part)
            .ok_or_else(|| EvalError::Type(format!("{name}(): '{part}' is not a number")))?;
        let power = shift - i as i32;
        let mut scaled = n;
        for _ in 0..power.unsigned_abs() {
            scaled = if power > 0 {
                scaled.checked_mul(sixty).ok_or_else(|| invalid(name.to_string()))?
            } else {
                divide(scaled, sixty)?
            };
        }
        total = total.checked_add(scaled).ok_or_else(|| invalid(name.to_string()))?;
    }
    Ok(Value::Number(precision.finish(total)))
}

pub(crate) fn hr(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("hr", args, 1, 2)?;
    let shift = match args.get(1) {
        Some(s) => s.as_integer().and_then(|n| i32::try_from(n).ok()).unwrap_or(0),
        None => 0,
    };
    clock_parts("hr", &args[0], shift.clamp(-4, 4), precision)
}

pub(crate) fn mins(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("mins", args, 1, 1)?;
    clock_parts("mins", &args[0], 1, precision)
}

pub(crate) fn secs(args: &[Value], precision: &Precision) -> Result<Value, EvalError> {
    expect_args("secs", args, 1, 1)?;
    clock_parts("secs", &args[0], 2, precision)
}

/// Spoken times (`9am`, `12 noon`, `11:59 p.m.`) as 24-hour `hh:mm`.
pub(crate) fn as_time(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("as_time", args, 1, 1)?;
    let original = args[0].to_string();
    let ts: String = original
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != ':')
        .collect();

    if matches!(ts.as_str(), "noon" | "12noon" | "12pm" | "1200pm") {
        return Ok(Value::text("12:00"));
    }
    if matches!(ts.as_str(), "midnight" | "12midnight" | "12am" | "1200am") {
        return Ok(Value::text("00:00"));
    }

    let (digits, offset) = if let Some(d) = ts.strip_suffix("am") {
        (d, 0)
    } else if let Some(d) = ts.strip_suffix("pm") {
        (d, 12)
    } else {
        return Ok(Value::Text(original));
    };
    let (hh, mm) = if digits.len() <= 2 {
        (digits, "0")
    } else {
        digits.split_at(digits.len() - 2)
    };
    match (hh.parse::<u32>(), mm.parse::<u32>()) {
        (Ok(h), Ok(m)) => Ok(Value::Text(format!("{:02}:{:02}", h % 12 + offset, m))),
        _ => Ok(Value::Text(original)),
    }
}

/// Seconds since 1970-01-01 UTC for a date and time; other text comes back
/// unchanged.
pub(crate) fn epoch(args: &[Value], _: &Precision) -> Result<Value, EvalError> {
    expect_args("epoch", args, 1, 1)?;
    let text = args[0].to_string();
    for date_fmt in EPOCH_DATE_FORMATS {
        for time_fmt in EPOCH_TIME_FORMATS {
            let fmt = format!("{date_fmt} {time_fmt}");
            if let Ok(dt) = NaiveDateTime::parse_from_str(&text, &fmt) {
                return Ok(Value::Number(Decimal::from(dt.and_utc().timestamp())));
            }
        }
    }
    Ok(Value::Text(text))
}
