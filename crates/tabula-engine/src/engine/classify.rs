//! Cell text classification.
//!
//! Decides whether a cell's text denotes a number, a boolean or plain text.
//! Numbers may carry decoration (currency symbols, thousands separators, a
//! trailing percent sign or fraction glyph, radix prefixes) which is removed
//! before parsing.

use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use std::sync::OnceLock;

use super::precision::{exponent, round_significant};
use super::value::Value;

const CURRENCY: &[char] = &['$', '£', '€', '¥'];

fn grouped_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{1,3}(?:[,_]\d{3})+(?:\.\d*)?(?:[eE][+-]?\d+)?$")
            .expect("thousands separator regex must compile")
    })
}

/// Classify a cell's text.
pub fn classify(text: &str) -> Value {
    match text.trim() {
        "True" => return Value::Bool(true),
        "False" => return Value::Bool(false),
        _ => {}
    }
    match parse_number(text) {
        Some(n) => Value::Number(n),
        None => Value::Text(text.to_string()),
    }
}

/// Parse decorated numeric text into an exact decimal.
pub fn parse_number(text: &str) -> Option<Decimal> {
    let mut body = text.trim().trim_start_matches(CURRENCY);
    let mut negative = false;
    if let Some(rest) = body.strip_prefix(['-', '−']) {
        negative = true;
        body = rest;
    } else if let Some(rest) = body.strip_prefix('+') {
        body = rest;
    }
    body = body.trim_start_matches(CURRENCY);
    if body.starts_with(['+', '-', '−']) {
        return None;
    }

    let mut percent = false;
    if let Some(rest) = body.strip_suffix('%') {
        percent = true;
        body = rest;
    }

    let mut fraction = Decimal::ZERO;
    if let Some(last) = body.chars().last() {
        let glyph = match last {
            '¼' => Some(Decimal::new(25, 2)),
            '½' => Some(Decimal::new(5, 1)),
            '¾' => Some(Decimal::new(75, 2)),
            _ => None,
        };
        if let Some(glyph) = glyph {
            fraction = glyph;
            body = &body[..body.len() - last.len_utf8()];
        }
    }

    if !body.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let magnitude = parse_radix(body).or_else(|| parse_decimal(body))?;
    let mut value = magnitude.checked_add(fraction)?;
    if percent {
        value = value.checked_div(Decimal::ONE_HUNDRED)?;
    }
    Some(if negative { -value } else { value })
}

fn parse_radix(body: &str) -> Option<Decimal> {
    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d)
    } else {
        return None;
    };
    let digits = digits.replace('_', "");
    if digits.is_empty() {
        return None;
    }
    let n = i128::from_str_radix(&digits, radix).ok()?;
    Decimal::from_i128(n)
}

fn parse_decimal(body: &str) -> Option<Decimal> {
    let cleaned;
    let body = if grouped_re().is_match(body) {
        cleaned = body.replace([',', '_'], "");
        cleaned.as_str()
    } else {
        body
    };
    if !body
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }
    if body.contains(['e', 'E']) {
        Decimal::from_scientific(body).ok()
    } else {
        Decimal::from_str(body).ok()
    }
}

/// Round numeric text to a fixed number of decimal places.
///
/// Non-numeric text is returned unchanged.
pub fn round_to_places(text: &str, places: u32) -> String {
    match classify(text) {
        Value::Number(n) => fixed_places(n, places).to_string(),
        _ => text.to_string(),
    }
}

/// Round numeric text to a number of significant figures.
///
/// An exact zero becomes `"0"`; non-numeric text is returned unchanged.
pub fn reduce_to_significant_figures(text: &str, figures: u32) -> String {
    let Value::Number(n) = classify(text) else {
        return text.to_string();
    };
    if n.is_zero() {
        return "0".to_string();
    }
    let places = figures as i64 - 1 - exponent(&n);
    if places >= 0 {
        fixed_places(n, places.min(28) as u32).to_string()
    } else {
        round_significant(n, figures).round_dp(0).to_string()
    }
}

fn fixed_places(n: Decimal, places: u32) -> Decimal {
    let mut rounded = n.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(places);
    rounded
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn classify_is_idempotent_on_rendered_numbers(m in -10_000_000_000i64..10_000_000_000i64, scale in 0u32..10) {
            let value = Decimal::new(m, scale);
            let rendered = Value::Number(value).to_string();
            prop_assert_eq!(classify(&rendered), Value::Number(value));
        }

        #[test]
        fn classify_never_panics(s in "\\PC{0,12}") {
            let _ = classify(&s);
        }
    }
}
