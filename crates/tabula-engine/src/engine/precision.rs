//! Working precision for decimal arithmetic.
//!
//! Formula arithmetic is exact for sums and products of short literals, but
//! division, roots and logarithms produce long expansions. Those results are
//! rounded to a fixed number of significant digits (12 by default) with
//! round-half-even. The precision is an explicit value passed to whoever needs
//! it; there is no global decimal context.

use rust_decimal::{Decimal, RoundingStrategy};

pub const DEFAULT_PRECISION: u32 = 12;

/// Significant digits kept for inexact results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Precision {
    digits: u32,
}

impl Default for Precision {
    fn default() -> Self {
        Precision {
            digits: DEFAULT_PRECISION,
        }
    }
}

impl Precision {
    /// Clamped to what a 96-bit decimal can represent.
    pub fn new(digits: u32) -> Precision {
        Precision {
            digits: digits.clamp(1, 28),
        }
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Bring an arithmetic result to the working precision.
    ///
    /// Results that already fit keep their scale, so `2.5 * 2` stays `5.0`.
    /// Long expansions of an exact value (`sqrt(4)` computed as
    /// `2.000...`) collapse to their normal form; everything else is rounded.
    pub fn finish(&self, value: Decimal) -> Decimal {
        if significant_digits(&value) <= self.digits {
            return value;
        }
        let normal = value.normalize();
        if significant_digits(&normal) <= self.digits {
            return normal;
        }
        round_significant(value, self.digits)
    }
}

/// Number of digits in the coefficient (at least 1).
pub fn significant_digits(value: &Decimal) -> u32 {
    let mantissa = value.mantissa().unsigned_abs();
    if mantissa == 0 {
        1
    } else {
        mantissa.ilog10() + 1
    }
}

/// Decimal exponent of the most significant digit, i.e. `floor(log10(|v|))`
/// for non-zero values.
pub fn exponent(value: &Decimal) -> i64 {
    significant_digits(value) as i64 - 1 - value.scale() as i64
}

/// Round to `digits` significant digits, half to even.
pub fn round_significant(value: Decimal, digits: u32) -> Decimal {
    if value.is_zero() {
        return value;
    }
    let places = digits as i64 - 1 - exponent(&value);
    if places >= 0 {
        let places = places.min(28) as u32;
        return value.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
    }

    let shift = (-places).min(28) as u32;
    let Ok(factor) = Decimal::try_from_i128_with_scale(10i128.pow(shift), 0) else {
        return value;
    };
    value
        .checked_div(factor)
        .map(|q| q.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven))
        .and_then(|q| q.checked_mul(factor))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_significant_digits() {
        assert_eq!(significant_digits(&d("0")), 1);
        assert_eq!(significant_digits(&d("5.0")), 2);
        assert_eq!(significant_digits(&d("-123.45")), 5);
    }

    #[test]
    fn test_exponent() {
        assert_eq!(exponent(&d("135")), 2);
        assert_eq!(exponent(&d("0.00123")), -3);
        assert_eq!(exponent(&d("5.0")), 0);
    }

    #[test]
    fn test_finish_keeps_short_results() {
        let p = Precision::default();
        assert_eq!(p.finish(d("5.0")).to_string(), "5.0");
    }

    #[test]
    fn test_finish_collapses_exact_expansions() {
        let p = Precision::default();
        assert_eq!(p.finish(d("2.0000000000000000000000000")).to_string(), "2");
    }

    #[test]
    fn test_finish_rounds_long_results() {
        let p = Precision::default();
        let third = d("1").checked_div(d("3")).unwrap();
        assert_eq!(p.finish(third).to_string(), "0.333333333333");
    }

    #[test]
    fn test_round_significant_large_values() {
        assert_eq!(round_significant(d("123456"), 3).to_string(), "123000");
    }

    #[test]
    fn test_round_significant_half_even() {
        assert_eq!(round_significant(d("2.5"), 1).to_string(), "2");
        assert_eq!(round_significant(d("3.5"), 1).to_string(), "4");
    }
}
