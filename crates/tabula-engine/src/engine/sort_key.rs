//! Composite sort keys for mixed-content columns.
//!
//! Every cell maps to a `(rank, canon)` pair. Numbers, dates, clock times and
//! byte sizes get a numeric rank; everything else is ranked at one end of the
//! scale and ordered by its upper-cased text. Labels ending in digits are
//! zero-padded so that `A2` sorts before `A10`.

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;
use std::sync::OnceLock;

use super::classify::parse_number;
use super::dates::parse_datetime;

/// Rank given to text; large enough to sit outside any real value.
pub const SENTINEL: f64 = 1e12;

#[derive(Clone, Debug, PartialEq)]
pub struct SortKey {
    pub rank: f64,
    pub canon: String,
}

impl Eq for SortKey {}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .total_cmp(&other.rank)
            .then_with(|| self.canon.cmp(&other.canon))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn clock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d+):)?(\d{1,2}):(\d{2}(?:\.\d+)?)$").expect("clock regex must compile")
    })
}

fn trailing_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*\D)(\d+)$").expect("trailing digits regex must compile"))
}

fn byte_size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d*)?|\.\d+)\s*([KMGTPE])?(IB|B)?$")
            .expect("byte size regex must compile")
    })
}

fn article_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:A|AN|THE)\s+(.+)$").expect("article regex must compile"))
}

/// Build the sort key for one cell. `None` stands for a missing cell.
pub fn sort_key(text: Option<&str>, reverse: bool) -> SortKey {
    let (alpha, omega) = if reverse {
        (SENTINEL, -SENTINEL)
    } else {
        (-SENTINEL, SENTINEL)
    };

    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return SortKey {
            rank: omega,
            canon: String::new(),
        };
    };
    let canon = text.to_uppercase();

    if let Some(n) = parse_number(text) {
        return SortKey {
            rank: n.to_f64().unwrap_or(0.0),
            canon,
        };
    }

    if let Some(dt) = parse_datetime(text) {
        return SortKey {
            rank: dt.and_utc().timestamp() as f64,
            canon,
        };
    }

    if let Some(seconds) = clock_seconds(text) {
        return SortKey {
            rank: seconds,
            canon,
        };
    }

    if let Some(caps) = trailing_digits_re().captures(&canon) {
        let padded = format!("{}{:0>15}", &caps[1], &caps[2]);
        return SortKey {
            rank: alpha,
            canon: padded,
        };
    }

    if let Some(bytes) = byte_size(&canon) {
        return SortKey { rank: bytes, canon };
    }

    if let Some(caps) = article_re().captures(&canon) {
        let rest = caps[1].to_string();
        return SortKey {
            rank: alpha,
            canon: rest,
        };
    }

    SortKey { rank: alpha, canon }
}

fn clock_seconds(text: &str) -> Option<f64> {
    let caps = clock_re().captures(text)?;
    let hours: f64 = match caps.get(1) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0.0,
    };
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn byte_size(canon: &str) -> Option<f64> {
    let caps = byte_size_re().captures(canon)?;
    let prefix = caps.get(2).map(|m| m.as_str());
    let unit = caps.get(3).map(|m| m.as_str());
    if prefix.is_none() && unit.is_none() {
        return None;
    }
    let magnitude: f64 = caps[1].parse().ok()?;
    let base: f64 = if unit == Some("IB") { 1024.0 } else { 1000.0 };
    let power = prefix
        .and_then(|p| "KMGTPE".find(p))
        .map_or(0, |i| i as i32 + 1);
    Some(magnitude * base.powi(power))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> SortKey {
        sort_key(Some(s), false)
    }

    #[test]
    fn test_numbers_sort_numerically() {
        assert!(key("9") < key("10"));
        assert!(key("-3") < key("2.5"));
        assert!(key("$1,000") > key("999"));
    }

    #[test]
    fn test_labels_with_trailing_digits() {
        assert!(key("A1") < key("A2"));
        assert!(key("A2") < key("A10"));
        assert!(key("row9") < key("ROW10"));
    }

    #[test]
    fn test_dates_sort_chronologically() {
        assert!(key("19 May 2020") < key("2020-06-01"));
        assert!(key("31/12/2019") < key("1 Jan 2020"));
    }

    #[test]
    fn test_clock_times() {
        assert!(key("9:59") < key("10:00"));
        assert!(key("1:00:00") > key("59:59"));
    }

    #[test]
    fn test_byte_sizes() {
        assert!(key("999KB") < key("1MB"));
        assert!(key("961B") < key("1K"));
        assert_eq!(key("1KiB").rank, 1024.0);
        assert_eq!(key("1KB").rank, 1000.0);
    }

    #[test]
    fn test_articles_are_ignored() {
        assert_eq!(key("The Beatles").canon, "BEATLES");
        assert!(key("The Beatles") < key("Cream"));
    }

    #[test]
    fn test_text_sorts_before_numbers() {
        assert!(key("Week") < key("1"));
    }

    #[test]
    fn test_missing_values_sort_last() {
        assert!(sort_key(None, false) > key("zzz"));
        assert!(sort_key(None, false) > key("1e9"));
        assert!(sort_key(Some(""), false) > key("5"));
    }

    #[test]
    fn test_reverse_swaps_sentinels() {
        let missing = sort_key(None, true);
        let text = sort_key(Some("label"), true);
        assert_eq!(missing.rank, -SENTINEL);
        assert_eq!(text.rank, SENTINEL);
    }
}
