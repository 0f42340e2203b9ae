//! Calendar parsing shared by sort keys and the date builtins.
//!
//! Dates are accepted in many spellings: ISO (`2020-05-19`), compact
//! (`20200519`), day-first with month names (`19 May 2020`, `19-May-2020`),
//! slashed day-first (`19/05/2020`), month-first names (`May 19, 2020`) and ISO
//! week dates (`2020-W21-2`). Leading weekday names and ordinal suffixes are
//! ignored. Date-times add a `HH:MM[:SS[.fff]]` part after a space or `T`.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Weekday};
use regex::Regex;
use std::sync::OnceLock;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y%m%d",
    "%d %B %Y",
    "%d-%B-%Y",
    "%d %B %y",
    "%d-%B-%y",
    "%d/%m/%Y",
    "%d/%m/%y",
    "%d.%m.%Y",
    "%B %d %Y",
    "%G-W%V-%u",
    "%m/%d/%Y",
    "%Y/%m/%d",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

fn weekday_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?\s+")
            .expect("weekday regex must compile")
    })
}

fn ordinal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal regex must compile")
    })
}

fn sept_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bsept\b").expect("sept regex must compile"))
}

fn full_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}").expect("year regex must compile"))
}

fn normalize(text: &str) -> String {
    let s = text.trim().replace(',', " ");
    let s = weekday_prefix_re().replace(&s, "");
    let s = ordinal_re().replace_all(&s, "$1");
    let s = sept_re().replace_all(&s, "Sep");
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn weekday_named(text: &str) -> Option<Weekday> {
    let lower = text.trim().to_ascii_lowercase();
    const NAMES: [(&str, Weekday); 7] = [
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sunday", Weekday::Sun),
    ];
    NAMES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, day)| *day)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a calendar date.
///
/// A bare weekday name means that day in the current ISO week.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Some(day) = weekday_named(text) {
        let now = today();
        return NaiveDate::from_isoywd_opt(now.iso_week().year(), now.iso_week().week(), day);
    }
    let s = normalize(text);
    if s.is_empty() {
        return None;
    }
    let has_full_year = full_year_re().is_match(&s);
    DATE_FORMATS
        .iter()
        .filter(|f| has_full_year || !(f.contains("%Y") || f.contains("%G")))
        .find_map(|f| NaiveDate::parse_from_str(&s, f).ok())
}

/// Parse a date or a date with a time of day.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Some(date) = parse_date(text) {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text.trim()) {
        return Some(dt.naive_utc());
    }
    let s = normalize(text);
    let has_full_year = full_year_re().is_match(&s);
    for date_fmt in DATE_FORMATS {
        if !has_full_year && (date_fmt.contains("%Y") || date_fmt.contains("%G")) {
            continue;
        }
        for time_fmt in TIME_FORMATS {
            for sep in [" ", "T"] {
                let fmt = format!("{date_fmt}{sep}{time_fmt}");
                if let Ok(dt) = NaiveDateTime::parse_from_str(&s, &fmt) {
                    return Some(dt);
                }
            }
        }
    }
    None
}

/// Day number counted from 0001-01-01 (which is day 1).
pub fn ordinal(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64
}

pub fn from_ordinal(days: i64) -> Option<NaiveDate> {
    let days = i32::try_from(days).ok()?;
    NaiveDate::from_num_days_from_ce_opt(days)
}

pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(days)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_and_compact() {
        assert_eq!(parse_date("2020-05-19"), Some(ymd(2020, 5, 19)));
        assert_eq!(parse_date("20200519"), Some(ymd(2020, 5, 19)));
    }

    #[test]
    fn test_month_names() {
        assert_eq!(parse_date("19 May 2020"), Some(ymd(2020, 5, 19)));
        assert_eq!(parse_date("1 January 2001"), Some(ymd(2001, 1, 1)));
        assert_eq!(parse_date("19-May-2020"), Some(ymd(2020, 5, 19)));
        assert_eq!(parse_date("May 19, 2020"), Some(ymd(2020, 5, 19)));
        assert_eq!(parse_date("12 Sept 2023"), Some(ymd(2023, 9, 12)));
    }

    #[test]
    fn test_weekday_and_ordinals_are_ignored() {
        assert_eq!(parse_date("Tuesday 19th May 2020"), Some(ymd(2020, 5, 19)));
        assert_eq!(parse_date("Mon, 1st Jun 2020"), Some(ymd(2020, 6, 1)));
    }

    #[test]
    fn test_two_digit_years_are_not_full_years() {
        assert_eq!(parse_date("01/01/01"), Some(ymd(2001, 1, 1)));
        assert_eq!(parse_date("6/7/95"), Some(ymd(1995, 7, 6)));
    }

    #[test]
    fn test_iso_week_date() {
        assert_eq!(parse_date("2020-W21-2"), Some(ymd(2020, 5, 19)));
    }

    #[test]
    fn test_datetime() {
        let dt = parse_datetime("2020-05-19 12:30").unwrap();
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(12, 30, 0).unwrap());
        assert!(parse_datetime("2020-05-19T08:00:05").is_some());
        assert!(parse_datetime("not a date").is_none());
    }

    #[test]
    fn test_ordinal_round_trip() {
        assert_eq!(ordinal(ymd(1, 1, 1)), 1);
        assert_eq!(ordinal(ymd(2001, 1, 1)), 730486);
        assert_eq!(from_ordinal(730486), Some(ymd(2001, 1, 1)));
    }
}
