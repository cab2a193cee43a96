//! Date expressions
//!
//! Date rule arguments come in two forms:
//!
//! - Absolute ISO-8601 prefixes: `2022`, `2022-03`, `2022-03-03`,
//!   `2022-03-03T10`, `2022-03-03T10:50`, `2022-03-03T10:50:12`, optionally
//!   followed by fractional seconds and a `Z` / `+01:00` offset. Components
//!   without an offset are read as UTC.
//! - Relative expressions: `$now` or `$now(y:-1,d:-1)` with units
//!   `y`, `M`, `d`, `h`, `m`, `s`.
//!
//! Parsing yields an instant plus the finest unit the expression expressed.
//! Absolute instants are returned as written; the unit tells callers what
//! precision was implied. Relative instants are truncated to the start of the
//! finest referenced unit (day when none is given).

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, TimeZone, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Resolution of a date expression, ordered finest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DateUnit {
    #[serde(rename = "s")]
    Second,
    #[serde(rename = "m")]
    Minute,
    #[serde(rename = "h")]
    Hour,
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "M")]
    Month,
    #[serde(rename = "y")]
    Year,
}

impl DateUnit {
    /// Parse a unit letter as used in `$now(...)` expressions
    pub fn from_letter(letter: &str) -> Option<DateUnit> {
        match letter {
            "s" => Some(DateUnit::Second),
            "m" => Some(DateUnit::Minute),
            "h" => Some(DateUnit::Hour),
            "d" => Some(DateUnit::Day),
            "M" => Some(DateUnit::Month),
            "y" => Some(DateUnit::Year),
            _ => None,
        }
    }

    pub fn letter(&self) -> &'static str {
        match self {
            DateUnit::Second => "s",
            DateUnit::Minute => "m",
            DateUnit::Hour => "h",
            DateUnit::Day => "d",
            DateUnit::Month => "M",
            DateUnit::Year => "y",
        }
    }
}

impl fmt::Display for DateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// Malformed date expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid date expression: '{input}'")]
pub struct DateParseError {
    pub input: String,
}

fn absolute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(\d{4})(?:-(\d{2})(?:-(\d{2})(?:T(\d{2})(?::(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?(Z|[+-]\d{2}:?\d{2})?)?)?)?)?$",
        )
        .expect("absolute date pattern is valid")
    })
}

fn relative_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\$now(?:\(([^()]+)\))?$")
            .expect("relative date pattern is valid")
    })
}

/// Parse an absolute or relative date expression
///
/// `now` anchors relative expressions; it is ignored for absolute ones.
pub fn parse_date(
    input: &str,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateUnit), DateParseError> {
    let parsed = if input.starts_with("$now") {
        parse_relative(input, now)
    } else {
        parse_absolute(input)
    };

    parsed.ok_or_else(|| DateParseError {
        input: input.to_string(),
    })
}

/// Whether the input is a valid absolute or relative date expression
pub fn is_valid_date(input: &str) -> bool {
    parse_date(input, Utc::now()).is_ok()
}

/// The finest unit of a set (seconds < minutes < hours < days < months < years)
pub fn get_min_date_unit(units: &[DateUnit]) -> Option<DateUnit> {
    units.iter().copied().min()
}

/// Inclusive range check; a missing bound is unbounded
pub fn is_date_between(
    date: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    start.map_or(true, |start| date >= start) && end.map_or(true, |end| date <= end)
}

/// Truncate to the start of the given unit
pub fn start_of(date: DateTime<Utc>, unit: DateUnit) -> DateTime<Utc> {
    let (year, month, day) = (date.year(), date.month(), date.day());
    let (hour, minute, second) = (date.hour(), date.minute(), date.second());

    let (month, day, hour, minute, second) = match unit {
        DateUnit::Year => (1, 1, 0, 0, 0),
        DateUnit::Month => (month, 1, 0, 0, 0),
        DateUnit::Day => (month, day, 0, 0, 0),
        DateUnit::Hour => (month, day, hour, 0, 0),
        DateUnit::Minute => (month, day, hour, minute, 0),
        DateUnit::Second => (month, day, hour, minute, second),
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .map(|naive| naive.and_utc())
        .unwrap_or(date)
}

/// Last millisecond of the given unit
pub fn end_of(date: DateTime<Utc>, unit: DateUnit) -> DateTime<Utc> {
    let start = start_of(date, unit);
    add_delta(start, unit, 1)
        .map(|next| next - Duration::milliseconds(1))
        .unwrap_or(start)
}

/// Calendar arithmetic; month arithmetic clamps to the end of the month
pub fn add_delta(date: DateTime<Utc>, unit: DateUnit, delta: i64) -> Option<DateTime<Utc>> {
    match unit {
        DateUnit::Year => add_months(date, delta.checked_mul(12)?),
        DateUnit::Month => add_months(date, delta),
        DateUnit::Day => date.checked_add_signed(Duration::try_days(delta)?),
        DateUnit::Hour => date.checked_add_signed(Duration::try_hours(delta)?),
        DateUnit::Minute => date.checked_add_signed(Duration::try_minutes(delta)?),
        DateUnit::Second => date.checked_add_signed(Duration::try_seconds(delta)?),
    }
}

fn add_months(date: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

fn parse_relative(input: &str, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateUnit)> {
    let caps = relative_pattern().captures(input)?;

    let mut date = now;
    let mut units = Vec::new();
    if let Some(deltas) = caps.get(1) {
        // Each delta applies to the running date, in the order written
        for part in deltas.as_str().split(',') {
            let (unit, delta) = part.split_once(':')?;
            let unit = DateUnit::from_letter(unit)?;
            let delta = delta.parse::<i64>().ok()?;
            date = add_delta(date, unit, delta)?;
            units.push(unit);
        }
    }

    let unit = get_min_date_unit(&units).unwrap_or(DateUnit::Day);
    Some((start_of(date, unit), unit))
}

fn parse_absolute(input: &str) -> Option<(DateTime<Utc>, DateUnit)> {
    let caps = absolute_pattern().captures(input)?;
    let component = |index: usize| caps.get(index).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let (month, day) = (component(2), component(3));
    let (hour, minute, second) = (component(4), component(5), component(6));

    let unit = [
        (second, DateUnit::Second),
        (minute, DateUnit::Minute),
        (hour, DateUnit::Hour),
        (day, DateUnit::Day),
        (month, DateUnit::Month),
    ]
    .into_iter()
    .find_map(|(value, unit)| value.map(|_| unit))
    .unwrap_or(DateUnit::Year);

    let nanos = caps
        .get(7)
        .and_then(|m| format!("{:0<9}", m.as_str()).parse::<u32>().ok())
        .unwrap_or(0);

    let naive = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))?
        .and_hms_nano_opt(
            hour.unwrap_or(0),
            minute.unwrap_or(0),
            second.unwrap_or(0),
            nanos,
        )?;

    let instant = match caps.get(8) {
        None => naive.and_utc(),
        Some(offset) => parse_offset(offset.as_str())?
            .from_local_datetime(&naive)
            .single()?
            .with_timezone(&Utc),
    };

    Some((instant, unit))
}

fn parse_offset(offset: &str) -> Option<FixedOffset> {
    if offset == "Z" {
        return FixedOffset::east_opt(0);
    }

    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits: String = offset[1..].chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 {
        return None;
    }
    let hours = digits[..2].parse::<i32>().ok()?;
    let minutes = digits[2..].parse::<i32>().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
            .single()
            .unwrap()
    }

    #[test]
    fn test_absolute_minute_precision() {
        let (date, unit) = parse_date("2022-03-03T10:50", Utc::now()).unwrap();
        assert_eq!(date, utc(2022, 3, 3, 10, 50, 0));
        assert_eq!(unit, DateUnit::Minute);
    }

    #[test]
    fn test_absolute_units() {
        let now = Utc::now();
        let cases = [
            ("2022", DateUnit::Year, utc(2022, 1, 1, 0, 0, 0)),
            ("2022-03", DateUnit::Month, utc(2022, 3, 1, 0, 0, 0)),
            ("2022-03-03", DateUnit::Day, utc(2022, 3, 3, 0, 0, 0)),
            ("2022-03-03T10", DateUnit::Hour, utc(2022, 3, 3, 10, 0, 0)),
            ("2022-03-03T10:50:12", DateUnit::Second, utc(2022, 3, 3, 10, 50, 12)),
        ];

        for (input, expected_unit, expected_date) in cases {
            let (date, unit) = parse_date(input, now).unwrap();
            assert_eq!(unit, expected_unit, "unit of {}", input);
            assert_eq!(date, expected_date, "date of {}", input);
        }
    }

    #[test]
    fn test_absolute_is_not_rounded() {
        let (date, unit) = parse_date("2022-03-03T10:50:12.250Z", Utc::now()).unwrap();
        assert_eq!(unit, DateUnit::Second);
        assert_eq!(date, utc(2022, 3, 3, 10, 50, 12) + Duration::milliseconds(250));
    }

    #[test]
    fn test_absolute_with_offset() {
        let (date, unit) = parse_date("2022-03-03T10:50+02:00", Utc::now()).unwrap();
        assert_eq!(unit, DateUnit::Minute);
        assert_eq!(date, utc(2022, 3, 3, 8, 50, 0));
    }

    #[test]
    fn test_invalid_dates() {
        for input in [
            "",
            "22",
            "2022-3-3",
            "2022-13",
            "2023-02-29",
            "2022-03-03T25",
            "2022-03-03 10:50",
            "2022-03-03T10:50Zjunk",
            "$now()",
            "$now(w:1)",
            "$now(d:x)",
            "$now(d)",
            "$nowish",
            "now",
        ] {
            assert!(parse_date(input, Utc::now()).is_err(), "{} should be invalid", input);
            assert!(!is_valid_date(input), "{} should be invalid", input);
        }
    }

    #[test]
    fn test_relative_plain_now_is_start_of_day() {
        let now = utc(2024, 5, 17, 13, 45, 10);
        let (date, unit) = parse_date("$now", now).unwrap();
        assert_eq!(unit, DateUnit::Day);
        assert_eq!(date, utc(2024, 5, 17, 0, 0, 0));
    }

    #[test]
    fn test_relative_year_then_day() {
        let now = utc(2024, 3, 1, 15, 30, 0);
        let (date, unit) = parse_date("$now(y:-1,d:-1)", now).unwrap();
        assert_eq!(unit, DateUnit::Day);
        assert_eq!(date, utc(2023, 2, 28, 0, 0, 0));
    }

    #[test]
    fn test_relative_order_matters() {
        let now = utc(2024, 3, 31, 12, 0, 0);

        // 2024-03-31 -> 2024-02-29 -> 2024-02-28
        let (month_first, _) = parse_date("$now(M:-1,d:-1)", now).unwrap();
        assert_eq!(month_first, utc(2024, 2, 28, 0, 0, 0));

        // 2024-03-31 -> 2024-03-30 -> 2024-02-29
        let (day_first, _) = parse_date("$now(d:-1,M:-1)", now).unwrap();
        assert_eq!(day_first, utc(2024, 2, 29, 0, 0, 0));
    }

    #[test]
    fn test_relative_truncates_by_finest_unit() {
        let now = utc(2024, 5, 17, 13, 45, 10);

        let (date, unit) = parse_date("$now(h:2,y:1)", now).unwrap();
        assert_eq!(unit, DateUnit::Hour);
        assert_eq!(date, utc(2025, 5, 17, 15, 0, 0));

        let (date, unit) = parse_date("$now(M:+1)", now).unwrap();
        assert_eq!(unit, DateUnit::Month);
        assert_eq!(date, utc(2024, 6, 1, 0, 0, 0));

        let (date, unit) = parse_date("$now(s:-10)", now).unwrap();
        assert_eq!(unit, DateUnit::Second);
        assert_eq!(date, utc(2024, 5, 17, 13, 45, 0));
    }

    #[test]
    fn test_min_date_unit() {
        let letters = |letters: &[&str]| -> Vec<DateUnit> {
            letters.iter().map(|l| DateUnit::from_letter(l).unwrap()).collect()
        };
        assert_eq!(get_min_date_unit(&letters(&["d", "y"])), Some(DateUnit::Day));
        assert_eq!(
            get_min_date_unit(&letters(&["d", "y", "h", "s"])),
            Some(DateUnit::Second)
        );
        assert_eq!(get_min_date_unit(&letters(&["M", "y"])), Some(DateUnit::Month));
        assert_eq!(get_min_date_unit(&[]), None);
    }

    #[test]
    fn test_start_and_end_of() {
        let date = utc(2024, 2, 10, 13, 45, 10);
        assert_eq!(start_of(date, DateUnit::Month), utc(2024, 2, 1, 0, 0, 0));
        assert_eq!(
            end_of(date, DateUnit::Month),
            utc(2024, 3, 1, 0, 0, 0) - Duration::milliseconds(1)
        );
        assert_eq!(
            end_of(date, DateUnit::Hour),
            utc(2024, 2, 10, 14, 0, 0) - Duration::milliseconds(1)
        );
        assert_eq!(start_of(date, DateUnit::Year), utc(2024, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_is_date_between() {
        let date = utc(2024, 2, 10, 0, 0, 0);
        let before = utc(2024, 1, 1, 0, 0, 0);
        let after = utc(2024, 3, 1, 0, 0, 0);

        assert!(is_date_between(date, Some(before), Some(after)));
        assert!(is_date_between(date, Some(date), Some(date)));
        assert!(is_date_between(date, None, Some(after)));
        assert!(is_date_between(date, Some(before), None));
        assert!(is_date_between(date, None, None));
        assert!(!is_date_between(date, Some(after), None));
        assert!(!is_date_between(date, None, Some(before)));
    }

    #[test]
    fn test_parse_and_validity_agree() {
        let now = Utc::now();
        for input in [
            "2022",
            "2022-03-03T10:50",
            "$now",
            "$now(y:-1,d:-1)",
            "2022-02-30",
            "$now(q:1)",
            "1999-12-31T23:59:59Z",
        ] {
            assert_eq!(parse_date(input, now).is_ok(), is_valid_date(input), "{}", input);
        }
    }

    #[test]
    fn test_unit_serde() {
        assert_eq!(serde_json::to_string(&DateUnit::Month).unwrap(), "\"M\"");
        let unit: DateUnit = serde_json::from_str("\"m\"").unwrap();
        assert_eq!(unit, DateUnit::Minute);
    }
}
