//! Date/time normalization for heterogeneous spreadsheet exports.
//!
//! Interpretations are tried in a fixed order and the first that parses wins:
//!
//! 1. ISO-like `YYYY-MM-DD HH:MM:SS` (exactly 19 characters, `-` at index 4)
//! 2. 12-hour clock `M/D/YYYY h:mm:ss AM|PM`
//! 3. explicit formats `DD.MM.YYYY HH:MM:SS`, `YYYY-MM-DD HH:MM:SS`, `MM/DD/YYYY HH:MM:SS`
//! 4. a best-effort list of common layouts
//!
//! Day/month order is decided by the separator alone: `/` is month-first and
//! `.` is day-first. A value is never re-read with the other order when the
//! first reading fails, so `03/04/2024` is always March 4th.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, warn};

use crate::constants::TIMESTAMP_FORMAT;
use crate::error::{DashboardError, Result};

/// Raw date value as it comes out of a source table
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    Missing,
    Timestamp(NaiveDateTime),
    Raw(String),
}

static TWELVE_HOUR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}\s+\d{1,2}:\d{2}:\d{2}\s*(?i:am|pm)$")
        .expect("twelve-hour pattern is valid")
});

const TWELVE_HOUR_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

const EXPLICIT_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S", // 08.12.2024 09:37:03
    "%Y-%m-%d %H:%M:%S", // 2024-12-08 09:37:03
    "%m/%d/%Y %H:%M:%S", // 12/8/2024 09:37:03
];

const LENIENT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
];

const LENIENT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// Normalize one raw value. `Missing` (and blank text) yields `Ok(None)`.
pub fn normalize_date(input: &DateInput) -> Result<Option<NaiveDateTime>> {
    let raw = match input {
        DateInput::Missing => return Ok(None),
        DateInput::Timestamp(ts) => return Ok(Some(*ts)),
        DateInput::Raw(raw) => raw.as_str(),
    };

    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }

    debug!("Converting date: {}", value);

    if let Some(ts) = parse_iso(value)
        .or_else(|| parse_twelve_hour(value))
        .or_else(|| parse_explicit(value))
        .or_else(|| parse_lenient(value))
    {
        return Ok(Some(ts));
    }

    error!("Could not convert date: {:?}", raw);
    Err(DashboardError::DateFormat {
        raw: raw.to_string(),
    })
}

fn parse_iso(value: &str) -> Option<NaiveDateTime> {
    if value.chars().count() == 19 && value.chars().nth(4) == Some('-') {
        NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
    } else {
        None
    }
}

fn parse_twelve_hour(value: &str) -> Option<NaiveDateTime> {
    if !TWELVE_HOUR.is_match(value) {
        return None;
    }
    NaiveDateTime::parse_from_str(&value.to_ascii_uppercase(), TWELVE_HOUR_FORMAT).ok()
}

fn parse_explicit(value: &str) -> Option<NaiveDateTime> {
    EXPLICIT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn parse_lenient(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    if let Some(ts) = LENIENT_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(ts);
    }
    LENIENT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Uniform column parse: succeeds only when every value is missing, already a
/// timestamp, or in the canonical `YYYY-MM-DD HH:MM:SS` layout.
pub fn parse_column_strict(values: &[DateInput]) -> Option<Vec<Option<NaiveDateTime>>> {
    values
        .iter()
        .map(|v| match v {
            DateInput::Missing => Some(None),
            DateInput::Timestamp(ts) => Some(Some(*ts)),
            DateInput::Raw(raw) if raw.trim().is_empty() => Some(None),
            DateInput::Raw(raw) => NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
                .ok()
                .map(Some),
        })
        .collect()
}

/// Convert a whole column: strict bulk pass first, per-value normalization on failure.
pub fn normalize_column(values: &[DateInput]) -> Result<Vec<Option<NaiveDateTime>>> {
    if let Some(parsed) = parse_column_strict(values) {
        return Ok(parsed);
    }

    warn!("Bulk date conversion failed, converting values one by one");
    values.iter().map(normalize_date).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_missing_is_none() {
        assert_eq!(normalize_date(&DateInput::Missing).unwrap(), None);
        assert_eq!(normalize_date(&DateInput::Raw("   ".into())).unwrap(), None);
    }

    #[test]
    fn test_timestamp_passes_through() {
        let t = ts(2024, 6, 19, 11, 25, 42);
        assert_eq!(normalize_date(&DateInput::Timestamp(t)).unwrap(), Some(t));
    }

    #[test]
    fn test_iso_layout() {
        assert_eq!(
            normalize_date(&DateInput::Raw("2024-06-19 11:25:42".into())).unwrap(),
            Some(ts(2024, 6, 19, 11, 25, 42))
        );
    }

    #[test]
    fn test_twelve_hour_layout() {
        assert_eq!(
            normalize_date(&DateInput::Raw("12/8/2024 9:42:48 AM".into())).unwrap(),
            Some(ts(2024, 12, 8, 9, 42, 48))
        );
        assert_eq!(
            normalize_date(&DateInput::Raw("12/8/2024 9:42:48 pm".into())).unwrap(),
            Some(ts(2024, 12, 8, 21, 42, 48))
        );
        assert_eq!(
            normalize_date(&DateInput::Raw("1/2/2025 12:05:00 AM".into())).unwrap(),
            Some(ts(2025, 1, 2, 0, 5, 0))
        );
    }

    #[test]
    fn test_dotted_layout_is_day_first() {
        assert_eq!(
            normalize_date(&DateInput::Raw("08.12.2024 09:37:03".into())).unwrap(),
            Some(ts(2024, 12, 8, 9, 37, 3))
        );
    }

    #[test]
    fn test_slashed_layout_is_month_first() {
        assert_eq!(
            normalize_date(&DateInput::Raw("03/04/2024 10:00:00".into())).unwrap(),
            Some(ts(2024, 3, 4, 10, 0, 0))
        );
    }

    #[test]
    fn test_same_instant_in_every_layout() {
        let expected = Some(ts(2024, 12, 8, 9, 42, 48));
        for raw in [
            "2024-12-08 09:42:48",
            "12/8/2024 9:42:48 AM",
            "08.12.2024 09:42:48",
            "12/08/2024 09:42:48",
            "2024-12-08T09:42:48",
        ] {
            assert_eq!(normalize_date(&DateInput::Raw(raw.into())).unwrap(), expected, "{}", raw);
        }
    }

    #[test]
    fn test_date_only_is_midnight() {
        assert_eq!(
            normalize_date(&DateInput::Raw("2024-12-08".into())).unwrap(),
            Some(ts(2024, 12, 8, 0, 0, 0))
        );
    }

    #[test]
    fn test_unparseable_keeps_raw_value() {
        match normalize_date(&DateInput::Raw("not-a-date".into())) {
            Err(DashboardError::DateFormat { raw }) => assert_eq!(raw, "not-a-date"),
            other => panic!("expected DateFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_impossible_month_is_rejected() {
        assert!(normalize_date(&DateInput::Raw("13/25/2024 10:00:00".into())).is_err());
    }

    #[test]
    fn test_strict_column_rejects_mixed_layouts() {
        let values = [DateInput::Raw("2024-12-08 09:42:48".into()), DateInput::Raw("08.12.2024 09:37:03".into())];
        assert!(parse_column_strict(&values).is_none());

        let parsed = normalize_column(&values).unwrap();
        assert_eq!(parsed[0], Some(ts(2024, 12, 8, 9, 42, 48)));
        assert_eq!(parsed[1], Some(ts(2024, 12, 8, 9, 37, 3)));
    }

    #[test]
    fn test_column_fails_on_first_bad_value() {
        let values = [DateInput::Raw("08.12.2024 09:37:03".into()), DateInput::Raw("yesterday-ish".into())];
        match normalize_column(&values) {
            Err(DashboardError::DateFormat { raw }) => assert_eq!(raw, "yesterday-ish"),
            other => panic!("expected DateFormat error, got {:?}", other),
        }
    }
}
