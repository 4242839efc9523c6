//! Clock values at the parsing boundary.
//!
//! All instants are `f64` seconds since the Unix epoch. Naive wall-clock
//! datetimes are read as UTC; the study exports carry no zone information
//! and every clock in a run is interpreted the same way, so only differences
//! between instants matter.
//!
//! Clinical exports encode unusable times as negative integers (`"-1"`,
//! `"-99"`). Those are mapped to `None` here so that nothing downstream
//! inspects raw strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// Half-width of the window around a diary checkpoint (10 minutes).
pub const DEFAULT_CENTER_RADIUS_S: f64 = 10.0 * SECONDS_PER_MINUTE;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

const TIME_OF_DAY_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

const DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"];

/// Convert a naive datetime into epoch seconds.
pub fn datetime_to_seconds(dt: NaiveDateTime) -> f64 {
    let utc = dt.and_utc();
    utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) / 1e9
}

/// Convert epoch seconds back into a UTC datetime.
pub fn seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    Utc.timestamp_opt(whole as i64, nanos).single()
}

/// Render epoch seconds as an ISO-8601 UTC string (millisecond precision).
pub fn format_seconds(seconds: f64) -> String {
    seconds_to_datetime(seconds)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| seconds.to_string())
}

/// True for the negative-integer placeholder the diary export writes
/// in place of a time.
pub fn is_negative_artifact(raw: &str) -> bool {
    raw.trim()
        .parse::<i64>()
        .map(|value| value < 0)
        .unwrap_or(false)
}

/// Parse an absolute datetime (naive or RFC 3339) into epoch seconds.
pub fn parse_datetime(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_negative_artifact(trimmed) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(datetime_to_seconds(dt.naive_utc()));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(datetime_to_seconds)
}

/// Parse a time of day (`HH:MM[:SS[.f]]`).
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_negative_artifact(trimmed) {
        return None;
    }
    TIME_OF_DAY_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
}

/// Parse a calendar date, day-first (`DD-MM-YYYY`) as written by the
/// home-study export, falling back to ISO order.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Combine a date cell and a time-of-day cell into epoch seconds.
pub fn parse_date_and_time(date: NaiveDate, time_raw: &str) -> Option<f64> {
    parse_time_of_day(time_raw).map(|time| datetime_to_seconds(date.and_time(time)))
}

/// Parse either plain numeric seconds or an absolute datetime.
///
/// Negative integers are export artifacts and parse to `None`.
pub fn parse_instant(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_negative_artifact(trimmed) {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        Ok(_) => None,
        Err(_) => parse_datetime(trimmed),
    }
}

/// Epoch seconds of January 1st, 00:00 UTC of `year`.
pub fn year_start_seconds(year: i32) -> Option<f64> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(datetime_to_seconds)
}
