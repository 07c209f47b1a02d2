//! Timestamp parsing for loosely formatted inputs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Epoch numbers at or beyond this magnitude are milliseconds, smaller ones
/// are seconds. 1e11 seconds is the year 5138; 1e11 milliseconds is 1973.
pub const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Epoch seconds or milliseconds, told apart by magnitude.
pub fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD.unsigned_abs() {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

/// Fractional epoch value, rounded to the millisecond.
pub fn from_epoch_f64(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() >= EPOCH_MILLIS_THRESHOLD as f64 {
        value
    } else {
        value * 1_000.0
    };
    // `as` saturates, and out-of-range millis come back as None
    DateTime::from_timestamp_millis(millis.round() as i64)
}

/// Parse a timestamp as UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (optionally with `T` and
/// fractional seconds, read as UTC), a bare `YYYY-MM-DD` (midnight UTC) or
/// an epoch number: seconds below `EPOCH_MILLIS_THRESHOLD`, milliseconds at
/// or above it, fractions allowed.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
    if let Ok(epoch) = value.parse::<i64>() {
        return from_epoch(epoch);
    }
    value.parse::<f64>().ok().and_then(from_epoch_f64)
}
