use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{Error, Result};

/// Parse a `YYYY-MM-DD` command-line date.
pub fn parse_ymd(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

/// Calendar date of a local wall-clock timestamp such as
/// `2024-05-01T07:12:44Z`. Only the part before `T` is considered.
pub fn date_key(start_date_local: &str) -> Option<NaiveDate> {
    let day = start_date_local.split('T').next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Epoch seconds of midnight at the start of `date` in `tz`.
///
/// On a DST gap at midnight the earliest valid instant after the gap is used.
pub fn midnight_epoch<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> i64 {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    match tz.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.timestamp(),
        None => tz
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.timestamp())
            .unwrap_or_else(|| midnight.and_utc().timestamp()),
    }
}

/// Parse a Strava UTC timestamp (`2024-05-01T12:00:00Z`) into epoch seconds.
pub fn parse_utc_epoch(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

/// Render epoch seconds as a `YYYY-MM-DD` date in `tz`, for progress output.
pub fn epoch_to_date<Tz: TimeZone>(epoch: i64, tz: &Tz) -> String {
    match Utc.timestamp_opt(epoch, 0).single() {
        Some(dt) => dt.with_timezone(tz).date_naive().format("%Y-%m-%d").to_string(),
        None => epoch.to_string(),
    }
}
