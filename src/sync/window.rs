use chrono::{Duration, NaiveDate, TimeZone};

use crate::date_util::midnight_epoch;
use crate::sync::SyncOptions;

/// How far back an incremental run reaches when there is no stored data.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;

const SECONDS_PER_DAY: i64 = 86_400;

/// Epoch-second bounds sent with every page request of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncWindow {
    pub after: Option<i64>,
    pub before: Option<i64>,
}

impl SyncWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Window for an aggregate store.
    ///
    /// `incremental` is the mode actually chosen, i.e. a store file exists.
    /// `latest` is its newest date; an existing but empty store falls back to
    /// the lookback. Dates are interpreted as local midnight in `tz`.
    pub fn for_aggregates<Tz: TimeZone>(
        options: &SyncOptions,
        incremental: bool,
        latest: Option<NaiveDate>,
        now: i64,
        tz: &Tz,
    ) -> Self {
        let after = match (incremental, latest) {
            // The latest stored day is complete; resume at the next one.
            (true, Some(latest)) => Some(midnight_epoch(latest + Duration::days(1), tz)),
            (true, None) => Some(
                options
                    .start_date
                    .map(|d| midnight_epoch(d, tz))
                    .unwrap_or(now - DEFAULT_LOOKBACK_DAYS * SECONDS_PER_DAY),
            ),
            (false, _) => options.start_date.map(|d| midnight_epoch(d, tz)),
        };
        Self {
            after,
            before: options.end_date.map(|d| midnight_epoch(d, tz)),
        }
    }

    /// Window for the raw dump, keyed by the newest UTC `start_date` already
    /// on disk rather than by local calendar day.
    pub fn for_raw<Tz: TimeZone>(
        options: &SyncOptions,
        incremental: bool,
        latest_start: Option<i64>,
        tz: &Tz,
    ) -> Self {
        let after = match (incremental, latest_start) {
            (true, Some(epoch)) => Some(epoch),
            _ => options.start_date.map(|d| midnight_epoch(d, tz)),
        };
        Self {
            after,
            before: options.end_date.map(|d| midnight_epoch(d, tz)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn opts(start: Option<NaiveDate>, end: Option<NaiveDate>, incremental: bool) -> SyncOptions {
        SyncOptions {
            start_date: start,
            end_date: end,
            incremental,
        }
    }

    const NOW: i64 = 1_717_200_000;

    #[test]
    fn test_incremental_resumes_day_after_latest() {
        let w = SyncWindow::for_aggregates(&opts(None, None, true), true, Some(d(2024, 5, 1)), NOW, &Utc);
        assert_eq!(w.after, Some(midnight_epoch(d(2024, 5, 2), &Utc)));
        assert_eq!(w.after, Some(1_714_608_000));
        assert_eq!(w.before, None);
    }

    #[test]
    fn test_incremental_uses_local_midnight() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let w = SyncWindow::for_aggregates(&opts(None, None, true), true, Some(d(2024, 5, 1)), NOW, &tz);
        assert_eq!(w.after, Some(1_714_608_000 - 2 * 3600));
    }

    #[test]
    fn test_incremental_ignores_start_date_when_store_has_data() {
        let o = opts(Some(d(2020, 1, 1)), Some(d(2024, 6, 1)), true);
        let w = SyncWindow::for_aggregates(&o, true, Some(d(2024, 5, 1)), NOW, &Utc);
        assert_eq!(w.after, Some(1_714_608_000));
        assert_eq!(w.before, Some(midnight_epoch(d(2024, 6, 1), &Utc)));
    }

    #[test]
    fn test_incremental_empty_store_defaults_to_lookback() {
        let w = SyncWindow::for_aggregates(&opts(None, None, true), true, None, NOW, &Utc);
        assert_eq!(w.after, Some(NOW - 365 * 86_400));
    }

    #[test]
    fn test_incremental_empty_store_honors_start_date() {
        let o = opts(Some(d(2023, 1, 1)), None, true);
        let w = SyncWindow::for_aggregates(&o, true, None, NOW, &Utc);
        assert_eq!(w.after, Some(midnight_epoch(d(2023, 1, 1), &Utc)));
    }

    #[test]
    fn test_full_run_uses_flags_only() {
        let w = SyncWindow::for_aggregates(&opts(None, None, false), false, Some(d(2024, 5, 1)), NOW, &Utc);
        assert_eq!(w, SyncWindow::unbounded());

        let o = opts(Some(d(2024, 1, 1)), Some(d(2024, 2, 1)), false);
        let w = SyncWindow::for_aggregates(&o, false, None, NOW, &Utc);
        assert_eq!(w.after, Some(midnight_epoch(d(2024, 1, 1), &Utc)));
        assert_eq!(w.before, Some(midnight_epoch(d(2024, 2, 1), &Utc)));
    }

    #[test]
    fn test_raw_window() {
        let w = SyncWindow::for_raw(&opts(None, None, true), true, Some(1_714_608_123), &Utc);
        assert_eq!(w.after, Some(1_714_608_123));

        let w = SyncWindow::for_raw(&opts(None, None, true), true, None, &Utc);
        assert_eq!(w.after, None);

        let o = opts(Some(d(2024, 5, 2)), None, false);
        let w = SyncWindow::for_raw(&o, false, Some(1), &Utc);
        assert_eq!(w.after, Some(1_714_608_000));
    }
}
