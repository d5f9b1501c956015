use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::activity::ActivityRecord;
use crate::date_util::parse_utc_epoch;
use crate::error::Result;

/// Full activity documents, newest `start_date` first.
#[derive(Debug, Clone)]
pub struct RawActivityLog {
    path: PathBuf,
}

impl RawActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Missing or malformed files load as an empty log.
    pub fn load(&self) -> Vec<ActivityRecord> {
        super::read_json_or_default(&self.path)
    }

    pub fn save(&self, records: &[ActivityRecord]) -> Result<()> {
        let mut sorted = records.to_vec();
        sort_newest_first(&mut sorted);
        super::write_json(&self.path, &sorted)
    }
}

/// Epoch seconds of the most recent `start_date` in `records`.
pub fn latest_start_epoch(records: &[ActivityRecord]) -> Option<i64> {
    records
        .iter()
        .filter_map(|r| parse_utc_epoch(&r.start_date))
        .max()
}

/// Append `incoming` to `existing`, skipping ids already present.
/// Returns the number of records added.
pub fn append_unique(existing: &mut Vec<ActivityRecord>, incoming: Vec<ActivityRecord>) -> usize {
    let mut seen: HashSet<u64> = existing.iter().map(|r| r.id).collect();
    let before = existing.len();
    for record in incoming {
        if seen.insert(record.id) {
            existing.push(record);
        } else {
            log::debug!("Activity {} already in raw log, skipping", record.id);
        }
    }
    existing.len() - before
}

/// `start_date` strings share one fixed UTC format, so string order is
/// chronological order.
pub fn sort_newest_first(records: &mut [ActivityRecord]) {
    records.sort_by(|a, b| b.start_date.cmp(&a.start_date));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, start: &str) -> ActivityRecord {
        ActivityRecord {
            id,
            activity_type: "Run".into(),
            start_date: start.into(),
            start_date_local: start.into(),
            distance: 1000.0,
            elapsed_time: 300,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_latest_start_epoch() {
        let records = vec![
            record(1, "2024-05-01T12:00:00Z"),
            record(2, "2024-05-03T08:00:00Z"),
            record(3, "2024-04-30T08:00:00Z"),
        ];
        assert_eq!(
            latest_start_epoch(&records),
            parse_utc_epoch("2024-05-03T08:00:00Z")
        );
        assert_eq!(latest_start_epoch(&[]), None);
    }

    #[test]
    fn test_append_unique_skips_known_ids() {
        let mut existing = vec![record(1, "2024-05-01T12:00:00Z")];
        let added = append_unique(
            &mut existing,
            vec![
                record(1, "2024-05-01T12:00:00Z"),
                record(2, "2024-05-02T12:00:00Z"),
                record(2, "2024-05-02T12:00:00Z"),
            ],
        );
        assert_eq!(added, 1);
        assert_eq!(existing.len(), 2);
    }

    #[test]
    fn test_save_sorts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = RawActivityLog::new(dir.path().join("all_activities.json"));
        log.save(&[
            record(1, "2024-04-01T12:00:00Z"),
            record(2, "2024-06-01T12:00:00Z"),
            record(3, "2024-05-01T12:00:00Z"),
        ])
        .unwrap();

        let ids: Vec<u64> = log.load().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_load_malformed_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = RawActivityLog::new(dir.path().join("all_activities.json"));
        std::fs::write(log.path(), "[{]").unwrap();
        assert!(log.load().is_empty());
    }
}
