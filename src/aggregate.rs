//! Per-day metric aggregation.
//!
//! [`project`] reduces raw activities of one type into a [`DayAggregates`]
//! mapping; [`DayAggregates::merge`] folds a freshly projected mapping into
//! previously persisted state.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::activity::{ActivityRecord, ActivityType};
use crate::date_util::date_key;

/// Strava reports distance in meters.
pub const MILES_PER_METER: f64 = 0.000621371;

/// Metrics accumulated for one calendar day. A store holds exactly one
/// activity type, so only one of the fields is ever set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<i64>,
}

impl DayMetrics {
    /// The contribution of a single activity for the given store type.
    pub fn contribution(record: &ActivityRecord, activity_type: ActivityType) -> Self {
        match activity_type {
            ActivityType::Run => DayMetrics {
                distance_miles: Some(record.distance * MILES_PER_METER),
                elapsed_time: None,
            },
            ActivityType::WeightTraining => DayMetrics {
                distance_miles: None,
                elapsed_time: Some(record.elapsed_time),
            },
        }
    }

    /// Sum `other` into `self` metric by metric.
    pub fn accumulate(&mut self, other: &DayMetrics) {
        self.distance_miles = sum(self.distance_miles, other.distance_miles);
        self.elapsed_time = sum(self.elapsed_time, other.elapsed_time);
    }
}

fn sum<T: std::ops::Add<Output = T>>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Date-keyed aggregates for one activity type.
///
/// Dates are unique by construction. Serialization always emits the newest
/// date first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct DayAggregates {
    days: BTreeMap<NaiveDate, DayMetrics>,
}

/// Result of merging incoming aggregates into existing ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub inserted: usize,
    /// Dates present on both sides; the existing value was kept.
    pub conflicts: Vec<NaiveDate>,
}

impl DayAggregates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&DayMetrics> {
        self.days.get(date)
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.days.keys().next_back().copied()
    }

    /// Add a contribution to `date`, summing with whatever is already there.
    pub fn add(&mut self, date: NaiveDate, metrics: DayMetrics) {
        self.days
            .entry(date)
            .and_modify(|existing| existing.accumulate(&metrics))
            .or_insert(metrics);
    }

    /// Insert every date of `incoming` that is not already present.
    ///
    /// A date present on both sides means the fetch window overlapped stored
    /// data. The existing value wins and the date is reported as a conflict.
    pub fn merge(&mut self, incoming: DayAggregates) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for (date, metrics) in incoming.days {
            if self.days.contains_key(&date) {
                log::warn!(
                    "Merge conflict: {date} already present in store, keeping existing value"
                );
                outcome.conflicts.push(date);
            } else {
                self.days.insert(date, metrics);
                outcome.inserted += 1;
            }
        }
        outcome
    }
}

impl Serialize for DayAggregates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.days.iter().rev())
    }
}

impl FromIterator<(NaiveDate, DayMetrics)> for DayAggregates {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, DayMetrics)>>(iter: I) -> Self {
        let mut aggregates = DayAggregates::new();
        for (date, metrics) in iter {
            aggregates.add(date, metrics);
        }
        aggregates
    }
}

/// Reduce `records` to per-day metrics for `activity_type`.
///
/// Records of other types are ignored. Several activities on the same local
/// date are summed.
pub fn project(records: &[ActivityRecord], activity_type: ActivityType) -> DayAggregates {
    let mut aggregates = DayAggregates::new();
    for record in records.iter().filter(|r| activity_type.matches(r)) {
        let Some(date) = date_key(&record.start_date_local) else {
            log::warn!(
                "Skipping activity {} with unparseable start_date_local {:?}",
                record.id,
                record.start_date_local
            );
            continue;
        };
        aggregates.add(date, DayMetrics::contribution(record, activity_type));
    }
    aggregates
}
