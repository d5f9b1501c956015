use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One activity as returned by `GET /athlete/activities`.
///
/// Only the fields the aggregator reads are typed; everything else is kept
/// in `extra` so a raw dump writes back the full document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: u64,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub start_date_local: String,
    /// Meters.
    #[serde(default)]
    pub distance: f64,
    /// Seconds.
    #[serde(default)]
    pub elapsed_time: i64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Activity types that have a per-day aggregate store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityType {
    Run,
    WeightTraining,
}

impl ActivityType {
    pub const ALL: [ActivityType; 2] = [ActivityType::Run, ActivityType::WeightTraining];

    /// The `type` string Strava uses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Run => "Run",
            ActivityType::WeightTraining => "WeightTraining",
        }
    }

    /// Store file name, e.g. `run_activities.json`.
    pub fn file_name(&self) -> String {
        format!("{}_activities.json", self.as_str().to_lowercase())
    }

    pub fn matches(&self, record: &ActivityRecord) -> bool {
        record.activity_type == self.as_str()
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnsupportedActivityType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_types() {
        assert_eq!("Run".parse::<ActivityType>().unwrap(), ActivityType::Run);
        assert_eq!(
            "WeightTraining".parse::<ActivityType>().unwrap(),
            ActivityType::WeightTraining
        );
    }

    #[test]
    fn test_parse_is_exact_match() {
        assert!(matches!(
            "Swim".parse::<ActivityType>(),
            Err(Error::UnsupportedActivityType(t)) if t == "Swim"
        ));
        assert!("run".parse::<ActivityType>().is_err());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(ActivityType::Run.file_name(), "run_activities.json");
        assert_eq!(
            ActivityType::WeightTraining.file_name(),
            "weighttraining_activities.json"
        );
    }

    #[test]
    fn test_record_keeps_unknown_fields() {
        let json = r#"{
            "id": 42,
            "type": "Run",
            "name": "Morning Run",
            "start_date": "2024-05-01T12:00:00Z",
            "start_date_local": "2024-05-01T05:00:00Z",
            "distance": 5000.0,
            "elapsed_time": 1500,
            "map": {"summary_polyline": "abc"}
        }"#;
        let record: ActivityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 42);
        assert_eq!(record.activity_type, "Run");
        assert_eq!(record.elapsed_time, 1500);
        assert_eq!(record.extra["name"], "Morning Run");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["map"]["summary_polyline"], "abc");
        assert_eq!(back["type"], "Run");
    }

    #[test]
    fn test_record_missing_metrics_default_to_zero() {
        let json = r#"{"id": 1, "type": "WeightTraining", "start_date_local": "2024-05-01T05:00:00Z"}"#;
        let record: ActivityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.distance, 0.0);
        assert_eq!(record.elapsed_time, 0);
    }
}
