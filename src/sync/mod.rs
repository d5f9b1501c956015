pub mod fetcher;
pub mod rate_limit;
pub mod syncer;
pub mod window;

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

pub use fetcher::ActivityFetcher;
pub use rate_limit::RateLimitPolicy;
pub use window::SyncWindow;

/// Options controlling a sync operation.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Merge into existing data instead of overwriting it.
    pub incremental: bool,
}

/// Report returned after a sync operation completes.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Activity type name, or `raw` for the raw dump.
    pub target: String,
    pub status: SyncStatus,
    pub incremental: bool,
    pub activities_fetched: usize,
    /// Date entries (or raw records) added by this run.
    pub new_entries: usize,
    /// Dates that were already stored and skipped during the merge.
    pub conflicts: Vec<NaiveDate>,
    pub total_entries: usize,
    pub output: PathBuf,
}

impl SyncReport {
    fn no_new_activities(target: &str, incremental: bool, total: usize, output: PathBuf) -> Self {
        Self {
            target: target.to_string(),
            status: SyncStatus::NoNewActivities,
            incremental,
            activities_fetched: 0,
            new_entries: 0,
            conflicts: Vec::new(),
            total_entries: total,
            output,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SyncStatus {
    Success,
    NoNewActivities,
}

/// Observer for user-facing progress. All methods default to no-ops.
pub trait SyncProgress: Send + Sync {
    fn on_start(&self, _target: &str, _output: &str, _mode: SyncMode) {}
    fn on_window(&self, _window: &SyncWindow) {}
    fn on_page(&self, _page: u32, _count: usize) {}
    fn on_rate_limited(&self, _page: u32, _cooldown: Duration) {}
    fn on_complete(&self, _report: &SyncReport) {}
}

/// How a run treats data already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// No prior file; a new one will be written.
    Fresh,
    /// A prior file exists and will be replaced.
    Overwrite,
    /// A prior file exists and new data is merged into it.
    Incremental { existing_entries: usize },
}

pub struct NoopProgress;

impl SyncProgress for NoopProgress {}
