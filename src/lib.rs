pub mod activity;
pub mod aggregate;
pub mod auth;
pub mod client;
pub mod config;
pub mod date_util;
pub mod error;
pub mod storage;
pub mod sync;

pub use activity::{ActivityRecord, ActivityType};
pub use aggregate::{DayAggregates, DayMetrics, MergeOutcome};
pub use auth::{CredentialStore, TokenProvider};
pub use client::StravaClient;
pub use config::StravaConfig;
pub use error::{Error, Result};
pub use storage::{DayStore, JsonDayStore, RawActivityLog, RunLock};
pub use sync::{
    NoopProgress, RateLimitPolicy, SyncMode, SyncOptions, SyncProgress, SyncReport, SyncStatus,
    SyncWindow,
};

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use storage::{DEFAULT_DATA_DIR, RAW_DUMP_FILE};
use sync::syncer;

/// Main entry point: one configured Strava client plus where data lives.
pub struct StravaDW {
    client: StravaClient,
    tokens: Box<dyn TokenProvider>,
    policy: RateLimitPolicy,
    data_dir: PathBuf,
    raw_path: PathBuf,
}

impl StravaDW {
    pub fn new(client: StravaClient, tokens: Box<dyn TokenProvider>) -> Self {
        Self {
            client,
            tokens,
            policy: RateLimitPolicy::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            raw_path: Path::new(DEFAULT_DATA_DIR).join(RAW_DUMP_FILE),
        }
    }

    /// Directory for the per-type aggregate files.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Location of the raw dump. Unaffected by [`with_data_dir`](Self::with_data_dir).
    pub fn with_raw_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw_path = path.into();
        self
    }

    pub fn with_rate_limit_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sync the aggregate store for `activity_type` (`Run`, `WeightTraining`).
    ///
    /// The type is validated before any credential or network request.
    pub async fn sync_activity_type(
        &self,
        activity_type: &str,
        options: &SyncOptions,
        progress: &dyn SyncProgress,
    ) -> Result<SyncReport> {
        let activity_type: ActivityType = activity_type.parse()?;
        let _lock = RunLock::acquire(&self.data_dir)?;
        let token = self.access_token().await?;
        let store = JsonDayStore::for_type(&self.data_dir, activity_type);
        syncer::sync_aggregates(
            &self.client,
            &self.policy,
            &token,
            &store,
            activity_type,
            options,
            progress,
        )
        .await
    }

    /// Dump every activity verbatim into the raw log.
    pub async fn sync_raw(
        &self,
        options: &SyncOptions,
        progress: &dyn SyncProgress,
    ) -> Result<SyncReport> {
        let lock_dir = match self.raw_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let _lock = RunLock::acquire(&lock_dir)?;
        let token = self.access_token().await?;
        let log_file = RawActivityLog::new(&self.raw_path);
        syncer::sync_raw(
            &self.client,
            &self.policy,
            &token,
            &log_file,
            options,
            progress,
        )
        .await
    }

    async fn access_token(&self) -> Result<SecretString> {
        self.tokens.access_token().await?.ok_or(Error::NoCredential)
    }
}
