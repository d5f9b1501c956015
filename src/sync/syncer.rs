use chrono::{Local, Utc};
use secrecy::SecretString;

use crate::activity::ActivityType;
use crate::aggregate::{self, DayAggregates, MergeOutcome};
use crate::client::StravaClient;
use crate::date_util::epoch_to_date;
use crate::error::Result;
use crate::storage::raw::{self, RawActivityLog};
use crate::storage::DayStore;
use crate::sync::{
    ActivityFetcher, RateLimitPolicy, SyncMode, SyncOptions, SyncProgress, SyncReport, SyncStatus,
    SyncWindow,
};

/// Fetch, aggregate, and persist one activity type.
///
/// Incremental runs merge into the stored aggregates, resuming the day after
/// the newest stored date. Full runs replace the store with whatever the
/// window yields. Nothing is written when the fetch returns no activities.
pub async fn sync_aggregates(
    client: &StravaClient,
    policy: &RateLimitPolicy,
    token: &SecretString,
    store: &dyn DayStore,
    activity_type: ActivityType,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
) -> Result<SyncReport> {
    let target = activity_type.as_str();
    let output = store.location();

    // Without a prior file an incremental request is a full run.
    let existed = store.exists();
    let incremental = options.incremental && existed;
    let mut existing = if incremental {
        store.load()
    } else {
        DayAggregates::new()
    };
    let mode = sync_mode(existed, options.incremental, existing.len());
    log_mode(&output, mode);
    progress.on_start(target, &output, mode);

    let window = SyncWindow::for_aggregates(
        options,
        incremental,
        existing.latest_date(),
        Utc::now().timestamp(),
        &Local,
    );
    log_window(&window);
    progress.on_window(&window);

    let activities = ActivityFetcher::new(client, policy, progress)
        .fetch(token, &window)
        .await?;
    if activities.is_empty() {
        log::info!("No new activities found");
        let report = SyncReport::no_new_activities(
            target,
            incremental,
            existing.len(),
            output.into(),
        );
        progress.on_complete(&report);
        return Ok(report);
    }

    let incoming = aggregate::project(&activities, activity_type);
    let projected = incoming.len();

    let (stored, outcome) = if incremental {
        let outcome = existing.merge(incoming);
        if !outcome.conflicts.is_empty() {
            log::warn!(
                "{} date(s) overlapped existing {target} data and were skipped: {:?}",
                outcome.conflicts.len(),
                outcome.conflicts
            );
        }
        (existing, outcome)
    } else {
        (
            incoming,
            MergeOutcome {
                inserted: projected,
                conflicts: Vec::new(),
            },
        )
    };

    store.save(&stored)?;
    log::info!("Updated {target} data with {} new entries", outcome.inserted);

    let report = SyncReport {
        target: target.to_string(),
        status: SyncStatus::Success,
        incremental,
        activities_fetched: activities.len(),
        new_entries: outcome.inserted,
        conflicts: outcome.conflicts,
        total_entries: stored.len(),
        output: output.into(),
    };
    progress.on_complete(&report);
    Ok(report)
}

/// Fetch every activity in the window and keep the full documents.
///
/// Incremental runs resume from the newest `start_date` already in the log
/// and skip activities whose id is already present.
pub async fn sync_raw(
    client: &StravaClient,
    policy: &RateLimitPolicy,
    token: &SecretString,
    log_file: &RawActivityLog,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
) -> Result<SyncReport> {
    let target = "raw";
    let output = log_file.path().display().to_string();

    let existed = log_file.exists();
    let mut existing = if options.incremental {
        log_file.load()
    } else {
        Vec::new()
    };
    let mode = sync_mode(existed, options.incremental, existing.len());
    log_mode(&output, mode);
    progress.on_start(target, &output, mode);

    let window = SyncWindow::for_raw(
        options,
        options.incremental,
        raw::latest_start_epoch(&existing),
        &Local,
    );
    log_window(&window);
    progress.on_window(&window);

    let activities = ActivityFetcher::new(client, policy, progress)
        .fetch(token, &window)
        .await?;
    if activities.is_empty() {
        log::info!("No new activities found");
        let report = SyncReport::no_new_activities(
            target,
            options.incremental,
            existing.len(),
            log_file.path().to_path_buf(),
        );
        progress.on_complete(&report);
        return Ok(report);
    }

    let fetched = activities.len();
    let added = raw::append_unique(&mut existing, activities);
    log_file.save(&existing)?;
    log::info!("Saved all raw activities ({} total) to {output}", existing.len());

    let report = SyncReport {
        target: target.to_string(),
        status: SyncStatus::Success,
        incremental: options.incremental,
        activities_fetched: fetched,
        new_entries: added,
        conflicts: Vec::new(),
        total_entries: existing.len(),
        output: log_file.path().to_path_buf(),
    };
    progress.on_complete(&report);
    Ok(report)
}

fn sync_mode(existed: bool, incremental: bool, existing_entries: usize) -> SyncMode {
    match (existed, incremental) {
        (false, _) => SyncMode::Fresh,
        (true, false) => SyncMode::Overwrite,
        (true, true) => SyncMode::Incremental { existing_entries },
    }
}

fn log_mode(output: &str, mode: SyncMode) {
    match mode {
        SyncMode::Fresh => log::info!("No existing data found. Creating new file: {output}"),
        SyncMode::Overwrite => {
            log::info!("Not using incremental mode. Overwriting existing file: {output}")
        }
        SyncMode::Incremental { existing_entries } => log::info!(
            "Loaded {existing_entries} existing entries from {output}, appending new data"
        ),
    }
}

fn log_window(window: &SyncWindow) {
    if let Some(after) = window.after {
        log::info!("Fetching activities after {}", epoch_to_date(after, &Local));
    }
    if let Some(before) = window.before {
        log::info!("Fetching activities before {}", epoch_to_date(before, &Local));
    }
}
