use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use secrecy::SecretString;

use stravadw::auth::{EnvFileCredentialStore, RefreshTokenProvider, StaticTokenProvider};
use stravadw::config::{EnvFile, ACCESS_TOKEN_VAR, DEFAULT_ENV_FILE};
use stravadw::date_util::{epoch_to_date, parse_ymd};
use stravadw::storage::DEFAULT_DATA_DIR;
use stravadw::{
    StravaClient, StravaConfig, StravaDW, SyncMode, SyncOptions, SyncReport, SyncStatus,
    SyncWindow, TokenProvider,
};

#[derive(Parser)]
#[command(name = "stravadw", about = "Fetch Strava activities into per-day JSON aggregates")]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["activity_type", "raw_all"])
))]
struct Cli {
    /// Activity type to aggregate (Run, WeightTraining)
    #[arg(long, value_name = "TYPE")]
    activity_type: Option<String>,

    /// Dump all raw activity data to src_data/all_activities.json
    #[arg(long)]
    raw_all: bool,

    /// Fetch activities after this date (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<String>,

    /// Fetch activities before this date (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<String>,

    /// Only fetch activities since the last update. Without an existing file
    /// this is a full run; an existing but empty file looks back one year.
    #[arg(long)]
    incremental: bool,

    /// Directory for aggregate files. Not used for the raw dump.
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// dotenv file holding Strava credentials
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Give up after this many consecutive rate-limit retries (default: never)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Progress reporter that writes to stderr.
struct StderrProgress;

impl stravadw::SyncProgress for StderrProgress {
    fn on_start(&self, target: &str, output: &str, mode: SyncMode) {
        match mode {
            SyncMode::Fresh => eprintln!("No existing {target} data. Creating {output}"),
            SyncMode::Overwrite => eprintln!("Overwriting existing file {output}"),
            SyncMode::Incremental { existing_entries } => {
                eprintln!("Loaded {existing_entries} existing entries from {output}")
            }
        }
    }

    fn on_window(&self, window: &SyncWindow) {
        if let Some(after) = window.after {
            eprintln!(
                "Fetching activities after {}",
                epoch_to_date(after, &chrono::Local)
            );
        }
    }

    fn on_page(&self, page: u32, count: usize) {
        eprintln!("  Page {page}: {count} activities");
    }

    fn on_rate_limited(&self, page: u32, cooldown: Duration) {
        eprintln!(
            "  Rate limited on page {page}. Waiting {} minutes...",
            cooldown.as_secs() / 60
        );
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e
                .downcast_ref::<stravadw::Error>()
                .map(stravadw::Error::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let options = SyncOptions {
        start_date: cli.start_date.as_deref().map(parse_ymd).transpose()?,
        end_date: cli.end_date.as_deref().map(parse_ymd).transpose()?,
        incremental: cli.incremental,
    };

    // Reject unknown types before touching credentials.
    if let Some(ref t) = cli.activity_type {
        t.parse::<stravadw::ActivityType>()?;
    }

    let env_file = EnvFile::load(&cli.env_file)?;
    let config = StravaConfig::from_env(&env_file)?;
    let client = StravaClient::new(&config)?;
    let tokens = token_provider(config, &env_file, &cli.env_file)?;

    let mut policy = stravadw::RateLimitPolicy::default();
    policy.max_retries = cli.max_retries;

    let dw = StravaDW::new(client, tokens)
        .with_data_dir(&cli.data_dir)
        .with_rate_limit_policy(policy);

    let progress = StderrProgress;
    let report = match cli.activity_type {
        Some(ref t) => dw.sync_activity_type(t, &options, &progress).await?,
        None => dw.sync_raw(&options, &progress).await?,
    };
    print_sync_report(&report);
    Ok(())
}

fn token_provider(
    config: StravaConfig,
    env_file: &EnvFile,
    env_path: &std::path::Path,
) -> anyhow::Result<Box<dyn TokenProvider>> {
    let static_token = std::env::var(ACCESS_TOKEN_VAR)
        .ok()
        .or_else(|| env_file.get(ACCESS_TOKEN_VAR).map(str::to_string))
        .filter(|t| !t.is_empty());
    if let Some(token) = static_token {
        log::info!("Using {ACCESS_TOKEN_VAR} without refreshing");
        return Ok(Box::new(StaticTokenProvider::new(Some(SecretString::from(
            token,
        )))));
    }
    let store = EnvFileCredentialStore::new(env_path);
    Ok(Box::new(RefreshTokenProvider::new(config, Box::new(store))?))
}

fn print_sync_report(report: &SyncReport) {
    println!("Sync: {}", report.target);
    match report.status {
        SyncStatus::NoNewActivities => println!("  Status:  no new activities"),
        SyncStatus::Success => println!("  Status:  ok"),
    }
    println!("  Fetched: {} activities", report.activities_fetched);
    println!("  New:     {} entries", report.new_entries);
    println!("  Total:   {} entries", report.total_entries);
    if !report.conflicts.is_empty() {
        println!("  Skipped: {} conflicting dates", report.conflicts.len());
    }
    println!("  Output:  {}", report.output.display());
}
