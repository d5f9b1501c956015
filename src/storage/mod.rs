pub mod lock;
pub mod raw;

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::error::Category;
use serde::Serialize;

use crate::activity::ActivityType;
use crate::aggregate::DayAggregates;
use crate::error::Result;

pub use lock::RunLock;
pub use raw::RawActivityLog;

/// Default directory for aggregate files and the raw dump.
pub const DEFAULT_DATA_DIR: &str = "src_data";

/// Raw dump file name inside the data directory.
pub const RAW_DUMP_FILE: &str = "all_activities.json";

/// Persistence for one activity type's day aggregates.
///
/// The orchestrator only talks to this trait, so the JSON document can be
/// swapped for a database without touching the sync logic.
pub trait DayStore {
    /// True if a previous run left data behind.
    fn exists(&self) -> bool;

    /// Load persisted aggregates. Missing or unreadable state loads as empty.
    fn load(&self) -> DayAggregates;

    fn save(&self, aggregates: &DayAggregates) -> Result<()>;

    /// Human-readable location, for progress output.
    fn location(&self) -> String;
}

/// Aggregates stored as a pretty-printed JSON object, newest date first.
#[derive(Debug, Clone)]
pub struct JsonDayStore {
    path: PathBuf,
}

impl JsonDayStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/<type>_activities.json`
    pub fn for_type(data_dir: impl AsRef<Path>, activity_type: ActivityType) -> Self {
        Self::new(data_dir.as_ref().join(activity_type.file_name()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DayStore for JsonDayStore {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> DayAggregates {
        read_json_or_default(&self.path)
    }

    fn save(&self, aggregates: &DayAggregates) -> Result<()> {
        write_json(&self.path, aggregates)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Read a JSON document, falling back to `T::default()` when the file is
/// missing or does not parse.
///
/// Well-formed JSON that does not fit `T` also loads as empty, but the file
/// is first copied to `<path>.bak` so the next save cannot destroy it.
pub(crate) fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Could not read {}: {e}; starting empty", path.display());
            }
            return T::default();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(e) if e.classify() == Category::Data => {
            let backup = backup_path(path);
            match fs::copy(path, &backup) {
                Ok(_) => log::error!(
                    "Unexpected content in {}: {e}; starting empty, original kept at {}",
                    path.display(),
                    backup.display()
                ),
                Err(copy_err) => log::error!(
                    "Unexpected content in {}: {e}; starting empty, backup to {} failed: {copy_err}",
                    path.display(),
                    backup.display()
                ),
            }
            T::default()
        }
        Err(e) => {
            log::warn!("Malformed JSON in {}: {e}; starting empty", path.display());
            T::default()
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    PathBuf::from(backup)
}

/// Serialize `value` with four-space indentation and replace `path` with it.
///
/// The document is written to a sibling temp file first and renamed into
/// place, so readers never see a half-written file.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, &buf)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
