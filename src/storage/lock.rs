use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const LOCK_FILE_NAME: &str = ".stravadw.lock";

/// Exclusive lock on a data directory, held for the duration of a run.
///
/// Released when dropped.
pub struct RunLock {
    path: PathBuf,
    #[cfg(unix)]
    _flock: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl RunLock {
    /// Take the lock for `dir`, failing immediately if another process holds it.
    pub fn acquire(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Self::lock(path, file)
    }

    #[cfg(unix)]
    fn lock(path: PathBuf, file: File) -> Result<Self> {
        use nix::fcntl::{Flock, FlockArg};

        #[allow(deprecated)]
        let locked = Flock::lock(file, FlockArg::LockExclusiveNonblock);
        match locked {
            Ok(flock) => {
                log::debug!("Acquired run lock {}", path.display());
                Ok(Self {
                    path,
                    _flock: flock,
                })
            }
            Err((_file, e)) if e == nix::errno::Errno::EWOULDBLOCK => {
                Err(Error::AlreadyRunning(path.display().to_string()))
            }
            Err((_file, e)) => Err(Error::Io(std::io::Error::from(e))),
        }
    }

    #[cfg(not(unix))]
    fn lock(path: PathBuf, file: File) -> Result<Self> {
        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
