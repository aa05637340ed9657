use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

/// Name of the lock file inside the data directory
pub const LOCK_FILE: &str = ".lock";

/// Exclusive advisory lock on a data directory.
///
/// Held by every `ff` command that writes, so two processes never
/// interleave slot writes. Released when dropped.
pub struct DataLock {
    _file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not lock {path}: another ff process is writing")]
    Timeout { path: PathBuf },
}

impl DataLock {
    /// Lock `data_dir`, waiting up to `timeout` for another holder.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = data_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Create {
                path: path.clone(),
                source,
            })?;

        let start = Instant::now();
        let mut contended = false;
        loop {
            match try_lock(&file) {
                Ok(()) => {
                    debug!(path = %path.display(), waited_ms = start.elapsed().as_millis() as u64, "data lock acquired");
                    return Ok(DataLock { _file: file, path });
                }
                Err(_) if start.elapsed() < timeout => {
                    if !contended {
                        debug!(path = %path.display(), "data lock busy, waiting");
                        contended = true;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => return Err(LockError::Timeout { path }),
            }
        }
    }

    /// Acquire with the default 5 second timeout
    pub fn acquire_default(data_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(data_dir, Duration::from_secs(5))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Non-blocking exclusive flock; the lock goes away with the descriptor.
#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}
