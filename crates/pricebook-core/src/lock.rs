//! Advisory lock on `.pricebook/lock`, taken around every snapshot read
//! and write. Readers share it; a writer holds it alone.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::ErrorCode;

const RETRY_EVERY: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("{} still held after {waited:?}", .path.display())]
    Timeout { path: PathBuf, waited: Duration },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LockError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::Io(_) => ErrorCode::SnapshotWriteFailed,
        }
    }
}

/// Held lock; released on drop.
#[derive(Debug)]
pub struct SnapshotLock {
    file: File,
}

impl SnapshotLock {
    /// Lock for reading. Other readers may hold it at the same time.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] while a writer keeps the lock past
    /// `timeout`.
    pub fn shared(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(path, timeout, <File as FileExt>::try_lock_shared)
    }

    /// Lock for writing, excluding readers and other writers.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] while anyone else holds the lock past
    /// `timeout`.
    pub fn exclusive(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(path, timeout, <File as FileExt>::try_lock_exclusive)
    }

    fn acquire(
        path: &Path,
        timeout: Duration,
        try_lock: fn(&File) -> io::Result<()>,
    ) -> Result<Self, LockError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        let start = Instant::now();
        while try_lock(&file).is_err() {
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout {
                    path: path.to_path_buf(),
                    waited,
                });
            }
            thread::sleep(RETRY_EVERY);
        }
        Ok(Self { file })
    }
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
