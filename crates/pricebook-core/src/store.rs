//! Snapshot persistence for a [`PriceBook`].
//!
//! The book is stored as a single JSON snapshot under `.pricebook/`:
//!
//! ```text
//! .pricebook/
//!   snapshot.json     # serialized PriceBook with format version
//!   snapshot.b3       # blake3 checksum of snapshot.json
//!   config.toml       # project config
//!   lock              # advisory lock
//! ```
//!
//! Writes go to a temp file that is renamed over the snapshot while the
//! exclusive lock is held. The checksum sidecar is verified on load.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::book::PriceBook;
use crate::error::ErrorCode;
use crate::lock::{LockError, SnapshotLock};

pub const PRICEBOOK_DIR: &str = ".pricebook";
pub const SNAPSHOT_FILE: &str = "snapshot.json";
pub const CHECKSUM_FILE: &str = "snapshot.b3";
pub const LOCK_FILE: &str = "lock";
pub const SNAPSHOT_VERSION: u32 = 1;

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Versioned envelope around the stored book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub book: PriceBook,
}

impl Snapshot {
    #[must_use]
    pub const fn new(book: PriceBook) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            book,
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new(PriceBook::default())
    }
}

/// Errors from loading or saving snapshots.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no .pricebook/ directory under {}", .0.display())]
    NotInitialized(PathBuf),

    #[error("snapshot I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot checksum mismatch: expected {expected}, found {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("snapshot version {0} is newer than supported version {}", SNAPSHOT_VERSION)]
    UnsupportedVersion(u32),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized(_) => ErrorCode::NotInitialized,
            Self::Io(_) | Self::Json(_) | Self::UnsupportedVersion(_) => {
                ErrorCode::SnapshotWriteFailed
            }
            Self::Lock(err) => err.code(),
            Self::ChecksumMismatch { .. } => ErrorCode::SnapshotChecksumMismatch,
        }
    }
}

/// Where a [`PriceBook`] is loaded from and saved to.
pub trait SnapshotStore {
    /// Load the stored snapshot; an absent snapshot loads as an empty book.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the snapshot cannot be read or verified.
    fn load(&self) -> Result<Snapshot, StoreError>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the snapshot cannot be written.
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// In-process store; clones share the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Option<Snapshot>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(snapshot.clone());
        Ok(())
    }
}

/// Snapshot store rooted at a project's `.pricebook/` directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store for the project at `project_root`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotInitialized`] when `.pricebook/` is missing.
    pub fn open(project_root: &Path) -> Result<Self, StoreError> {
        let dir = project_root.join(PRICEBOOK_DIR);
        if !dir.is_dir() {
            return Err(StoreError::NotInitialized(project_root.to_path_buf()));
        }
        Ok(Self { dir })
    }

    /// Create `.pricebook/` with an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory or files cannot be
    /// written.
    pub fn init(project_root: &Path) -> Result<Self, StoreError> {
        let dir = project_root.join(PRICEBOOK_DIR);
        fs::create_dir_all(&dir)?;
        let store = Self { dir };
        store.save(&Snapshot::default())?;
        info!(path = %store.dir.display(), "pricebook initialized");
        Ok(store)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    #[must_use]
    pub fn checksum_path(&self) -> PathBuf {
        self.dir.join(CHECKSUM_FILE)
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }
}

fn checksum(bytes: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(bytes).to_hex())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_data()?;
    }
    fs::rename(&tmp, path)
}

impl SnapshotStore for FileStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        let _lock = SnapshotLock::shared(&self.lock_path(), LOCK_TIMEOUT)?;
        let path = self.snapshot_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no snapshot, starting empty");
                return Ok(Snapshot::default());
            }
            Err(err) => return Err(err.into()),
        };

        match fs::read_to_string(self.checksum_path()) {
            Ok(expected) => {
                let expected = expected.trim().to_string();
                let actual = checksum(&bytes);
                if expected != actual {
                    return Err(StoreError::ChecksumMismatch { expected, actual });
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("snapshot has no checksum sidecar");
            }
            Err(err) => return Err(err.into()),
        }

        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(StoreError::UnsupportedVersion(snapshot.version));
        }
        debug!(
            items = snapshot.book.items.len(),
            headers = snapshot.book.headers.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let _lock = SnapshotLock::exclusive(&self.lock_path(), LOCK_TIMEOUT)?;
        let mut bytes = serde_json::to_vec_pretty(snapshot)?;
        bytes.push(b'\n');
        write_atomic(&self.snapshot_path(), &bytes)?;
        write_atomic(&self.checksum_path(), format!("{}\n", checksum(&bytes)).as_bytes())?;
        debug!(bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}
