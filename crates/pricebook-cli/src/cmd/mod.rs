pub mod bulk;
pub mod completions;
pub mod customer;
pub mod delete;
pub mod exchange;
pub mod grid;
pub mod header;
pub mod init;
pub mod item;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use pricebook_core::PriceBook;
use pricebook_core::PriceSheet;
use pricebook_core::config::{ProjectConfig, load_project_config};
use pricebook_core::model::RowId;
use pricebook_core::sheet::SaveReport;
use pricebook_core::store::{FileStore, Snapshot, SnapshotStore};
use tracing::debug;

use crate::output::OutputMode;

/// Per-invocation settings every handler needs.
#[derive(Debug, Clone)]
pub struct Context {
    pub root: PathBuf,
    pub output: OutputMode,
    /// Day used for effective-date rules.
    pub today: NaiveDate,
}

/// An initialized pricebook: its store and project config.
pub struct Project {
    pub store: FileStore,
    pub config: ProjectConfig,
}

impl Project {
    /// Open the pricebook rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `.pricebook/` is missing or the config is malformed.
    pub fn open(root: &Path) -> Result<Self> {
        let store = FileStore::open(root)?;
        let config = load_project_config(root)?;
        Ok(Self { store, config })
    }

    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or verified.
    pub fn load(&self) -> Result<PriceBook> {
        let snapshot = self.store.load().context("failed to load pricebook snapshot")?;
        Ok(snapshot.book)
    }

    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn persist(&self, book: PriceBook) -> Result<()> {
        self.store
            .save(&Snapshot::new(book))
            .context("failed to write pricebook snapshot")?;
        debug!(path = %self.store.snapshot_path().display(), "snapshot persisted");
        Ok(())
    }
}

/// Open a sheet over `header_id` (or every header) in edit mode.
///
/// # Errors
///
/// Returns an error if the header does not exist.
pub fn editing_sheet(book: &PriceBook, header_id: Option<&str>) -> Result<PriceSheet> {
    let mut sheet = PriceSheet::open(book, header_id)?;
    sheet.begin_edit();
    Ok(sheet)
}

/// Save the sheet into the book and write the snapshot.
///
/// # Errors
///
/// Returns an error if drafts remain or the snapshot cannot be written.
pub fn save_sheet(project: &Project, mut book: PriceBook, sheet: &mut PriceSheet) -> Result<SaveReport> {
    let report = sheet.save(&mut book)?;
    if !report.is_empty() {
        project.persist(book)?;
    }
    Ok(report)
}

/// Parse a `YYYY-MM-DD` command-line date.
///
/// # Errors
///
/// Returns a message when the value is not a calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{raw}' is not a date; use YYYY-MM-DD"))
}

pub fn row_ids(raw: &[String]) -> Vec<RowId> {
    raw.iter().map(|s| RowId::new(s.trim())).collect()
}
