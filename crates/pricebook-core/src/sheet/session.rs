//! Deletion, leaving edit mode, and saving back to the book.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::{EditError, Mode, PendingSummary, PriceSheet};
use crate::book::PriceBook;
use crate::guard::check_deletable;
use crate::model::RowId;

/// What happens when the user asks to leave edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ExitDecision {
    /// Nothing pending; the sheet is back in view mode.
    Clean,
    /// Unsaved work exists; call [`PriceSheet::confirm_exit`] to discard it.
    NeedsConfirmation(PendingSummary),
}

/// Rows removed by [`PriceSheet::delete_rows`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Unsaved rows dropped outright.
    pub discarded: Vec<RowId>,
    /// Saved rows whose deletion is applied on the next save.
    pub staged: Vec<RowId>,
}

/// Result of writing a sheet's changes into a [`PriceBook`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// `(temporary, assigned)` id pairs for created rows.
    pub created: Vec<(RowId, RowId)>,
    pub updated: Vec<RowId>,
    pub deleted: Vec<RowId>,
}

impl SaveReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

impl PriceSheet {
    /// Delete rows after checking the whole request against the guard.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::Blocked`] when any selected row is already in
    /// effect on `today`, judged by the earlier of its current and saved
    /// effective dates; nothing is deleted in that case.
    pub fn delete_rows(&mut self, ids: &[RowId], today: NaiveDate) -> Result<DeleteReport, EditError> {
        self.ensure_editing()?;
        let index = self.row_index();
        let mut wanted = Vec::new();
        let mut seen = HashSet::new();
        for id in ids {
            if seen.insert(id) {
                let idx = index
                    .get(id)
                    .ok_or_else(|| EditError::RowNotFound(id.clone()))?;
                wanted.push(*idx);
            }
        }
        let requested = wanted.iter().map(|&idx| {
            let row = &self.rows[idx];
            (row, self.baseline(&row.id))
        });
        check_deletable(requested, &self.headers, today)?;

        let doomed: HashSet<&RowId> = seen;
        let mut report = DeleteReport::default();
        let mut kept = Vec::with_capacity(self.rows.len());
        for row in std::mem::take(&mut self.rows) {
            if !doomed.contains(&row.id) {
                kept.push(row);
                continue;
            }
            self.tracker.forget(&row.id);
            self.drafts.remove(&row.id);
            if row.id.is_temporary() {
                report.discarded.push(row.id);
            } else {
                report.staged.push(row.id.clone());
                self.deleted.push(row);
            }
        }
        self.rows = kept;
        info!(
            discarded = report.discarded.len(),
            staged = report.staged.len(),
            "rows deleted"
        );
        Ok(report)
    }

    /// Ask to leave edit mode; exits at once when nothing is pending.
    pub fn request_exit(&mut self) -> ExitDecision {
        if !self.is_editing() {
            return ExitDecision::Clean;
        }
        let pending = self.pending();
        if pending.is_empty() {
            self.mode = Mode::Viewing;
            ExitDecision::Clean
        } else {
            ExitDecision::NeedsConfirmation(pending)
        }
    }

    /// Discard all pending work, restore the baseline, and leave edit mode.
    pub fn confirm_exit(&mut self) {
        let pending = self.pending();
        if !pending.is_empty() {
            warn!(
                new = pending.new,
                modified = pending.modified,
                deleted = pending.deleted,
                drafts = pending.drafts,
                "discarding unsaved changes"
            );
        }
        self.rows.clone_from(&self.baseline_rows);
        self.tracker.clear();
        self.drafts.clear();
        self.deleted.clear();
        self.mode = Mode::Viewing;
    }

    /// Write pending changes into `book` and start a fresh baseline.
    ///
    /// Created rows receive store-assigned ids in place of their temporary
    /// ones. The sheet stays in edit mode.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::IncompleteRows`] while drafts remain, leaving
    /// both the sheet and the book untouched.
    pub fn save(&mut self, book: &mut PriceBook) -> Result<SaveReport, EditError> {
        self.ensure_editing()?;
        if !self.drafts.is_empty() {
            return Err(EditError::IncompleteRows {
                ids: self.drafts.iter().cloned().collect(),
            });
        }

        let mut report = SaveReport::default();
        let deleted: BTreeSet<RowId> = self.deleted.drain(..).map(|r| r.id).collect();
        if !deleted.is_empty() {
            book.items.retain(|item| !deleted.contains(&item.id));
            report.deleted = deleted.into_iter().collect();
        }

        // Rows are listed newest first; create oldest first so assigned ids
        // follow entry order.
        for row in self.rows.iter_mut().rev() {
            if self.tracker.is_new(&row.id) {
                let assigned = book.allocate_item_id();
                let temporary = std::mem::replace(&mut row.id, assigned.clone());
                book.items.push(row.clone());
                report.created.push((temporary, assigned));
            } else if self.tracker.is_modified(&row.id) {
                if let Some(stored) = book.items.iter_mut().find(|item| item.id == row.id) {
                    stored.clone_from(row);
                } else {
                    book.items.push(row.clone());
                }
                report.updated.push(row.id.clone());
            }
        }
        report.updated.reverse();

        self.tracker.clear();
        self.reset_baseline();
        info!(
            created = report.created.len(),
            updated = report.updated.len(),
            deleted = report.deleted.len(),
            "sheet saved"
        );
        Ok(report)
    }
}
