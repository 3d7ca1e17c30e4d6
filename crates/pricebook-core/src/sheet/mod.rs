//! Editable price sheet: the working copy of a set of line items.
//!
//! A [`PriceSheet`] is opened from a [`PriceBook`], optionally scoped to a
//! single header. While in [`Mode::Editing`] it accepts cell commits, bulk
//! edits, and deletions, recording every change in a [`ChangeTracker`].
//! Nothing reaches the book until [`PriceSheet::save`].
//!
//! | Operation | Module |
//! |---|---|
//! | cell commit, drafts, direct inserts | [`edit`] |
//! | bulk patch | [`bulk`] |
//! | delete, exit, save | [`session`] |

pub mod bulk;
pub mod edit;
pub mod session;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::book::PriceBook;
use crate::error::ErrorCode;
use crate::filter::{FilterContext, ItemFilter};
use crate::guard::DeletionBlocked;
use crate::model::{CellError, Field, PriceHeader, PriceItem, RowId};
use crate::tracker::ChangeTracker;

pub use bulk::{BulkPatch, BulkReport, ParsePriceChangeError, PriceChange};
pub use edit::CommitOutcome;
pub use session::{DeleteReport, ExitDecision, SaveReport};

/// Whether the sheet accepts changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Viewing,
    Editing,
}

/// Errors from sheet editing operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("sheet is not in edit mode")]
    NotEditing,

    #[error("row '{0}' not found")]
    RowNotFound(RowId),

    #[error("price header '{0}' not found")]
    HeaderNotFound(String),

    #[error("row '{id}' column {field}: {source}")]
    Cell {
        id: RowId,
        field: Field,
        #[source]
        source: CellError,
    },

    #[error("row '{id}': expiration {expiration} must be after effective date {effective}")]
    DateOrder {
        id: RowId,
        effective: NaiveDate,
        expiration: NaiveDate,
    },

    #[error("missing required fields: {}", join_fields(.missing))]
    Required { missing: Vec<Field> },

    #[error("bulk edit needs at least one row and one field")]
    EmptyBulkEdit,

    #[error("row '{id}' column {field}: bulk change gives {value}, which is not a valid price")]
    PriceOutOfRange { id: RowId, field: Field, value: f64 },

    #[error(transparent)]
    Blocked(#[from] DeletionBlocked),

    #[error("{} draft row(s) are incomplete: {}", .ids.len(), join_ids(.ids))]
    IncompleteRows { ids: Vec<RowId> },
}

impl EditError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotEditing => ErrorCode::NotEditing,
            Self::RowNotFound(_) => ErrorCode::RowNotFound,
            Self::HeaderNotFound(_) => ErrorCode::HeaderNotFound,
            Self::Cell { .. } | Self::PriceOutOfRange { .. } => ErrorCode::InvalidCellValue,
            Self::DateOrder { .. } => ErrorCode::DateOrderViolation,
            Self::Required { .. } => ErrorCode::RequiredFieldMissing,
            Self::EmptyBulkEdit => ErrorCode::EmptyBulkEdit,
            Self::Blocked(_) => ErrorCode::DeletionBlocked,
            Self::IncompleteRows { .. } => ErrorCode::IncompleteRows,
        }
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_ids(ids: &[RowId]) -> String {
    ids.iter()
        .map(RowId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Counts of unsaved work, reported before leaving edit mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingSummary {
    pub new: usize,
    pub modified: usize,
    pub deleted: usize,
    pub drafts: usize,
}

impl PendingSummary {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.new == 0 && self.modified == 0 && self.deleted == 0 && self.drafts == 0
    }
}

/// Row-level and field-level changes relative to the baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub created: Vec<RowId>,
    pub updated: Vec<(RowId, BTreeSet<Field>)>,
    pub deleted: Vec<RowId>,
}

/// Working copy of price line items with change tracking.
#[derive(Debug, Clone)]
pub struct PriceSheet {
    rows: Vec<PriceItem>,
    baseline_rows: Vec<PriceItem>,
    baseline_index: HashMap<RowId, usize>,
    headers: BTreeMap<String, PriceHeader>,
    scope: Option<String>,
    tracker: ChangeTracker,
    drafts: BTreeSet<RowId>,
    deleted: Vec<PriceItem>,
    mode: Mode,
    next_temp: u64,
}

impl PriceSheet {
    /// Open the items of `header_id` (or every item) from `book`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::HeaderNotFound`] for an unknown header.
    pub fn open(book: &PriceBook, header_id: Option<&str>) -> Result<Self, EditError> {
        if let Some(id) = header_id
            && book.header(id).is_none()
        {
            return Err(EditError::HeaderNotFound(id.to_string()));
        }
        Ok(Self::from_parts(
            book.items_for(header_id),
            book.header_index(),
            header_id.map(str::to_string),
        ))
    }

    /// Build a sheet directly from rows and headers.
    #[must_use]
    pub fn from_parts(
        rows: Vec<PriceItem>,
        headers: BTreeMap<String, PriceHeader>,
        scope: Option<String>,
    ) -> Self {
        let mut sheet = Self {
            rows,
            baseline_rows: Vec::new(),
            baseline_index: HashMap::new(),
            headers,
            scope,
            tracker: ChangeTracker::new(),
            drafts: BTreeSet::new(),
            deleted: Vec::new(),
            mode: Mode::Viewing,
            next_temp: 0,
        };
        sheet.reset_baseline();
        sheet
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.mode == Mode::Editing
    }

    /// Enter edit mode. Calling it while already editing is a no-op.
    pub fn begin_edit(&mut self) {
        if self.mode == Mode::Viewing {
            self.reset_baseline();
            self.mode = Mode::Editing;
            tracing::info!(rows = self.rows.len(), "edit mode entered");
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[PriceItem] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, id: &RowId) -> Option<&PriceItem> {
        self.rows.iter().find(|r| r.id == *id)
    }

    #[must_use]
    pub const fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, PriceHeader> {
        &self.headers
    }

    /// Header the sheet was opened for, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    #[must_use]
    pub fn is_draft(&self, id: &RowId) -> bool {
        self.drafts.contains(id)
    }

    /// Row as it stood when edit mode began (or at the last save).
    #[must_use]
    pub fn baseline(&self, id: &RowId) -> Option<&PriceItem> {
        self.baseline_index
            .get(id)
            .and_then(|&idx| self.baseline_rows.get(idx))
    }

    /// Filter context bound to this sheet's state.
    #[must_use]
    pub fn filter_context(&self, today: NaiveDate) -> FilterContext<'_> {
        FilterContext {
            headers: &self.headers,
            tracker: &self.tracker,
            editing: self.is_editing(),
            today,
        }
    }

    /// Rows passing `filter`, temporary rows first, otherwise in sheet order.
    #[must_use]
    pub fn visible_rows(&self, filter: &ItemFilter, today: NaiveDate) -> Vec<&PriceItem> {
        let ctx = self.filter_context(today);
        let (mut temporary, persisted): (Vec<&PriceItem>, Vec<&PriceItem>) = self
            .rows
            .iter()
            .filter(|row| filter.matches(row, &ctx))
            .partition(|row| row.id.is_temporary());
        temporary.extend(persisted);
        temporary
    }

    /// Unsaved work in this session.
    #[must_use]
    pub fn pending(&self) -> PendingSummary {
        PendingSummary {
            new: self.tracker.new_count(),
            modified: self.tracker.updated_count(),
            deleted: self.deleted.len(),
            drafts: self.drafts.len(),
        }
    }

    /// Row-level and field-level change set against the baseline.
    #[must_use]
    pub fn change_set(&self) -> ChangeSet {
        ChangeSet {
            created: self.tracker.new_ids().cloned().collect(),
            updated: self
                .tracker
                .updated_ids()
                .map(|id| (id.clone(), self.tracker.dirty_fields(id)))
                .collect(),
            deleted: self.deleted.iter().map(|r| r.id.clone()).collect(),
        }
    }

    fn ensure_editing(&self) -> Result<(), EditError> {
        if self.is_editing() {
            Ok(())
        } else {
            Err(EditError::NotEditing)
        }
    }

    fn position(&self, id: &RowId) -> Result<usize, EditError> {
        self.rows
            .iter()
            .position(|r| r.id == *id)
            .ok_or_else(|| EditError::RowNotFound(id.clone()))
    }

    /// Row position by id, for operations over many rows.
    fn row_index(&self) -> HashMap<&RowId, usize> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, r)| (&r.id, idx))
            .collect()
    }

    fn next_temporary_id(&mut self) -> RowId {
        loop {
            self.next_temp += 1;
            let id = RowId::temporary(self.next_temp);
            if self.row(&id).is_none() {
                return id;
            }
        }
    }

    fn reset_baseline(&mut self) {
        self.baseline_rows = self
            .rows
            .iter()
            .filter(|r| !r.id.is_temporary())
            .cloned()
            .collect();
        self.baseline_index = self
            .baseline_rows
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.id.clone(), idx))
            .collect();
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn open_rejects_unknown_header() {
        let book = sample_book();
        assert_eq!(
            PriceSheet::open(&book, Some("PH-9999")).unwrap_err(),
            EditError::HeaderNotFound("PH-9999".into())
        );
    }

    #[test]
    fn viewing_sheet_refuses_edits() {
        let book = sample_book();
        let mut sheet = PriceSheet::open(&book, None).unwrap();
        let err = sheet
            .commit_cell(&RowId::persisted(1), Field::UnitPrice, "3")
            .unwrap_err();
        assert_eq!(err, EditError::NotEditing);
        assert_eq!(err.code(), ErrorCode::NotEditing);
    }

    #[test]
    fn temporary_rows_render_before_persisted() {
        let (_book, mut sheet) = editing_sheet();
        let draft = sheet.add_draft_row(None).unwrap();
        let mut item = PriceItem::blank(RowId::new("ignored"), "PH-0001");
        item.product_name = "Mop Head".into();
        item.unit_price = 4.0;
        let created = sheet.insert_new_row(item).unwrap();

        let today = date("2026-10-16");
        let visible = sheet.visible_rows(&ItemFilter::default(), today);
        assert_eq!(visible.len(), 5);
        assert!(visible[0].id.is_temporary());
        assert!(visible[1].id.is_temporary());
        assert!(visible[2..].iter().all(|r| !r.id.is_temporary()));
        let temp_ids: Vec<&RowId> = visible[..2].iter().map(|r| &r.id).collect();
        assert!(temp_ids.contains(&&draft));
        assert!(temp_ids.contains(&&created));
    }

    #[test]
    fn cleared_filter_returns_full_row_count() {
        let (_book, mut sheet) = editing_sheet();
        sheet
            .commit_cell(&RowId::persisted(1), Field::UnitPrice, "13")
            .unwrap();
        let today = date("2026-10-16");
        let mut filter = ItemFilter {
            search: "bleach".into(),
            modified_only: true,
            ..ItemFilter::default()
        };
        assert_eq!(sheet.visible_rows(&filter, today).len(), 1);
        filter.clear();
        assert_eq!(sheet.visible_rows(&filter, today).len(), sheet.rows().len());
    }

    #[test]
    fn change_set_separates_created_updated_deleted() {
        let (_book, mut sheet) = editing_sheet();
        sheet
            .commit_cell(&RowId::persisted(2), Field::Notes, "promo")
            .unwrap();
        let mut item = PriceItem::blank(RowId::new("x"), "PH-0001");
        item.product_name = "Gloves".into();
        item.unit_price = 2.0;
        let created = sheet.insert_new_row(item).unwrap();
        sheet
            .delete_rows(&[RowId::persisted(1)], date("2026-10-16"))
            .unwrap();

        let changes = sheet.change_set();
        assert_eq!(changes.created, vec![created]);
        assert_eq!(changes.updated.len(), 1);
        assert_eq!(changes.updated[0].0, RowId::persisted(2));
        assert!(changes.updated[0].1.contains(&Field::Notes));
        assert_eq!(changes.deleted, vec![RowId::persisted(1)]);
    }
}
