//! Single-cell commits, draft rows, and direct inserts.

use serde::Serialize;
use tracing::debug;

use super::{EditError, PriceSheet};
use crate::model::{CellValue, Field, PriceItem, RowId, parse_cell};

/// Result of committing one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// The typed value equals what the cell already held.
    Unchanged,
    /// The value changed and the field is now dirty.
    Modified { field: Field },
    /// The value returned to its baseline; the field is clean again.
    Reverted { field: Field },
    /// A draft row satisfied its required fields and became a new row.
    Created { id: RowId },
    /// The value was kept on a draft that still lacks required fields.
    DraftPending { missing: Vec<Field> },
}

impl PriceSheet {
    /// Commit raw input into one cell of row `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::NotEditing`] outside edit mode,
    /// [`EditError::RowNotFound`] for an unknown row, [`EditError::Cell`]
    /// when the input cannot be converted, and [`EditError::DateOrder`]
    /// when the new date would put expiration on or before the effective
    /// date.
    pub fn commit_cell(
        &mut self,
        id: &RowId,
        field: Field,
        raw: &str,
    ) -> Result<CommitOutcome, EditError> {
        self.ensure_editing()?;
        let idx = self.position(id)?;
        let value = parse_cell(field, raw).map_err(|source| EditError::Cell {
            id: id.clone(),
            field,
            source,
        })?;

        let row = &self.rows[idx];
        check_date_order(row, field, &value)?;
        if row.get(field) == value {
            return Ok(CommitOutcome::Unchanged);
        }

        let row = &mut self.rows[idx];
        row.set(field, value.clone())
            .map_err(|source| EditError::Cell {
                id: id.clone(),
                field,
                source,
            })?;

        if self.drafts.contains(id) {
            return Ok(self.promote_draft(idx));
        }

        let reverted = self
            .baseline(id)
            .is_some_and(|original| original.get(field) == value);
        if reverted {
            self.tracker.unmark_field(id, field);
            debug!(row = %id, field = field.as_str(), "cell reverted");
            Ok(CommitOutcome::Reverted { field })
        } else {
            self.tracker.mark_modified(id, field);
            debug!(row = %id, field = field.as_str(), "cell modified");
            Ok(CommitOutcome::Modified { field })
        }
    }

    /// Insert an empty draft row at the front and return its temporary id.
    ///
    /// The draft belongs to `header_id`, or to the sheet's header when
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::NotEditing`] outside edit mode and
    /// [`EditError::HeaderNotFound`] when no known header applies.
    pub fn add_draft_row(&mut self, header_id: Option<&str>) -> Result<RowId, EditError> {
        self.ensure_editing()?;
        let header_id = self.resolve_header(header_id)?;
        let id = self.next_temporary_id();
        self.rows.insert(0, PriceItem::blank(id.clone(), header_id));
        self.drafts.insert(id.clone());
        debug!(row = %id, "draft row added");
        Ok(id)
    }

    /// Insert a complete row as new, assigning it a temporary id.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::Required`] when product name or unit price is
    /// missing, [`EditError::DateOrder`] for inverted dates, and
    /// [`EditError::HeaderNotFound`] for an unknown header.
    pub fn insert_new_row(&mut self, mut item: PriceItem) -> Result<RowId, EditError> {
        self.ensure_editing()?;
        if !self.headers.contains_key(&item.header_id) {
            return Err(EditError::HeaderNotFound(item.header_id));
        }
        let missing = item.missing_required();
        if !missing.is_empty() {
            return Err(EditError::Required { missing });
        }
        let id = self.next_temporary_id();
        item.id = id.clone();
        if let (Some(effective), Some(expiration)) = (item.effective_date, item.expiration_date)
            && !item.dates_ordered()
        {
            return Err(EditError::DateOrder {
                id,
                effective,
                expiration,
            });
        }
        self.rows.insert(0, item);
        self.tracker.mark_new(&id);
        debug!(row = %id, "new row inserted");
        Ok(id)
    }

    fn promote_draft(&mut self, idx: usize) -> CommitOutcome {
        let missing = self.rows[idx].missing_required();
        if !missing.is_empty() {
            return CommitOutcome::DraftPending { missing };
        }
        let row = self.rows.remove(idx);
        let id = row.id.clone();
        self.rows.insert(0, row);
        self.drafts.remove(&id);
        self.tracker.mark_new(&id);
        debug!(row = %id, "draft row created");
        CommitOutcome::Created { id }
    }

    fn resolve_header(&self, header_id: Option<&str>) -> Result<String, EditError> {
        let Some(id) = header_id.or(self.scope.as_deref()) else {
            return Err(EditError::HeaderNotFound(String::new()));
        };
        if self.headers.contains_key(id) {
            Ok(id.to_string())
        } else {
            Err(EditError::HeaderNotFound(id.to_string()))
        }
    }
}

/// Reject a date value that would invert the row's effective/expiration pair.
fn check_date_order(row: &PriceItem, field: Field, value: &CellValue) -> Result<(), EditError> {
    let (effective, expiration) = match (field, value) {
        (Field::EffectiveDate, CellValue::Date(d)) => (*d, row.expiration_date),
        (Field::ExpirationDate, CellValue::Date(d)) => (row.effective_date, *d),
        _ => return Ok(()),
    };
    match (effective, expiration) {
        (Some(effective), Some(expiration)) if expiration <= effective => {
            Err(EditError::DateOrder {
                id: row.id.clone(),
                effective,
                expiration,
            })
        }
        _ => Ok(()),
    }
}
