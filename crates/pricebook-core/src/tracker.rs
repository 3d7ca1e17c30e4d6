//! Row- and field-level change tracking for an edit session.
//!
//! A row is either *new* (created this session, temporary id) or an
//! existing row; *modified* overlays either kind. For each modified row the
//! tracker also records which fields changed so the grid can highlight
//! exactly those cells.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{Field, RowId};

/// Dirty-row bookkeeping for one price sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeTracker {
    new: BTreeSet<RowId>,
    modified: BTreeSet<RowId>,
    fields: BTreeMap<RowId, BTreeSet<Field>>,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag `id` as created during this session.
    pub fn mark_new(&mut self, id: &RowId) {
        self.new.insert(id.clone());
    }

    /// Record that `field` of row `id` differs from its baseline.
    pub fn mark_modified(&mut self, id: &RowId, field: Field) {
        self.modified.insert(id.clone());
        self.fields.entry(id.clone()).or_default().insert(field);
    }

    /// Drop `field` from row `id`; the row leaves the modified set once no
    /// dirty fields remain.
    pub fn unmark_field(&mut self, id: &RowId, field: Field) {
        let now_clean = match self.fields.get_mut(id) {
            Some(set) => {
                set.remove(&field);
                set.is_empty()
            }
            None => false,
        };
        if now_clean {
            self.fields.remove(id);
            self.modified.remove(id);
        }
    }

    /// Remove every trace of `id` (used when a row is deleted).
    pub fn forget(&mut self, id: &RowId) {
        self.new.remove(id);
        self.modified.remove(id);
        self.fields.remove(id);
    }

    #[must_use]
    pub fn is_new(&self, id: &RowId) -> bool {
        self.new.contains(id)
    }

    #[must_use]
    pub fn is_modified(&self, id: &RowId) -> bool {
        self.modified.contains(id)
    }

    /// New or modified.
    #[must_use]
    pub fn is_dirty(&self, id: &RowId) -> bool {
        self.is_new(id) || self.is_modified(id)
    }

    /// Fields of `id` that changed; empty for clean rows.
    #[must_use]
    pub fn dirty_fields(&self, id: &RowId) -> BTreeSet<Field> {
        self.fields.get(id).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn is_field_dirty(&self, id: &RowId, field: Field) -> bool {
        self.fields.get(id).is_some_and(|set| set.contains(&field))
    }

    pub fn new_ids(&self) -> impl Iterator<Item = &RowId> {
        self.new.iter()
    }

    pub fn modified_ids(&self) -> impl Iterator<Item = &RowId> {
        self.modified.iter()
    }

    /// Modified rows that are not new (existing rows with edits).
    pub fn updated_ids(&self) -> impl Iterator<Item = &RowId> {
        self.modified.iter().filter(|id| !self.new.contains(*id))
    }

    #[must_use]
    pub fn new_count(&self) -> usize {
        self.new.len()
    }

    /// Number of modified rows that are not also new.
    #[must_use]
    pub fn updated_count(&self) -> usize {
        self.updated_ids().count()
    }

    /// Rows that would be written by a save.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.new.union(&self.modified).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty()
    }

    /// Reset every tracking set to empty.
    pub fn clear(&mut self) {
        self.new.clear();
        self.modified.clear();
        self.fields.clear();
    }
}
