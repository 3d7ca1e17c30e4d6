//! Bulk edits: one sparse patch applied to many rows at once.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{EditError, PriceSheet};
use crate::model::{Field, PriceItem, RowId, Uom, round_cents};

/// How a bulk edit changes a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "value")]
pub enum PriceChange {
    /// Replace the price.
    Absolute(f64),
    /// Raise (or lower, when negative) by a percentage of the current price.
    Percent(f64),
}

impl PriceChange {
    #[must_use]
    pub fn apply(self, current: f64) -> f64 {
        match self {
            Self::Absolute(value) => round_cents(value),
            Self::Percent(pct) => round_cents(current * (1.0 + pct / 100.0)),
        }
    }
}

/// Text that is neither a price nor a percentage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a price or percentage (examples: 12.50, +5%, -10%)")]
pub struct ParsePriceChangeError(String);

impl FromStr for PriceChange {
    type Err = ParsePriceChangeError;

    /// `12.50` or `$12.50` sets the price; `5%`, `+5%` and `-10%` scale it.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let invalid = || ParsePriceChangeError(raw.to_string());
        if let Some(pct) = trimmed.strip_suffix('%') {
            let value: f64 = pct.trim().parse().map_err(|_| invalid())?;
            return if value.is_finite() {
                Ok(Self::Percent(value))
            } else {
                Err(invalid())
            };
        }
        let cleaned: String = trimmed
            .chars()
            .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | '_'))
            .collect();
        match cleaned.parse::<f64>() {
            Ok(value) if value >= 0.0 && round_cents(value).is_finite() => {
                Ok(Self::Absolute(value))
            }
            _ => Err(invalid()),
        }
    }
}

/// Sparse set of field changes; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPatch {
    pub product_name: Option<String>,
    pub unit_price: Option<PriceChange>,
    pub minimum_price: Option<PriceChange>,
    pub container_size: Option<String>,
    pub uom: Option<Uom>,
    pub effective_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Outcome of a bulk edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub updated: Vec<RowId>,
    /// Draft rows in the selection, left untouched.
    pub skipped_drafts: Vec<RowId>,
    /// Fields the patch carried.
    pub fields: Vec<Field>,
}

impl BulkPatch {
    /// True when no field would be applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Fields this patch sets; blank text patches do not count.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if text(self.product_name.as_ref()).is_some() {
            fields.push(Field::ProductName);
        }
        if self.unit_price.is_some() {
            fields.push(Field::UnitPrice);
        }
        if self.minimum_price.is_some() {
            fields.push(Field::MinimumPrice);
        }
        if text(self.container_size.as_ref()).is_some() {
            fields.push(Field::ContainerSize);
        }
        if self.uom.is_some() {
            fields.push(Field::Uom);
        }
        if self.effective_date.is_some() {
            fields.push(Field::EffectiveDate);
        }
        if self.expiration_date.is_some() {
            fields.push(Field::ExpirationDate);
        }
        if text(self.notes.as_ref()).is_some() {
            fields.push(Field::Notes);
        }
        fields
    }

    /// Apply to a copy of `item`, returning it with the fields actually set.
    fn apply_to(&self, item: &PriceItem) -> (PriceItem, Vec<Field>) {
        let mut next = item.clone();
        let mut applied = Vec::new();
        if let Some(name) = text(self.product_name.as_ref()) {
            next.product_name = name.to_string();
            applied.push(Field::ProductName);
        }
        if let Some(change) = self.unit_price {
            next.unit_price = change.apply(next.unit_price);
            applied.push(Field::UnitPrice);
        }
        match (self.minimum_price, next.minimum_price) {
            (Some(PriceChange::Absolute(v)), _) => {
                next.minimum_price = Some(round_cents(v));
                applied.push(Field::MinimumPrice);
            }
            (Some(change @ PriceChange::Percent(_)), Some(current)) => {
                next.minimum_price = Some(change.apply(current));
                applied.push(Field::MinimumPrice);
            }
            _ => {}
        }
        if let Some(size) = text(self.container_size.as_ref()) {
            next.container_size = size.to_string();
            applied.push(Field::ContainerSize);
        }
        if let Some(uom) = self.uom {
            next.uom = Some(uom);
            applied.push(Field::Uom);
        }
        if let Some(date) = self.effective_date {
            next.effective_date = Some(date);
            applied.push(Field::EffectiveDate);
        }
        if let Some(date) = self.expiration_date {
            next.expiration_date = Some(date);
            applied.push(Field::ExpirationDate);
        }
        if let Some(notes) = text(self.notes.as_ref()) {
            next.notes = notes.to_string();
            applied.push(Field::Notes);
        }
        (next, applied)
    }
}

/// First applied price a bulk edit must not store: unit prices must be
/// finite and positive, minimum prices finite and not negative.
fn out_of_range(item: &PriceItem, applied: &[Field]) -> Option<(Field, f64)> {
    let unit = item.unit_price;
    if applied.contains(&Field::UnitPrice) && !(unit.is_finite() && unit > 0.0) {
        return Some((Field::UnitPrice, unit));
    }
    item.minimum_price
        .filter(|_| applied.contains(&Field::MinimumPrice))
        .filter(|min| !(min.is_finite() && *min >= 0.0))
        .map(|min| (Field::MinimumPrice, min))
}

fn text(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl PriceSheet {
    /// Apply `patch` to every row in `ids`.
    ///
    /// All rows are validated before any is changed. Draft rows are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::EmptyBulkEdit`] for an empty selection or patch,
    /// [`EditError::RowNotFound`] for an unknown id,
    /// [`EditError::DateOrder`] when any row would end up with inverted
    /// dates, and [`EditError::PriceOutOfRange`] when a price change would
    /// leave a row with a non-positive or non-finite price.
    pub fn bulk_edit(&mut self, ids: &[RowId], patch: &BulkPatch) -> Result<BulkReport, EditError> {
        self.ensure_editing()?;
        if ids.is_empty() || patch.is_empty() {
            return Err(EditError::EmptyBulkEdit);
        }

        let index = self.row_index();
        let mut seen = HashSet::new();
        let mut staged = Vec::new();
        let mut skipped_drafts = Vec::new();
        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            let idx = *index
                .get(id)
                .ok_or_else(|| EditError::RowNotFound(id.clone()))?;
            if self.drafts.contains(id) {
                skipped_drafts.push(id.clone());
                continue;
            }
            let (next, applied) = patch.apply_to(&self.rows[idx]);
            if let (Some(effective), Some(expiration)) = (next.effective_date, next.expiration_date)
                && !next.dates_ordered()
            {
                return Err(EditError::DateOrder {
                    id: id.clone(),
                    effective,
                    expiration,
                });
            }
            if let Some((field, value)) = out_of_range(&next, &applied) {
                return Err(EditError::PriceOutOfRange {
                    id: id.clone(),
                    field,
                    value,
                });
            }
            staged.push((idx, next, applied));
        }

        let mut updated = Vec::with_capacity(staged.len());
        for (idx, next, applied) in staged {
            for field in applied {
                self.tracker.mark_modified(&next.id, field);
            }
            updated.push(next.id.clone());
            self.rows[idx] = next;
        }

        info!(
            rows = updated.len(),
            skipped = skipped_drafts.len(),
            "bulk edit applied"
        );
        Ok(BulkReport {
            updated,
            skipped_drafts,
            fields: patch.fields(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn ids(seqs: &[u64]) -> Vec<RowId> {
        seqs.iter().map(|&s| RowId::persisted(s)).collect()
    }

    #[test]
    fn percent_change_rounds_to_cents() {
        assert!((PriceChange::Percent(10.0).apply(12.0) - 13.2).abs() < 1e-9);
        assert!((PriceChange::Percent(-10.0).apply(8.5) - 7.65).abs() < 1e-9);
        assert!((PriceChange::Absolute(3.456).apply(99.0) - 3.46).abs() < 1e-9);
    }

    #[test]
    fn price_changes_parse_from_text() {
        assert_eq!("+5%".parse::<PriceChange>(), Ok(PriceChange::Percent(5.0)));
        assert_eq!("-10 %".parse::<PriceChange>(), Ok(PriceChange::Percent(-10.0)));
        assert_eq!("$1,250.00".parse::<PriceChange>(), Ok(PriceChange::Absolute(1250.0)));
        assert!("cheap".parse::<PriceChange>().is_err());
        assert!("-3".parse::<PriceChange>().is_err());
        assert!("1e308".parse::<PriceChange>().is_err());
        assert!("inf%".parse::<PriceChange>().is_err());
    }

    #[test]
    fn blank_text_patch_is_empty() {
        let patch = BulkPatch {
            notes: Some("   ".into()),
            ..BulkPatch::default()
        };
        assert!(patch.is_empty());
    }

    #[test]
    fn empty_selection_or_patch_is_rejected() {
        let (_book, mut sheet) = editing_sheet();
        let patch = BulkPatch {
            uom: Some(Uom::Ea),
            ..BulkPatch::default()
        };
        assert_eq!(sheet.bulk_edit(&[], &patch), Err(EditError::EmptyBulkEdit));
        assert_eq!(
            sheet.bulk_edit(&ids(&[1]), &BulkPatch::default()),
            Err(EditError::EmptyBulkEdit)
        );
    }

    #[test]
    fn every_selected_row_gets_every_patched_field() {
        let (_book, mut sheet) = editing_sheet();
        let patch = BulkPatch {
            unit_price: Some(PriceChange::Percent(10.0)),
            notes: Some("2027 increase".into()),
            ..BulkPatch::default()
        };
        let report = sheet.bulk_edit(&ids(&[1, 2]), &patch).unwrap();
        assert_eq!(report.updated, ids(&[1, 2]));
        assert_eq!(report.fields, vec![Field::UnitPrice, Field::Notes]);

        let first = sheet.row(&RowId::persisted(1)).unwrap();
        assert!((first.unit_price - 13.2).abs() < 1e-9);
        let second = sheet.row(&RowId::persisted(2)).unwrap();
        assert!((second.unit_price - 9.35).abs() < 1e-9);
        for id in ids(&[1, 2]) {
            assert!(sheet.tracker().is_field_dirty(&id, Field::UnitPrice));
            assert!(sheet.tracker().is_field_dirty(&id, Field::Notes));
        }
        assert!(!sheet.tracker().is_dirty(&RowId::persisted(3)));
    }

    #[test]
    fn unchanged_values_are_still_marked() {
        let (_book, mut sheet) = editing_sheet();
        let patch = BulkPatch {
            unit_price: Some(PriceChange::Absolute(12.0)),
            ..BulkPatch::default()
        };
        sheet.bulk_edit(&ids(&[1]), &patch).unwrap();
        assert!(sheet
            .tracker()
            .is_field_dirty(&RowId::persisted(1), Field::UnitPrice));
    }

    #[test]
    fn percent_compounds_when_reapplied() {
        let (_book, mut sheet) = editing_sheet();
        let patch = BulkPatch {
            unit_price: Some(PriceChange::Percent(10.0)),
            ..BulkPatch::default()
        };
        sheet.bulk_edit(&ids(&[1]), &patch).unwrap();
        sheet.bulk_edit(&ids(&[1]), &patch).unwrap();
        let row = sheet.row(&RowId::persisted(1)).unwrap();
        assert!((row.unit_price - 14.52).abs() < 1e-9);
    }

    #[test]
    fn percent_on_absent_minimum_leaves_it_absent() {
        let (_book, mut sheet) = editing_sheet();
        let patch = BulkPatch {
            minimum_price: Some(PriceChange::Percent(5.0)),
            ..BulkPatch::default()
        };
        sheet.bulk_edit(&ids(&[1]), &patch).unwrap();
        let id = RowId::persisted(1);
        assert_eq!(sheet.row(&id).unwrap().minimum_price, None);
        assert!(!sheet.tracker().is_field_dirty(&id, Field::MinimumPrice));
    }

    #[test]
    fn one_bad_row_rejects_the_whole_edit() {
        let (_book, mut sheet) = editing_sheet();
        // Row 3 is effective 2026-03-01; rows 1 and 2 are effective in 2027.
        let patch = BulkPatch {
            expiration_date: Some(date("2026-12-31")),
            ..BulkPatch::default()
        };
        let err = sheet.bulk_edit(&ids(&[3, 1]), &patch).unwrap_err();
        assert!(matches!(err, EditError::DateOrder { ref id, .. } if *id == RowId::persisted(1)));
        assert!(sheet.tracker().is_empty());
        assert_eq!(sheet.row(&RowId::persisted(3)).unwrap().expiration_date, None);
    }

    #[test]
    fn unknown_id_rejects_the_whole_edit() {
        let (_book, mut sheet) = editing_sheet();
        let patch = BulkPatch {
            uom: Some(Uom::Cs),
            ..BulkPatch::default()
        };
        let err = sheet.bulk_edit(&ids(&[1, 42]), &patch).unwrap_err();
        assert_eq!(err, EditError::RowNotFound(RowId::persisted(42)));
        assert!(sheet.tracker().is_empty());
    }

    #[test]
    fn drafts_are_skipped_and_reported() {
        let (_book, mut sheet) = editing_sheet();
        let draft = sheet.add_draft_row(None).unwrap();
        let patch = BulkPatch {
            uom: Some(Uom::Bx),
            ..BulkPatch::default()
        };
        let report = sheet
            .bulk_edit(&[draft.clone(), RowId::persisted(2)], &patch)
            .unwrap();
        assert_eq!(report.skipped_drafts, vec![draft.clone()]);
        assert_eq!(report.updated, ids(&[2]));
        assert_eq!(sheet.row(&draft).unwrap().uom, None);
    }

    #[test]
    fn percent_below_minus_hundred_is_rejected() {
        let (_book, mut sheet) = editing_sheet();
        let patch = BulkPatch {
            unit_price: Some("-150%".parse().unwrap()),
            ..BulkPatch::default()
        };
        let err = sheet.bulk_edit(&ids(&[1, 2]), &patch).unwrap_err();
        assert!(matches!(
            err,
            EditError::PriceOutOfRange { ref id, field: Field::UnitPrice, .. }
                if *id == RowId::persisted(1)
        ));
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidCellValue);
        assert!(sheet.tracker().is_empty());
        assert!((sheet.row(&RowId::persisted(1)).unwrap().unit_price - 12.0).abs() < 1e-9);
    }

    #[test]
    fn overflowing_percent_is_rejected() {
        let (_book, mut sheet) = editing_sheet();
        let patch = BulkPatch {
            unit_price: Some(PriceChange::Percent(1e308)),
            ..BulkPatch::default()
        };
        let err = sheet.bulk_edit(&ids(&[3]), &patch).unwrap_err();
        assert!(matches!(
            err,
            EditError::PriceOutOfRange { field: Field::UnitPrice, value, .. } if value.is_infinite()
        ));
        assert!((sheet.row(&RowId::persisted(3)).unwrap().unit_price - 20.0).abs() < 1e-9);
    }

    #[test]
    fn minimum_price_may_drop_to_zero_but_not_below() {
        let (_book, mut sheet) = editing_sheet();
        let id = RowId::persisted(2);
        sheet.commit_cell(&id, Field::MinimumPrice, "4").unwrap();

        let to_zero = BulkPatch {
            minimum_price: Some(PriceChange::Percent(-100.0)),
            ..BulkPatch::default()
        };
        sheet.bulk_edit(&ids(&[2]), &to_zero).unwrap();
        assert_eq!(sheet.row(&id).unwrap().minimum_price, Some(0.0));

        sheet.commit_cell(&id, Field::MinimumPrice, "4").unwrap();
        let below = BulkPatch {
            minimum_price: Some(PriceChange::Percent(-120.0)),
            ..BulkPatch::default()
        };
        let err = sheet.bulk_edit(&ids(&[2]), &below).unwrap_err();
        assert!(matches!(err, EditError::PriceOutOfRange { field: Field::MinimumPrice, .. }));
    }
}
