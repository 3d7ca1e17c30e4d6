//! Deletion guard: effective pricing cannot be removed retroactively.
//!
//! A persisted row whose effective date (its own, else its header's) is on
//! or before today is blocked. When the row also has a saved baseline, the
//! earlier of the two dates counts, so moving a date forward in the same
//! session does not unlock the row. Rows with temporary ids were never
//! saved and are always deletable.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::ErrorCode;
use crate::model::{PriceHeader, PriceItem, RowId};

/// The requested deletion touches rows that are already in effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} row(s) already in effect cannot be deleted: {}", .ids.len(), join_ids(.ids))]
pub struct DeletionBlocked {
    /// Every row that blocked the deletion, in request order.
    pub ids: Vec<RowId>,
}

impl DeletionBlocked {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::DeletionBlocked
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.ids.len()
    }
}

fn join_ids(ids: &[RowId]) -> String {
    ids.iter()
        .map(RowId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Effective date governing `item`: its own, falling back to its header's.
#[must_use]
pub fn effective_date_of(
    item: &PriceItem,
    headers: &BTreeMap<String, PriceHeader>,
) -> Option<NaiveDate> {
    item.effective_date
        .or_else(|| headers.get(&item.header_id).map(|h| h.effective_date))
}

/// Date the guard enforces for `item`: the earlier of its current and
/// baseline effective dates.
#[must_use]
pub fn guarded_date(
    item: &PriceItem,
    baseline: Option<&PriceItem>,
    headers: &BTreeMap<String, PriceHeader>,
) -> Option<NaiveDate> {
    let current = effective_date_of(item, headers);
    let saved = baseline.and_then(|b| effective_date_of(b, headers));
    match (current, saved) {
        (Some(current), Some(saved)) => Some(current.min(saved)),
        (current, saved) => current.or(saved),
    }
}

/// True when `item` may be deleted on `today`.
#[must_use]
pub fn is_deletable(
    item: &PriceItem,
    baseline: Option<&PriceItem>,
    headers: &BTreeMap<String, PriceHeader>,
    today: NaiveDate,
) -> bool {
    if item.id.is_temporary() {
        return true;
    }
    guarded_date(item, baseline, headers).is_none_or(|effective| effective > today)
}

/// Check a whole deletion request before anything is removed.
///
/// Each entry pairs a row with its baseline, if it has one.
///
/// # Errors
///
/// Returns [`DeletionBlocked`] listing every row that is already in effect.
pub fn check_deletable<'a>(
    rows: impl IntoIterator<Item = (&'a PriceItem, Option<&'a PriceItem>)>,
    headers: &BTreeMap<String, PriceHeader>,
    today: NaiveDate,
) -> Result<(), DeletionBlocked> {
    let ids: Vec<RowId> = rows
        .into_iter()
        .filter(|(item, baseline)| !is_deletable(item, *baseline, headers, today))
        .map(|(item, _)| item.id.clone())
        .collect();
    if ids.is_empty() {
        Ok(())
    } else {
        Err(DeletionBlocked { ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn headers(effective: &str) -> BTreeMap<String, PriceHeader> {
        let mut map = BTreeMap::new();
        map.insert(
            "PH-0001".to_string(),
            PriceHeader {
                id: "PH-0001".into(),
                customer_id: "C-0001".into(),
                name: "Acme".into(),
                currency: "USD".into(),
                effective_date: date(effective),
                expiration_date: None,
            },
        );
        map
    }

    fn item(id: &str, effective: Option<&str>) -> PriceItem {
        let mut item = PriceItem::blank(RowId::new(id), "PH-0001");
        item.effective_date = effective.map(date);
        item
    }

    fn is_deletable_alone(
        item: &PriceItem,
        headers: &BTreeMap<String, PriceHeader>,
        today: NaiveDate,
    ) -> bool {
        is_deletable(item, None, headers, today)
    }

    fn unedited(rows: &[PriceItem]) -> impl Iterator<Item = (&PriceItem, Option<&PriceItem>)> {
        rows.iter().map(|row| (row, None))
    }

    #[test]
    fn today_and_past_are_blocked_future_is_not() {
        let headers = headers("2027-01-01");
        let today = date("2026-10-16");
        assert!(!is_deletable_alone(&item("PI-1", Some("2026-10-16")), &headers, today));
        assert!(!is_deletable_alone(&item("PI-2", Some("2025-01-01")), &headers, today));
        assert!(is_deletable_alone(&item("PI-3", Some("2026-10-17")), &headers, today));
    }

    #[test]
    fn header_date_applies_when_row_has_none() {
        let today = date("2026-10-16");
        assert!(!is_deletable_alone(&item("PI-1", None), &headers("2026-01-01"), today));
        assert!(is_deletable_alone(&item("PI-1", None), &headers("2026-12-01"), today));
    }

    #[test]
    fn temporary_rows_are_exempt() {
        let today = date("2026-10-16");
        assert!(is_deletable_alone(
            &item("temp-4", Some("2020-01-01")),
            &headers("2020-01-01"),
            today
        ));
    }

    #[test]
    fn check_reports_every_blocking_id() {
        let headers = headers("2027-01-01");
        let today = date("2026-10-16");
        let rows = [
            item("PI-1", Some("2026-01-01")),
            item("PI-2", Some("2027-03-01")),
            item("PI-3", Some("2026-10-16")),
        ];
        let err = check_deletable(unedited(&rows), &headers, today).unwrap_err();
        assert_eq!(err.ids, vec![RowId::new("PI-1"), RowId::new("PI-3")]);
        assert_eq!(err.count(), 2);
        assert!(err.to_string().starts_with("2 row(s)"));
    }

    #[test]
    fn check_passes_all_future_rows() {
        let headers = headers("2027-01-01");
        let rows = [item("PI-1", Some("2027-01-01")), item("PI-2", None)];
        assert!(check_deletable(unedited(&rows), &headers, date("2026-10-16")).is_ok());
    }

    #[test]
    fn baseline_date_keeps_guard_after_moving_effective_forward() {
        let headers = headers("2027-01-01");
        let today = date("2026-10-16");
        let saved = item("PI-1", Some("2026-03-01"));
        let moved = item("PI-1", Some("2030-01-01"));
        assert_eq!(guarded_date(&moved, Some(&saved), &headers), Some(date("2026-03-01")));
        assert!(!is_deletable(&moved, Some(&saved), &headers, today));

        let err = check_deletable([(&moved, Some(&saved))], &headers, today).unwrap_err();
        assert_eq!(err.ids, vec![RowId::new("PI-1")]);
    }

    #[test]
    fn moving_effective_back_blocks_too() {
        let headers = headers("2027-01-01");
        let today = date("2026-10-16");
        let saved = item("PI-1", Some("2027-05-01"));
        let moved = item("PI-1", Some("2026-01-01"));
        assert!(!is_deletable(&moved, Some(&saved), &headers, today));
        assert!(is_deletable(&saved, Some(&saved), &headers, today));
    }
}
