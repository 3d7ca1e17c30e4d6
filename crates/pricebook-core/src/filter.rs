//! Row filtering for price sheets.
//!
//! An [`ItemFilter`] is the conjunction of per-field predicates. Cleared
//! predicates pass everything, so `ItemFilter::default()` matches every row.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{HeaderStatus, PriceHeader, PriceItem, Uom};
use crate::tracker::ChangeTracker;

/// Enumerated filter value: `All` passes every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "value")]
pub enum Choice<T> {
    All,
    Only(T),
}

impl<T> Default for Choice<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: PartialEq> Choice<T> {
    #[must_use]
    pub fn admits(&self, value: Option<&T>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => value == Some(wanted),
        }
    }

    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Filter criteria for line-item listings. All active criteria must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Substring of product name or product code.
    pub search: String,
    /// Substring of the product name only.
    pub product_name: String,
    /// Substring of the container size.
    pub container_size: String,
    pub uom: Choice<Uom>,
    pub header_id: Option<String>,
    /// Customer owning the row's header.
    pub customer_id: Option<String>,
    /// Status of the row's header.
    pub status: Choice<HeaderStatus>,
    /// Inclusive lower bound on the effective date.
    pub effective_from: Option<NaiveDate>,
    /// Inclusive upper bound on the effective date.
    pub effective_to: Option<NaiveDate>,
    /// Only new or modified rows; honored only in edit mode.
    pub modified_only: bool,
}

/// What a filter needs besides the row itself.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub headers: &'a BTreeMap<String, PriceHeader>,
    pub tracker: &'a ChangeTracker,
    pub editing: bool,
    pub today: NaiveDate,
}

impl ItemFilter {
    /// Returns true if no filter criteria are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.is_empty()
            && self.product_name.is_empty()
            && self.container_size.is_empty()
            && self.uom.is_all()
            && self.header_id.is_none()
            && self.customer_id.is_none()
            && self.status.is_all()
            && self.effective_from.is_none()
            && self.effective_to.is_none()
            && !self.modified_only
    }

    /// Reset every criterion.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Returns true if the item satisfies all active filter criteria.
    #[must_use]
    pub fn matches(&self, item: &PriceItem, ctx: &FilterContext<'_>) -> bool {
        if !self.search.is_empty()
            && !contains_ci(&item.product_name, &self.search)
            && !contains_ci(&item.product_code, &self.search)
        {
            return false;
        }
        if !self.product_name.is_empty() && !contains_ci(&item.product_name, &self.product_name) {
            return false;
        }
        if !self.container_size.is_empty()
            && !contains_ci(&item.container_size, &self.container_size)
        {
            return false;
        }
        if !self.uom.admits(item.uom.as_ref()) {
            return false;
        }
        if let Some(ref header_id) = self.header_id
            && item.header_id != *header_id
        {
            return false;
        }

        let header = ctx.headers.get(&item.header_id);
        if let Some(ref customer_id) = self.customer_id
            && header.is_none_or(|h| h.customer_id != *customer_id)
        {
            return false;
        }
        if !self.status.is_all() {
            let status = header.map(|h| h.status_on(ctx.today));
            if !self.status.admits(status.as_ref()) {
                return false;
            }
        }

        if self.effective_from.is_some() || self.effective_to.is_some() {
            let Some(effective) = item.effective_date else {
                return false;
            };
            if self.effective_from.is_some_and(|from| effective < from) {
                return false;
            }
            if self.effective_to.is_some_and(|to| effective > to) {
                return false;
            }
        }

        if self.modified_only && ctx.editing && !ctx.tracker.is_dirty(&item.id) {
            return false;
        }
        true
    }

    /// Items satisfying the filter, in input order.
    pub fn apply<'i>(&self, items: &'i [PriceItem], ctx: &FilterContext<'_>) -> Vec<&'i PriceItem> {
        items.iter().filter(|item| self.matches(item, ctx)).collect()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, RowId};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_item(id: &str, name: &str, code: &str, uom: Option<Uom>, effective: Option<&str>) -> PriceItem {
        let mut item = PriceItem::blank(RowId::new(id), "PH-0001");
        item.product_name = name.into();
        item.product_code = code.into();
        item.unit_price = 10.0;
        item.uom = uom;
        item.effective_date = effective.map(date);
        item
    }

    fn headers() -> BTreeMap<String, PriceHeader> {
        let mut map = BTreeMap::new();
        map.insert(
            "PH-0001".to_string(),
            PriceHeader {
                id: "PH-0001".into(),
                customer_id: "C-0001".into(),
                name: "Acme 2026".into(),
                currency: "USD".into(),
                effective_date: date("2026-01-01"),
                expiration_date: None,
            },
        );
        map
    }

    #[test]
    fn empty_filter_matches_all() {
        let headers = headers();
        let tracker = ChangeTracker::new();
        let ctx = FilterContext {
            headers: &headers,
            tracker: &tracker,
            editing: false,
            today: date("2026-06-01"),
        };
        let items = vec![
            make_item("PI-000001", "Bleach", "BL-1", None, None),
            make_item("PI-000002", "Soap", "SP-1", Some(Uom::Cs), Some("2026-02-01")),
        ];
        let filter = ItemFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&items, &ctx).len(), items.len());
    }

    #[test]
    fn search_is_case_insensitive_over_name_and_code() {
        let headers = headers();
        let tracker = ChangeTracker::new();
        let ctx = FilterContext {
            headers: &headers,
            tracker: &tracker,
            editing: false,
            today: date("2026-06-01"),
        };
        let filter = ItemFilter {
            search: "bl".into(),
            ..ItemFilter::default()
        };
        assert!(filter.matches(&make_item("PI-1", "BLEACH", "X", None, None), &ctx));
        assert!(filter.matches(&make_item("PI-2", "Soap", "bl-9", None, None), &ctx));
        assert!(!filter.matches(&make_item("PI-3", "Soap", "SP", None, None), &ctx));
    }

    #[test]
    fn uom_choice_all_passes_and_only_compares() {
        let headers = headers();
        let tracker = ChangeTracker::new();
        let ctx = FilterContext {
            headers: &headers,
            tracker: &tracker,
            editing: false,
            today: date("2026-06-01"),
        };
        let cs = make_item("PI-1", "Soap", "SP", Some(Uom::Cs), None);
        let none = make_item("PI-2", "Soap", "SP", None, None);

        let mut filter = ItemFilter::default();
        assert!(filter.matches(&none, &ctx));
        filter.uom = Choice::Only(Uom::Cs);
        assert!(filter.matches(&cs, &ctx));
        assert!(!filter.matches(&none, &ctx));
    }

    #[test]
    fn effective_range_is_inclusive() {
        let headers = headers();
        let tracker = ChangeTracker::new();
        let ctx = FilterContext {
            headers: &headers,
            tracker: &tracker,
            editing: false,
            today: date("2026-06-01"),
        };
        let filter = ItemFilter {
            effective_from: Some(date("2026-02-01")),
            effective_to: Some(date("2026-02-28")),
            ..ItemFilter::default()
        };
        assert!(filter.matches(&make_item("a", "x", "", None, Some("2026-02-01")), &ctx));
        assert!(filter.matches(&make_item("b", "x", "", None, Some("2026-02-28")), &ctx));
        assert!(!filter.matches(&make_item("c", "x", "", None, Some("2026-03-01")), &ctx));
        assert!(!filter.matches(&make_item("d", "x", "", None, None), &ctx));
    }

    #[test]
    fn customer_and_status_resolve_through_header() {
        let headers = headers();
        let tracker = ChangeTracker::new();
        let ctx = FilterContext {
            headers: &headers,
            tracker: &tracker,
            editing: false,
            today: date("2026-06-01"),
        };
        let item = make_item("PI-1", "Soap", "SP", None, None);
        let mut filter = ItemFilter {
            customer_id: Some("C-0001".into()),
            status: Choice::Only(HeaderStatus::Active),
            ..ItemFilter::default()
        };
        assert!(filter.matches(&item, &ctx));
        filter.customer_id = Some("C-0002".into());
        assert!(!filter.matches(&item, &ctx));
    }

    #[test]
    fn modified_only_applies_only_while_editing() {
        let headers = headers();
        let mut tracker = ChangeTracker::new();
        tracker.mark_modified(&RowId::new("PI-1"), Field::UnitPrice);
        let dirty = make_item("PI-1", "Soap", "SP", None, None);
        let clean = make_item("PI-2", "Soap", "SP", None, None);
        let filter = ItemFilter {
            modified_only: true,
            ..ItemFilter::default()
        };

        let viewing = FilterContext {
            headers: &headers,
            tracker: &tracker,
            editing: false,
            today: date("2026-06-01"),
        };
        assert!(filter.matches(&clean, &viewing));

        let editing = FilterContext {
            editing: true,
            ..viewing
        };
        assert!(filter.matches(&dirty, &editing));
        assert!(!filter.matches(&clean, &editing));
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut filter = ItemFilter {
            search: "x".into(),
            uom: Choice::Only(Uom::Kg),
            modified_only: true,
            ..ItemFilter::default()
        };
        assert!(!filter.is_empty());
        filter.clear();
        assert!(filter.is_empty());
    }
}
