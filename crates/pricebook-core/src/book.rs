//! The full pricing data set: customers, price headers, and line items.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ErrorCode;
use crate::model::{Customer, PriceHeader, PriceItem, RowId, dates_ordered};

/// Id counters; each kind of record has its own sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequences {
    pub customer: u64,
    pub header: u64,
    pub item: u64,
}

/// Errors from header and customer configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    #[error("customer '{0}' not found")]
    CustomerNotFound(String),

    #[error("price header '{0}' not found")]
    HeaderNotFound(String),

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("expiration {expiration} must be after effective date {effective}")]
    DateOrder {
        effective: NaiveDate,
        expiration: NaiveDate,
    },
}

impl BookError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::CustomerNotFound(_) => ErrorCode::CustomerNotFound,
            Self::HeaderNotFound(_) => ErrorCode::HeaderNotFound,
            Self::Empty { .. } => ErrorCode::RequiredFieldMissing,
            Self::DateOrder { .. } => ErrorCode::DateOrderViolation,
        }
    }
}

/// Fields needed to configure a new price header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHeader {
    pub customer_id: String,
    pub name: String,
    pub currency: String,
    pub effective_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
}

/// In-memory pricing data set, loaded from and saved to a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBook {
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub headers: Vec<PriceHeader>,
    #[serde(default)]
    pub items: Vec<PriceItem>,
    #[serde(default)]
    pub sequences: Sequences,
}

impl PriceBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a customer and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::Empty`] when the code or name is blank.
    pub fn add_customer(&mut self, code: &str, name: &str) -> Result<String, BookError> {
        let code = code.trim();
        let name = name.trim();
        if code.is_empty() {
            return Err(BookError::Empty { field: "code" });
        }
        if name.is_empty() {
            return Err(BookError::Empty { field: "name" });
        }
        self.sequences.customer += 1;
        let id = format!("C-{:04}", self.sequences.customer);
        self.customers.push(Customer {
            id: id.clone(),
            code: code.to_string(),
            name: name.to_string(),
            active: true,
        });
        info!(customer = %id, "customer added");
        Ok(id)
    }

    /// Configure a new price header for an existing customer.
    ///
    /// # Errors
    ///
    /// Returns [`BookError`] when the customer is unknown, the name or
    /// currency is blank, or the dates are out of order.
    pub fn add_header(&mut self, new: NewHeader) -> Result<String, BookError> {
        if self.customer(&new.customer_id).is_none() {
            return Err(BookError::CustomerNotFound(new.customer_id));
        }
        let name = new.name.trim();
        if name.is_empty() {
            return Err(BookError::Empty { field: "name" });
        }
        let currency = new.currency.trim().to_ascii_uppercase();
        if currency.is_empty() {
            return Err(BookError::Empty { field: "currency" });
        }
        if let Some(expiration) = new.expiration_date
            && !dates_ordered(Some(new.effective_date), Some(expiration))
        {
            return Err(BookError::DateOrder {
                effective: new.effective_date,
                expiration,
            });
        }

        self.sequences.header += 1;
        let id = format!("PH-{:04}", self.sequences.header);
        self.headers.push(PriceHeader {
            id: id.clone(),
            customer_id: new.customer_id,
            name: name.to_string(),
            currency,
            effective_date: new.effective_date,
            expiration_date: new.expiration_date,
        });
        info!(header = %id, "price header added");
        Ok(id)
    }

    #[must_use]
    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn header(&self, id: &str) -> Option<&PriceHeader> {
        self.headers.iter().find(|h| h.id == id)
    }

    /// Headers keyed by id, as used by filters and the deletion guard.
    #[must_use]
    pub fn header_index(&self) -> BTreeMap<String, PriceHeader> {
        self.headers
            .iter()
            .map(|h| (h.id.clone(), h.clone()))
            .collect()
    }

    #[must_use]
    pub fn item(&self, id: &RowId) -> Option<&PriceItem> {
        self.items.iter().find(|i| i.id == *id)
    }

    /// Line items of one header, or all items when `header_id` is `None`.
    #[must_use]
    pub fn items_for(&self, header_id: Option<&str>) -> Vec<PriceItem> {
        self.items
            .iter()
            .filter(|i| header_id.is_none_or(|h| i.header_id == h))
            .cloned()
            .collect()
    }

    /// Next store-assigned id for a line item.
    pub fn allocate_item_id(&mut self) -> RowId {
        self.sequences.item += 1;
        RowId::persisted(self.sequences.item)
    }
}
