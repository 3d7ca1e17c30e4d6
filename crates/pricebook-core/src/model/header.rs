use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::item::ParseEnumError;

/// A customer that price sheets are negotiated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A customer price sheet: the parent of a set of price line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHeader {
    pub id: String,
    pub customer_id: String,
    pub name: String,
    pub currency: String,
    pub effective_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,
}

/// Lifecycle of a price header relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderStatus {
    Pending,
    Active,
    Expired,
}

impl PriceHeader {
    /// Status of this header on `today`.
    #[must_use]
    pub fn status_on(&self, today: NaiveDate) -> HeaderStatus {
        if self.effective_date > today {
            HeaderStatus::Pending
        } else if self.expiration_date.is_some_and(|exp| exp < today) {
            HeaderStatus::Expired
        } else {
            HeaderStatus::Active
        }
    }
}

impl HeaderStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for HeaderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeaderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "future" => Ok(Self::Pending),
            "active" | "current" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

const fn default_true() -> bool {
    true
}
