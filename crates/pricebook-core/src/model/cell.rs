//! Typed cell values and raw-input conversion.
//!
//! Every cell commit passes through [`parse_cell`]: prices fall back to zero
//! on unparseable input, dates normalize to ISO form, select cells parse
//! their enumeration, and text is trimmed.

use chrono::{DateTime, NaiveDate};
use std::str::FromStr;

use super::item::{CellKind, Field, Uom};

/// Typed value of a single grid cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Price(Option<f64>),
    Date(Option<NaiveDate>),
    Uom(Option<Uom>),
}

/// Raw input that cannot be converted for its column.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CellError {
    #[error("'{raw}' is not a date (expected YYYY-MM-DD)")]
    InvalidDate { raw: String },

    #[error("'{raw}' is not a unit of measure")]
    InvalidUom { raw: String },

    #[error("value does not fit column {field}")]
    KindMismatch { field: Field },
}

impl CellValue {
    /// Text shown in the grid and written to clipboard/exports.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Price(Some(v)) => format!("{v:.2}"),
            Self::Date(Some(d)) => d.format("%Y-%m-%d").to_string(),
            Self::Uom(Some(u)) => u.as_str().to_string(),
            Self::Price(None) | Self::Date(None) | Self::Uom(None) => String::new(),
        }
    }
}

/// Round to whole cents.
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert raw cell input into the typed value for `field`.
///
/// # Errors
///
/// Returns [`CellError::InvalidDate`] or [`CellError::InvalidUom`] when a
/// non-empty date or unit cannot be recognized. Prices never fail.
pub fn parse_cell(field: Field, raw: &str) -> Result<CellValue, CellError> {
    let trimmed = raw.trim();
    match field.kind() {
        CellKind::Text => Ok(CellValue::Text(trimmed.to_string())),
        CellKind::Price => {
            if trimmed.is_empty() && field == Field::MinimumPrice {
                Ok(CellValue::Price(None))
            } else {
                Ok(CellValue::Price(Some(parse_price(trimmed))))
            }
        }
        CellKind::Date => {
            if trimmed.is_empty() {
                return Ok(CellValue::Date(None));
            }
            parse_date(trimmed)
                .map(|d| CellValue::Date(Some(d)))
                .ok_or_else(|| CellError::InvalidDate {
                    raw: trimmed.to_string(),
                })
        }
        CellKind::Select => {
            if trimmed.is_empty() {
                return Ok(CellValue::Uom(None));
            }
            Uom::from_str(trimmed)
                .map(|u| CellValue::Uom(Some(u)))
                .map_err(|_| CellError::InvalidUom {
                    raw: trimmed.to_string(),
                })
        }
    }
}

/// Parse a price, tolerating currency symbols and thousands separators.
///
/// Anything that does not round to a finite number of cents becomes `0.0`.
#[must_use]
pub fn parse_price(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | ' ' | '_'))
        .collect();
    cleaned
        .parse::<f64>()
        .map(round_cents)
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Normalize the accepted date spellings to a calendar date.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}
