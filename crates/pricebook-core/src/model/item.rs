use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::cell::{CellError, CellValue};
use super::row_id::RowId;

/// Unit of measure a price is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Uom {
    Ea,
    Cs,
    Bx,
    Pl,
    Lb,
    Kg,
    Gal,
    L,
}

impl Uom {
    pub const ALL: [Self; 8] = [
        Self::Ea,
        Self::Cs,
        Self::Bx,
        Self::Pl,
        Self::Lb,
        Self::Kg,
        Self::Gal,
        Self::L,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ea => "EA",
            Self::Cs => "CS",
            Self::Bx => "BX",
            Self::Pl => "PL",
            Self::Lb => "LB",
            Self::Kg => "KG",
            Self::Gal => "GAL",
            Self::L => "L",
        }
    }
}

/// Editable columns of a price line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    ProductCode,
    ProductName,
    UnitPrice,
    MinimumPrice,
    ContainerSize,
    Uom,
    EffectiveDate,
    ExpirationDate,
    Notes,
}

/// How a cell's raw input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Text,
    Price,
    Date,
    Select,
}

impl Field {
    pub const ALL: [Self; 9] = [
        Self::ProductCode,
        Self::ProductName,
        Self::UnitPrice,
        Self::MinimumPrice,
        Self::ContainerSize,
        Self::Uom,
        Self::EffectiveDate,
        Self::ExpirationDate,
        Self::Notes,
    ];

    /// Wire name (camelCase) used in JSON and tabular exports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductCode => "productCode",
            Self::ProductName => "productName",
            Self::UnitPrice => "unitPrice",
            Self::MinimumPrice => "minimumPrice",
            Self::ContainerSize => "containerSize",
            Self::Uom => "uom",
            Self::EffectiveDate => "effectiveDate",
            Self::ExpirationDate => "expirationDate",
            Self::Notes => "notes",
        }
    }

    /// Column title shown to people.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::ProductCode => "Product Code",
            Self::ProductName => "Product Name",
            Self::UnitPrice => "Unit Price",
            Self::MinimumPrice => "Minimum Price",
            Self::ContainerSize => "Container Size",
            Self::Uom => "UOM",
            Self::EffectiveDate => "Effective Date",
            Self::ExpirationDate => "Expiration Date",
            Self::Notes => "Notes",
        }
    }

    #[must_use]
    pub const fn kind(self) -> CellKind {
        match self {
            Self::UnitPrice | Self::MinimumPrice => CellKind::Price,
            Self::EffectiveDate | Self::ExpirationDate => CellKind::Date,
            Self::Uom => CellKind::Select,
            Self::ProductCode | Self::ProductName | Self::ContainerSize | Self::Notes => {
                CellKind::Text
            }
        }
    }

    #[must_use]
    pub const fn is_price(self) -> bool {
        matches!(self.kind(), CellKind::Price)
    }
}

/// A price line item: one product price on a customer's price sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceItem {
    pub id: RowId,
    pub header_id: String,
    #[serde(default)]
    pub product_code: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_price: Option<f64>,
    #[serde(default)]
    pub container_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom: Option<Uom>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

impl PriceItem {
    /// An empty row bound to `header_id`.
    pub fn blank(id: RowId, header_id: impl Into<String>) -> Self {
        Self {
            id,
            header_id: header_id.into(),
            product_code: String::new(),
            product_name: String::new(),
            unit_price: 0.0,
            minimum_price: None,
            container_size: String::new(),
            uom: None,
            effective_date: None,
            expiration_date: None,
            notes: String::new(),
        }
    }

    /// Typed value currently held in `field`.
    #[must_use]
    pub fn get(&self, field: Field) -> CellValue {
        match field {
            Field::ProductCode => CellValue::Text(self.product_code.clone()),
            Field::ProductName => CellValue::Text(self.product_name.clone()),
            Field::UnitPrice => CellValue::Price(Some(self.unit_price)),
            Field::MinimumPrice => CellValue::Price(self.minimum_price),
            Field::ContainerSize => CellValue::Text(self.container_size.clone()),
            Field::Uom => CellValue::Uom(self.uom),
            Field::EffectiveDate => CellValue::Date(self.effective_date),
            Field::ExpirationDate => CellValue::Date(self.expiration_date),
            Field::Notes => CellValue::Text(self.notes.clone()),
        }
    }

    /// Store a typed value into `field`.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::KindMismatch`] when the value variant does not
    /// belong to the field's cell kind.
    pub fn set(&mut self, field: Field, value: CellValue) -> Result<(), CellError> {
        match (field, value) {
            (Field::ProductCode, CellValue::Text(v)) => self.product_code = v,
            (Field::ProductName, CellValue::Text(v)) => self.product_name = v,
            (Field::ContainerSize, CellValue::Text(v)) => self.container_size = v,
            (Field::Notes, CellValue::Text(v)) => self.notes = v,
            (Field::UnitPrice, CellValue::Price(v)) => self.unit_price = v.unwrap_or(0.0),
            (Field::MinimumPrice, CellValue::Price(v)) => self.minimum_price = v,
            (Field::Uom, CellValue::Uom(v)) => self.uom = v,
            (Field::EffectiveDate, CellValue::Date(v)) => self.effective_date = v,
            (Field::ExpirationDate, CellValue::Date(v)) => self.expiration_date = v,
            (field, _) => return Err(CellError::KindMismatch { field }),
        }
        Ok(())
    }

    /// Required fields that are not yet satisfied for this row to exist.
    #[must_use]
    pub fn missing_required(&self) -> Vec<Field> {
        let mut missing = Vec::new();
        if self.product_name.trim().is_empty() {
            missing.push(Field::ProductName);
        }
        if self.unit_price <= 0.0 {
            missing.push(Field::UnitPrice);
        }
        missing
    }

    /// True when the row's dates are ordered (or at least one is absent).
    #[must_use]
    pub fn dates_ordered(&self) -> bool {
        dates_ordered(self.effective_date, self.expiration_date)
    }
}

/// Expiration must fall strictly after the effective date when both are set.
#[must_use]
pub fn dates_ordered(effective: Option<NaiveDate>, expiration: Option<NaiveDate>) -> bool {
    match (effective, expiration) {
        (Some(from), Some(to)) => to > from,
        _ => true,
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Uom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl FromStr for Uom {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "ea" | "each" => Ok(Self::Ea),
            "cs" | "case" => Ok(Self::Cs),
            "bx" | "box" => Ok(Self::Bx),
            "pl" | "pallet" => Ok(Self::Pl),
            "lb" | "lbs" | "pound" => Ok(Self::Lb),
            "kg" | "kilogram" => Ok(Self::Kg),
            "gal" | "gallon" => Ok(Self::Gal),
            "l" | "liter" | "litre" => Ok(Self::L),
            _ => Err(ParseEnumError {
                expected: "uom",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Field {
    type Err = ParseEnumError;

    /// Accepts wire names, titles, and snake/kebab spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squashed: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match squashed.as_str() {
            "productcode" | "code" | "sku" => Ok(Self::ProductCode),
            "productname" | "name" | "product" => Ok(Self::ProductName),
            "unitprice" | "price" => Ok(Self::UnitPrice),
            "minimumprice" | "minprice" => Ok(Self::MinimumPrice),
            "containersize" | "container" => Ok(Self::ContainerSize),
            "uom" | "unit" => Ok(Self::Uom),
            "effectivedate" | "effective" => Ok(Self::EffectiveDate),
            "expirationdate" | "expiration" | "expires" => Ok(Self::ExpirationDate),
            "notes" | "note" => Ok(Self::Notes),
            _ => Err(ParseEnumError {
                expected: "field",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Field, PriceItem, Uom};
    use crate::model::cell::CellValue;
    use crate::model::row_id::RowId;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn uom_parses_codes_and_long_names() {
        assert_eq!(Uom::from_str("cs").unwrap(), Uom::Cs);
        assert_eq!(Uom::from_str(" Gallon ").unwrap(), Uom::Gal);
        assert_eq!(Uom::from_str("EA").unwrap(), Uom::Ea);
        assert!(Uom::from_str("crate").is_err());
    }

    #[test]
    fn field_display_parse_roundtrips() {
        for field in Field::ALL {
            assert_eq!(Field::from_str(field.as_str()).unwrap(), field);
            assert_eq!(Field::from_str(field.title()).unwrap(), field);
        }
        assert_eq!(Field::from_str("unit_price").unwrap(), Field::UnitPrice);
    }

    #[test]
    fn item_serializes_with_camel_case_fields() {
        let mut item = PriceItem::blank(RowId::persisted(1), "PH-0001");
        item.product_name = "Degreaser".into();
        item.unit_price = 12.5;
        item.uom = Some(Uom::Gal);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["productName"], "Degreaser");
        assert_eq!(json["unitPrice"], 12.5);
        assert_eq!(json["uom"], "GAL");
        assert!(json.get("minimumPrice").is_none());
    }

    #[test]
    fn set_rejects_mismatched_value_kind() {
        let mut item = PriceItem::blank(RowId::temporary(1), "PH-0001");
        assert!(item.set(Field::UnitPrice, CellValue::Text("x".into())).is_err());
        item.set(Field::UnitPrice, CellValue::Price(None)).unwrap();
        assert!((item.unit_price - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_required_reports_name_and_price() {
        let mut item = PriceItem::blank(RowId::temporary(1), "PH-0001");
        assert_eq!(
            item.missing_required(),
            vec![Field::ProductName, Field::UnitPrice]
        );
        item.product_name = "  ".into();
        item.unit_price = 3.0;
        assert_eq!(item.missing_required(), vec![Field::ProductName]);
    }

    #[test]
    fn date_ordering_is_strict() {
        let mut item = PriceItem::blank(RowId::temporary(1), "PH-0001");
        item.effective_date = Some(date("2026-01-01"));
        assert!(item.dates_ordered());
        item.expiration_date = Some(date("2026-01-01"));
        assert!(!item.dates_ordered());
        item.expiration_date = Some(date("2026-01-02"));
        assert!(item.dates_ordered());
    }
}
