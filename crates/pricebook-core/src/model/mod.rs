//! Domain types: customers, price headers, price line items, and cells.

pub mod cell;
pub mod header;
pub mod item;
pub mod row_id;

pub use cell::{CellError, CellValue, parse_cell, round_cents};
pub use header::{Customer, HeaderStatus, PriceHeader};
pub use item::{CellKind, Field, ParseEnumError, PriceItem, Uom, dates_ordered};
pub use row_id::RowId;
