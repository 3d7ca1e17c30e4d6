//! Spreadsheet-style editing over a price sheet, independent of any
//! terminal or GUI toolkit.

pub mod columns;
pub mod editor;
pub mod selection;

pub use columns::{Column, default_columns};
pub use editor::{
    EditBuffer, GridCommand, GridEditor, GridEvent, Move, PasteReport, StatusLevel, StatusMessage,
};
pub use selection::{CellPos, Selection};
