//! pricebook-core library.
//!
//! Customer price sheets with session-scoped editing: every cell commit,
//! bulk edit, and deletion is tracked against a baseline until the sheet
//! is saved back into the [`book::PriceBook`].
//!
//! # Conventions
//!
//! - **Errors**: one `thiserror` enum per concern, each mapping to an
//!   [`error::ErrorCode`]. `anyhow::Result` only at config loading.
//! - **Logging**: `tracing` macros (`debug!` per cell, `info!` per session
//!   event, `warn!` for rejected work).

pub mod book;
pub mod config;
pub mod error;
pub mod exchange;
pub mod filter;
pub mod grid;
pub mod guard;
pub mod lock;
pub mod model;
pub mod sheet;
pub mod store;
pub mod tracker;

pub use book::PriceBook;
pub use error::ErrorCode;
pub use sheet::{EditError, PriceSheet};
