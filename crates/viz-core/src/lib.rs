//! Shared building blocks for ledger-viz.
//!
//! Holds the ledger data model, display labels, errors, number formatting,
//! the [`sink::LogSink`] used for user-facing output, and CLI settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod sink;

pub use error::{LineErrorKind, Result, VizError};
