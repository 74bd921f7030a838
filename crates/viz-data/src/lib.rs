//! Ledger ingestion layer for ledger-viz.
//!
//! Responsible for cutting the ledger block out of a model response,
//! parsing it into records, aggregating categories for the proportion chart,
//! picking the largest expenses and running the top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod parser;

pub use viz_core as core;
