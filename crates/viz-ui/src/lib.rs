//! Terminal UI layer for ledger-viz.
//!
//! Provides themes, the header and share-bar components, the report views
//! and the application event loop built on top of [`ratatui`].

pub mod app;
pub mod chart_view;
pub mod components;
pub mod themes;

pub use viz_core as core;
