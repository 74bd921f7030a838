//! Runtime layer for ledger-viz.
//!
//! Builds the classification prompt, talks to the completion backend and
//! runs the classify → save → analyse pipeline on a background task.

pub mod backend;
pub mod orchestrator;
pub mod prompt;

pub use backend::{CompletionBackend, MockBackend, OpenAiCompatibleBackend};
pub use orchestrator::{
    check_connection, PipelineConfig, PipelineEvent, PipelineHandle, PipelineMode,
    PipelineOrchestrator,
};
pub use viz_core as core;
pub use viz_data as data;
