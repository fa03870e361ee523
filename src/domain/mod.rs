//! Domain layer - core types and state.
//!
//! This layer contains the note and extraction models, the selection and
//! run-state machines, configuration types and errors, without any I/O.

pub mod error;
pub mod models;
pub mod run_state;
pub mod selection;
pub mod settings;

pub use error::{AppError, Result};
pub use models::{
    AiModel, ConfidenceSummary, ExtractedFields, ExtractionOptions, ModelName, PropertyNote,
};
pub use run_state::{RunOutcome, RunPath, RunState, SkipReason};
pub use selection::{SelectionModel, SelectionSet};
pub use settings::{ApiConfig, AppConfig, ENDPOINT_ENV};
