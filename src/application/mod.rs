//! Application layer - use cases and orchestration.
//!
//! This layer contains the extraction workflow controller, the ports it
//! depends on, CSV export and output formatting.

pub mod clients;
pub mod csv_export;
pub mod formatter;
pub mod workflow;

#[cfg(test)]
pub mod testing;

pub use clients::{ExtractionClient, NotesRepository, SuggestionClient};
pub use csv_export::CsvExporter;
pub use formatter::{
    format_confidence_banners, format_confidence_summary, format_extracted_json,
    format_notes_json, format_notes_table, format_run_state, OutputFormat,
};
pub use workflow::WorkflowController;
