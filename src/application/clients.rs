//! Ports to the external services the workflow depends on.
//!
//! The workflow controller only sees these traits, so it can be driven by
//! the HTTP client in production and by recording mocks in tests.

use async_trait::async_trait;

use crate::domain::{AiModel, ExtractedFields, PropertyNote, Result};

/// AI extraction service.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Extract structured fields for each raw text.
    ///
    /// On success the result has exactly one entry per input, in input
    /// order. An empty batch returns an empty result without a call.
    async fn extract(
        &self,
        raw_texts: &[String],
        custom_rules: &str,
        ai_model: AiModel,
    ) -> Result<Vec<ExtractedFields>>;
}

/// Backing store of property notes.
#[async_trait]
pub trait NotesRepository: Send + Sync {
    /// List every note, in repository order.
    async fn list_notes(&self) -> Result<Vec<PropertyNote>>;

    /// Extract and persist fields for the given notes server-side.
    ///
    /// Gives no per-id result; callers re-list to observe the outcome.
    async fn bulk_apply(&self, ids: &[i64], ai_model: AiModel, custom_rules: &str) -> Result<()>;

    /// Clear the store back to its seed state.
    async fn reset(&self) -> Result<()>;
}

/// Listing rewrite suggestions.
#[async_trait]
pub trait SuggestionClient: Send + Sync {
    async fn suggest(&self, input: &str) -> Result<String>;
}
