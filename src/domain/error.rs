//! Domain-level error types for property-notes-extractor.
//!
//! All errors are typed with `thiserror`. Network failures are classified
//! by the API client and then folded into the two service-level variants
//! (`ExtractionFailed`, `RepositoryUnavailable`) before they reach the
//! workflow controller.

use thiserror::Error;

use super::run_state::RunPath;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// The AI extraction service could not produce results for a batch.
    #[error("Extraction failed: {message}")]
    ExtractionFailed {
        message: String,
        #[source]
        source: Option<Box<AppError>>,
    },

    /// The notes repository could not be reached or rejected the call.
    #[error("Repository unavailable: {message}")]
    RepositoryUnavailable {
        message: String,
        #[source]
        source: Option<Box<AppError>>,
    },

    /// Network unreachable, connection reset, or request build failure.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Server answered with a non-success status.
    #[error("Server responded with {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// A workflow run ended in its failed state.
    #[error("{path} run failed: {message}")]
    RunFailed { path: RunPath, message: String },

    /// Invalid or inconsistent data.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// CSV serialization failed.
    #[error("CSV error: {message}")]
    Csv {
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Classify a `reqwest` error as transport or malformed body.
    pub fn transport(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::MalformedResponse {
                message: err.to_string(),
            };
        }
        Self::Transport {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Wrap a lower-level failure as an extraction failure.
    pub fn extraction_failed(err: Self) -> Self {
        Self::ExtractionFailed {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Wrap a lower-level failure as a repository failure.
    pub fn repository_unavailable(err: Self) -> Self {
        Self::RepositoryUnavailable {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a CSV error.
    pub fn csv(err: csv::Error) -> Self {
        Self::Csv {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
