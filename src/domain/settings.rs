//! Application configuration model.
//!
//! Holds the API endpoint, the default extraction options and the CSV
//! export settings, all with serde defaults so a partial file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::models::{AiModel, AiProvider, ModelName};

/// Environment variable that overrides `api.base_url`.
pub const ENDPOINT_ENV: &str = "PROPERTY_NOTES_API_ENDPOINT";

/// Backend endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the endpoint paths are appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds. Unset means the transport default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

/// Default extraction options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub provider: AiProvider,

    #[serde(default)]
    pub model: ModelName,

    /// File whose contents are used as custom rules when none are given.
    #[serde(default)]
    pub custom_rules_file: Option<PathBuf>,
}

impl ExtractionConfig {
    #[must_use]
    pub const fn ai_model(&self) -> AiModel {
        AiModel {
            provider: self.provider,
            model: self.model,
        }
    }
}

/// CSV export configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_csv_filename")]
    pub csv_filename: String,

    /// Directory for downloaded files. Defaults to the working directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_filename: default_csv_filename(),
            output_dir: None,
        }
    }
}

fn default_csv_filename() -> String {
    "ai_extracted_notes.csv".to_string()
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

impl AppConfig {
    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".property-notes-extractor")
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Where a downloaded CSV lands when no explicit path is given.
    #[must_use]
    pub fn csv_output_path(&self) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(&self.export.csv_filename)
    }

    /// Apply an endpoint override, if any.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        if let Some(url) = endpoint.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
        self
    }
}
