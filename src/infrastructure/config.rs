//! Configuration file management.
//!
//! Handles loading the TOML configuration file and applying the
//! endpoint environment override.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result, ENDPOINT_ENV};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# Property Notes Extractor Configuration
# Auto-generated - edit as needed

[api]
# Base URL of the notes backend (overridden by PROPERTY_NOTES_API_ENDPOINT)
base_url = "http://localhost:3000"

# Request timeout in seconds (optional, no timeout by default)
# timeout_secs = 60

[extraction]
# AI provider and model sent with every extraction request
provider = "openai"
model = "gpt-4o-mini"

# File with custom extraction rules (markdown or plain text)
# custom_rules_file = "/path/to/rules.md"

[export]
# File name used when downloading prepared CSV data
csv_filename = "ai_extracted_notes.csv"

# Directory for downloaded files (optional, defaults to current directory)
# output_dir = "/path/to/exports"
"#;

/// Load configuration from the default file (or defaults), then apply the
/// endpoint environment variable.
///
/// # Errors
/// Returns error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<AppConfig> {
    load_config_with_endpoint(
        &AppConfig::config_file_path(),
        std::env::var(ENDPOINT_ENV).ok(),
    )
}

fn load_config_with_endpoint(config_path: &Path, endpoint: Option<String>) -> Result<AppConfig> {
    let config = if config_path.exists() {
        load_config_from_file(config_path)?
    } else {
        AppConfig::default()
    };

    Ok(config.with_endpoint(endpoint))
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Create the default configuration file if it doesn't exist.
///
/// Returns the path and whether a new file was written.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists() -> Result<(PathBuf, bool)> {
    let config_path = AppConfig::config_file_path();
    let created = write_default_config(&config_path)?;
    Ok((config_path, created))
}

fn write_default_config(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    fs::write(config_path, DEFAULT_CONFIG)
        .map_err(|e| AppError::io("Failed to create default config", e))?;

    tracing::info!(path = %config_path.display(), "Created default configuration");
    Ok(true)
}

/// Custom rules for a run: inline text wins over a rules file, which wins
/// over the configured file. No source gives empty rules.
///
/// # Errors
/// Returns error if the chosen file cannot be read.
pub fn resolve_custom_rules(
    inline: Option<&str>,
    rules_file: Option<&Path>,
    configured_file: Option<&Path>,
) -> Result<String> {
    if let Some(rules) = inline {
        return Ok(rules.to_string());
    }

    match rules_file.or(configured_file) {
        Some(path) => read_rules_file(path),
        None => Ok(String::new()),
    }
}

fn read_rules_file(path: &Path) -> Result<String> {
    tracing::debug!(path = %path.display(), "Reading custom rules");
    fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read rules file: {}", path.display()), e))
}
