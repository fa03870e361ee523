//! Infrastructure layer - external adapters (HTTP, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod api_client;
pub mod config;

pub use api_client::ApiClient;
pub use config::{ensure_config_exists, load_config, resolve_custom_rules};
