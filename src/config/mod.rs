//! Configuration management for the loan ledger engine.
//!
//! Configuration is loaded from environment variables (with `.env` support)
//! and carries defaults for every optional knob, so a bare environment still
//! yields a working engine.

use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,

    /// Multiple of gross monthly salary used by the default loan ceiling policy
    pub standard_max_multiple: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let standard_max_multiple = match env::var("STANDARD_MAX_MULTIPLE") {
            Ok(raw) => raw.parse::<u32>().ok().filter(|m| *m > 0).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "STANDARD_MAX_MULTIPLE must be a positive integer, got '{}'",
                    raw
                ))
            })?,
            Err(_) => 3,
        };

        Ok(Config {
            log_level,
            standard_max_multiple,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: "info".to_string(),
            standard_max_multiple: 3,
        }
    }
}
