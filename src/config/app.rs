//! Application configuration loading from config.toml
//!
//! Every key is optional; anything missing takes the default shown in
//! [`AppConfig::default`]. The backend URL can be overridden from the
//! environment so the same file works against several deployments.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Environment variable that overrides [`AppConfig::backend_url`].
pub const BACKEND_URL_ENV: &str = "LEDGER_BACKEND_URL";

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the backend REST API
    pub backend_url: String,
    /// Fiscal year used when none is given
    pub default_year: i32,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Rendering options
    pub display: DisplayConfig,
}

/// How dates and balances are rendered
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// date-fns style pattern, e.g. `dd/MM/yyyy`
    pub date_format: String,
    /// Text shown for missing or invalid dates
    pub date_fallback: String,
    /// Include accounts with a zero balance in project views
    pub include_zero_balances: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000/".to_string(),
            default_year: 2025,
            request_timeout_secs: 30,
            display: DisplayConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: crate::core::dates::DEFAULT_DATE_PATTERN.to_string(),
            date_fallback: crate::core::dates::DEFAULT_DATE_FALLBACK.to_string(),
            include_zero_balances: false,
        }
    }
}

impl AppConfig {
    /// Replaces the backend URL when `backend_url` holds a non-blank value.
    #[must_use]
    pub fn with_backend_override(mut self, backend_url: Option<String>) -> Self {
        if let Some(url) = backend_url.map(|url| url.trim().to_string())
            && !url.is_empty()
        {
            debug!(backend_url = %url, "Backend URL overridden from environment");
            self.backend_url = url;
        }
        self
    }
}

/// Parses configuration from TOML text.
///
/// # Errors
/// Returns an error if the TOML syntax is invalid or a key has the wrong type.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file and applies the environment override.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;

    Ok(parse_config(&contents)?.with_backend_override(std::env::var(BACKEND_URL_ENV).ok()))
}

/// Loads configuration from the default location (./config.toml).
///
/// A missing file is not an error: defaults are used instead.
pub fn load_default_config() -> Result<AppConfig> {
    let path = Path::new(DEFAULT_CONFIG_PATH);
    if path.exists() {
        load_config(path)
    } else {
        debug!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
        Ok(AppConfig::default().with_backend_override(std::env::var(BACKEND_URL_ENV).ok()))
    }
}
