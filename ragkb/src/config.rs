//! Client configuration.
//!
//! The only value a deployment has to supply is the API base URL. Everything
//! else has a sensible default so the CLI works against a local backend out of
//! the box.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const STORAGE_DIR: &str = "ragkb";
const STORAGE_FILE: &str = "storage.json";

/// Errors raised while assembling a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("could not determine a configuration directory; pass --storage explicitly")]
    NoConfigDir,
}

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute base URL every endpoint path is appended to, without a trailing slash.
    pub api_base_url: String,
    /// Per-request timeout for ordinary calls. Streaming connections ignore it.
    pub timeout: Duration,
    /// Location of the durable client storage file.
    pub storage_path: PathBuf,
}

impl Config {
    /// Build a config for `api_base_url`, validating and normalising it.
    pub fn new(api_base_url: &str) -> Result<Self, ConfigError> {
        let storage_path = Self::default_storage_path().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            storage_path,
        })
    }

    /// Build a config that keeps its storage at an explicit path.
    pub fn with_storage(api_base_url: &str, storage_path: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            storage_path,
        })
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Default storage file: `<config_dir>/ragkb/storage.json`.
    pub fn default_storage_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(STORAGE_DIR).join(STORAGE_FILE))
    }
}

/// Trim trailing slashes and require an absolute http(s) URL.
fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a query or fragment".to_string()));
    }

    Ok(trimmed.to_string())
}
