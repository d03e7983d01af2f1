//! Configuration management for the FIDC import CLI
//!
//! Settings are layered: built-in defaults, then the TOML config file, then
//! environment variables. Command-line flags are applied last by `main`.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Default import service URL.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Default timeout for API requests in seconds. Uploads of large CNAB batches
/// go through the same client, hence the generous value.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 120;

/// Default polling interval while any listed import is still running.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default number of imports per list page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size the list endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Keys accepted by `fidc config get/set`.
pub const CONFIG_KEYS: &[&str] = &[
    "server_url",
    "api_timeout_secs",
    "poll_interval_secs",
    "page_size",
];

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Import service base URL
    pub server_url: String,

    /// Request timeout in seconds
    pub api_timeout_secs: u64,

    /// Seconds between list refreshes while polling
    pub poll_interval_secs: u64,

    /// Imports per list page
    pub page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Location of the config file
    ///
    /// `FIDC_CONFIG` wins; otherwise `<config dir>/fidc/config.toml`.
    pub fn file_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("FIDC_CONFIG") {
            return Ok(PathBuf::from(path));
        }

        Ok(dirs::config_dir()
            .ok_or_else(|| CliError::config("Could not determine config directory"))?
            .join("fidc")
            .join("config.toml"))
    }

    /// Load the full layered configuration
    pub fn load() -> Result<Self> {
        let path = Self::file_path()?;
        let base = Self::from_file(&path)?.unwrap_or_default();
        base.merge_env(|key| std::env::var(key).ok())
    }

    /// Read a config file, returning `None` when it does not exist
    pub fn from_file(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(Some(config.normalized()))
    }

    /// Write this configuration as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply `FIDC_*` overrides obtained through `lookup`
    pub fn merge_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FIDC_SERVER_URL") {
            self.set("server_url", &url)?;
        }

        if let Some(timeout) = lookup("FIDC_API_TIMEOUT_SECS") {
            self.set("api_timeout_secs", &timeout)?;
        }

        if let Some(interval) = lookup("FIDC_POLL_INTERVAL_SECS") {
            self.set("poll_interval_secs", &interval)?;
        }

        if let Some(size) = lookup("FIDC_PAGE_SIZE") {
            self.set("page_size", &size)?;
        }

        Ok(self.normalized())
    }

    /// Read one setting by key
    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            "server_url" => Ok(self.server_url.clone()),
            "api_timeout_secs" => Ok(self.api_timeout_secs.to_string()),
            "poll_interval_secs" => Ok(self.poll_interval_secs.to_string()),
            "page_size" => Ok(self.page_size.to_string()),
            _ => Err(unknown_key(key)),
        }
    }

    /// Change one setting by key, validating the value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server_url" => {
                let url = value.trim().trim_end_matches('/');
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(CliError::config(format!(
                        "server_url must start with http:// or https://, got '{}'",
                        value
                    )));
                }
                self.server_url = url.to_string();
            },
            "api_timeout_secs" => self.api_timeout_secs = parse_number(key, value)?,
            "poll_interval_secs" => self.poll_interval_secs = parse_number(key, value)?,
            "page_size" => self.page_size = parse_number(key, value)?,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Clamp values into their accepted ranges
    fn normalized(mut self) -> Self {
        self.server_url = self.server_url.trim_end_matches('/').to_string();
        self.api_timeout_secs = self.api_timeout_secs.max(1);
        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::config(format!("{} must be a positive number, got '{}'", key, value)))
}

fn unknown_key(key: &str) -> CliError {
    CliError::config(format!(
        "Unknown config key: {} (expected one of: {})",
        key,
        CONFIG_KEYS.join(", ")
    ))
}
