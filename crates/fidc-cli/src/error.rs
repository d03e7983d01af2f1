//! Error types for the FIDC import CLI
//!
//! Every variant is meant to be shown to an operator as-is, so messages say
//! what went wrong and, where there is one, what to do next.

use fidc_common::{CommonError, ImportStatus};
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Fallback shown when the server gives no usable error message
pub const GENERIC_API_ERROR: &str = "Unexpected error while talking to the import service";

/// Content fingerprinting failed
///
/// Kept separate from [`CliError`] so a submission can carry it next to a
/// successful result: a missing fingerprint never blocks an upload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not fingerprint '{file_name}': {reason}")]
pub struct FingerprintError {
    pub file_name: String,
    pub reason: String,
}

impl FingerprintError {
    pub fn new(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            reason: reason.into(),
        }
    }
}

/// Comprehensive error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Form rejected before any request was made
    #[error("{0}")]
    Validation(String),

    /// Selected file could not be read
    #[error("Cannot read file '{path}': {source}. Check the path and your read permissions.")]
    FileUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// The server answered with an error status
    #[error("Import service error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Single-import lookup found nothing
    #[error("Import '{0}' not found. Run 'fidc imports list' to see existing imports.")]
    ImportNotFound(String),

    /// The server answered successfully but the payload could not be understood
    #[error("Unexpected response from import service: {0}")]
    InvalidPayload(String),

    /// Reprocess refused by the local status guard
    #[error("Import '{id}' is still {status}; only finished imports can be reprocessed. Use --force to retry anyway.")]
    ReprocessRejected { id: String, status: ImportStatus },

    /// HTTP request failed before a response arrived
    #[error("Network request failed: {0}. Check your connection and the server URL.")]
    Http(#[from] reqwest::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or config file.")]
    Config(String),

    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to parse config file: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error(transparent)]
    Common(#[from] CommonError),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an API error from a status code and an optional server message
    pub fn api(status: u16, message: Option<String>) -> Self {
        Self::Api {
            status,
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_API_ERROR.to_string()),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid payload error
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    /// Whether this is the distinct "import does not exist" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, CliError::ImportNotFound(_))
    }
}
