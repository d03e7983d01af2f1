//! Error types shared by the import tracking crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Main error type for the common crate
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch { expected: String, actual: String },

    #[error("Snapshots belong to different imports: {previous} vs {next}")]
    DifferentImport { previous: String, next: String },

    #[error("Import {id}: attempt counter went backwards ({previous} -> {next})")]
    AttemptsDecreased { id: String, previous: u32, next: u32 },

    #[error("Import {id}: creation timestamp changed between snapshots")]
    CreatedAtChanged { id: String },

    #[error("Import {id}: event log was rewritten at position {position}")]
    EventLogRewritten { id: String, position: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}
