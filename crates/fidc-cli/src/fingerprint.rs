//! Fingerprinting of selected files before upload
//!
//! Hashing a large remittance file is the one CPU-bound step of a
//! submission, so it runs as a single blocking task off the async runtime.
//! No partial progress is exposed.

use crate::error::FingerprintError;
use crate::submission::SelectedFile;
use async_trait::async_trait;
use fidc_common::fingerprint::fingerprint_bytes;

/// Computes the content fingerprint of a selected file
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    async fn fingerprint(&self, file: &SelectedFile) -> Result<String, FingerprintError>;
}

/// SHA-256 fingerprinter over the full file contents
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Fingerprinter;

#[async_trait]
impl Fingerprinter for Sha256Fingerprinter {
    async fn fingerprint(&self, file: &SelectedFile) -> Result<String, FingerprintError> {
        let contents = file.contents();
        tokio::task::spawn_blocking(move || fingerprint_bytes(&contents))
            .await
            .map_err(|e| FingerprintError::new(file.name(), e.to_string()))
    }
}
