//! Content fingerprints for submitted files
//!
//! A fingerprint is the lowercase hex SHA-256 digest of a file's complete
//! byte content. It travels with the upload as `fileHash` so the ingestion
//! side can trace and deduplicate exact byte payloads.

use crate::error::{CommonError, Result};
use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Compute the fingerprint of a complete byte buffer
pub fn fingerprint_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Check that `value` looks like a fingerprint produced by [`fingerprint_bytes`]
pub fn is_fingerprint(value: &str) -> bool {
    value.len() == FINGERPRINT_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Verify that data matches a previously recorded fingerprint
///
/// The comparison ignores ASCII case so digests recorded by servers that
/// upper-case hex still match.
pub fn verify_fingerprint(data: &[u8], expected: &str) -> Result<()> {
    let actual = fingerprint_bytes(data);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(CommonError::FingerprintMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}
