//! FIDC Common Library
//!
//! Shared types, utilities, and error handling for the import tracking tools.
//!
//! # Overview
//!
//! This crate provides the pieces that do not depend on the HTTP surface:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Fingerprints**: Content hashing of submitted files
//! - **Types**: The import job model, its statuses and snapshot checks
//! - **Logging**: Subscriber initialisation shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use fidc_common::fingerprint::fingerprint_bytes;
//!
//! let digest = fingerprint_bytes(b"HEADER;LOTE;001");
//! assert_eq!(digest.len(), 64);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
pub use types::{EventStatus, EventTone, ImportEvent, ImportJob, ImportStatus, Page};
