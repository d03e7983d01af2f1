//! Import service access
//!
//! [`ImportRepository`] is the contract the rest of the crate codes against;
//! [`ApiClient`] is its HTTP implementation.

pub mod client;
pub mod endpoints;
pub mod repository;
pub mod types;

pub use client::ApiClient;
pub use repository::{CreateImportRequest, ImportRepository, ListQuery};
