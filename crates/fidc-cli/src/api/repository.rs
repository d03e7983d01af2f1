//! Typed contract over the remote import service
//!
//! Controllers and views depend on [`ImportRepository`] rather than on the
//! HTTP client, so they can be driven against any implementation.

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use fidc_common::{ImportJob, Page};
use std::sync::Arc;

/// Paging parameters of a list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    /// Page number (1-indexed)
    pub page: u32,
    pub page_size: u32,
}

impl ListQuery {
    /// Build a query, clamping values into the accepted ranges
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// Everything the create endpoint receives in its multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateImportRequest {
    pub file_name: String,
    pub contents: Bytes,
    pub fidc_id: String,
    pub origem: Option<String>,
    pub tipo_banco: Option<String>,
    pub tipo_cnab: Option<String>,
    pub modalidade: Option<String>,
    pub cedente_id: Option<String>,
    /// Content fingerprint; absent when hashing failed
    pub file_hash: Option<String>,
}

impl CreateImportRequest {
    /// Text fields of the multipart form, in wire names
    ///
    /// Absent optional values are left out rather than sent empty.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("fidcId", self.fidc_id.clone())];

        let optional = [
            ("origem", &self.origem),
            ("tipoBanco", &self.tipo_banco),
            ("tipoCnab", &self.tipo_cnab),
            ("modalidade", &self.modalidade),
            ("cedenteId", &self.cedente_id),
            ("fileHash", &self.file_hash),
        ];

        fields.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.as_ref().map(|v| (name, v.clone()))),
        );

        fields
    }
}

/// Remote import service operations
///
/// The repository is the single writer of job state; callers only read
/// snapshots and issue one-shot commands whose effects show up on the next
/// read.
#[async_trait]
pub trait ImportRepository: Send + Sync {
    /// Fetch one page of imports
    async fn list(&self, query: ListQuery) -> Result<Page<ImportJob>>;

    /// Upload a file and its metadata, returning the new import id
    async fn create(&self, request: CreateImportRequest) -> Result<String>;

    /// Fetch one import with its full event log
    ///
    /// A missing import is reported as `CliError::ImportNotFound`.
    async fn get(&self, id: &str) -> Result<ImportJob>;

    /// Ask the service to run the import again
    async fn reprocess(&self, id: &str) -> Result<()>;
}

#[async_trait]
impl<R: ImportRepository + ?Sized> ImportRepository for Arc<R> {
    async fn list(&self, query: ListQuery) -> Result<Page<ImportJob>> {
        (**self).list(query).await
    }

    async fn create(&self, request: CreateImportRequest) -> Result<String> {
        (**self).create(request).await
    }

    async fn get(&self, id: &str) -> Result<ImportJob> {
        (**self).get(id).await
    }

    async fn reprocess(&self, id: &str) -> Result<()> {
        (**self).reprocess(id).await
    }
}
