//! HTTP client for the import service
//!
//! Implements [`ImportRepository`] over reqwest. Responses are normalized
//! here and snapshot inconsistencies are logged, never fixed up.

use crate::api::endpoints;
use crate::api::repository::{CreateImportRequest, ImportRepository, ListQuery};
use crate::api::types::{CreateImportResponse, ErrorPayload, RawImportJob, RawImportPage};
use crate::config::{Config, DEFAULT_API_TIMEOUT_SECS, DEFAULT_SERVER_URL};
use crate::error::{CliError, Result};
use async_trait::async_trait;
use fidc_common::{ImportJob, Page};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// API client for the import service
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_API_TIMEOUT_SECS))
    }

    /// Create a client with an explicit request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Create from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_timeout(config.server_url.clone(), config.api_timeout())
    }

    /// Create from the `FIDC_SERVER_URL` environment variable
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("FIDC_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());

        Self::new(base_url)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Turn a non-success response into an error, keeping the server message
    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = ErrorPayload::message_from_body(&body);
        debug!(status = status.as_u16(), message = ?message, "Import service returned an error");

        Err(CliError::api(status.as_u16(), message))
    }

    /// Decode a JSON body, reporting shape problems as invalid payloads
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| CliError::invalid_payload(e.to_string()))
    }
}

/// Log any lifecycle inconsistencies in a freshly normalized snapshot
fn audit_snapshot(job: &ImportJob) {
    for violation in job.invariant_violations() {
        warn!(import_id = %job.id, status = %job.status, %violation, "Inconsistent import snapshot");
    }
}

#[async_trait]
impl ImportRepository for ApiClient {
    #[instrument(skip(self), fields(page = query.page, page_size = query.page_size))]
    async fn list(&self, query: ListQuery) -> Result<Page<ImportJob>> {
        let url = endpoints::import_list_url(&self.base_url, query.page, query.page_size);

        let response = Self::ensure_success(self.client.get(&url).send().await?).await?;
        let raw: RawImportPage = Self::decode(response).await?;
        let page = raw.normalize(query.page, query.page_size);

        page.items.iter().for_each(audit_snapshot);
        debug!(
            items = page.items.len(),
            total = page.total_items,
            running = page.non_terminal_count(),
            "Listed imports"
        );

        Ok(page)
    }

    #[instrument(skip(self, request), fields(file = %request.file_name, fidc_id = %request.fidc_id, size = request.contents.len()))]
    async fn create(&self, request: CreateImportRequest) -> Result<String> {
        let url = endpoints::imports_url(&self.base_url);

        let mut form = Form::new();
        for (name, value) in request.form_fields() {
            form = form.text(name, value);
        }

        let length = request.contents.len() as u64;
        let part = Part::stream_with_length(request.contents, length)
            .file_name(request.file_name)
            .mime_str("application/octet-stream")?;
        form = form.part("file", part);

        let response =
            Self::ensure_success(self.client.post(&url).multipart(form).send().await?).await?;
        let created: CreateImportResponse = Self::decode(response).await?;
        let id = created.into_id()?;

        debug!(import_id = %id, "Import created");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<ImportJob> {
        let url = endpoints::import_url(&self.base_url, id);

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CliError::ImportNotFound(id.to_string()));
        }

        let response = Self::ensure_success(response).await?;
        let raw: RawImportJob = Self::decode(response).await?;
        let job = raw.normalize()?;
        audit_snapshot(&job);

        Ok(job)
    }

    #[instrument(skip(self))]
    async fn reprocess(&self, id: &str) -> Result<()> {
        let url = endpoints::reprocess_url(&self.base_url, id);

        let response = self.client.post(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CliError::ImportNotFound(id.to_string()));
        }

        Self::ensure_success(response).await?;
        debug!(import_id = %id, "Reprocess accepted");
        Ok(())
    }
}
