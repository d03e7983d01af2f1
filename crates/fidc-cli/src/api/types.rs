//! Wire payloads of the import service and their normalization
//!
//! The service is not consistent about field casing between endpoints, ids
//! arrive as strings or numbers, and list items omit the event log. Every
//! raw payload is mapped here into the strict shapes of
//! [`fidc_common::types`]; nothing outside this module touches raw JSON.

use crate::error::{CliError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use fidc_common::{EventStatus, ImportEvent, ImportJob, ImportStatus, Page};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Raw import job as returned by list and get endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawImportJob {
    #[serde(alias = "Id")]
    pub id: Option<Value>,
    #[serde(alias = "fidc_id", alias = "FidcId")]
    pub fidc_id: Option<String>,
    #[serde(alias = "Origem")]
    pub origem: Option<String>,
    #[serde(alias = "tipo_arquivo", alias = "TipoArquivo")]
    pub tipo_arquivo: Option<String>,
    #[serde(alias = "Modalidade")]
    pub modalidade: Option<String>,
    #[serde(alias = "cedente_id", alias = "CedenteId")]
    pub cedente_id: Option<Value>,
    #[serde(alias = "file_name", alias = "FileName", alias = "nomeArquivo")]
    pub file_name: Option<String>,
    #[serde(alias = "file_hash", alias = "FileHash", alias = "hashArquivo")]
    pub file_hash: Option<String>,
    #[serde(alias = "Status")]
    pub status: Option<String>,
    #[serde(alias = "error_summary", alias = "ErrorSummary")]
    pub error_summary: Option<String>,
    #[serde(alias = "ultimo_codigo_falha", alias = "UltimoCodigoFalha")]
    pub ultimo_codigo_falha: Option<Value>,
    #[serde(alias = "Tentativas")]
    pub tentativas: Option<Value>,
    #[serde(alias = "ultima_tentativa_em", alias = "UltimaTentativaEm")]
    pub ultima_tentativa_em: Option<String>,
    #[serde(alias = "created_at", alias = "CreatedAt")]
    pub created_at: Option<String>,
    #[serde(alias = "completed_at", alias = "CompletedAt")]
    pub completed_at: Option<String>,
    #[serde(alias = "user_email", alias = "UserEmail")]
    pub user_email: Option<String>,
    #[serde(alias = "Events", alias = "eventos")]
    pub events: Option<Vec<RawImportEvent>>,
}

/// Raw audit event
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawImportEvent {
    #[serde(alias = "Id")]
    pub id: Option<Value>,
    #[serde(alias = "Status")]
    pub status: Option<String>,
    #[serde(alias = "Message", alias = "mensagem")]
    pub message: Option<String>,
    #[serde(alias = "created_at", alias = "CreatedAt")]
    pub created_at: Option<String>,
}

/// Raw list envelope
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawImportPage {
    /// Kept undecoded so one malformed row cannot reject the whole page
    #[serde(alias = "Items", alias = "data")]
    pub items: Vec<Value>,
    #[serde(alias = "Page")]
    pub page: Option<u32>,
    #[serde(alias = "page_size", alias = "PageSize")]
    pub page_size: Option<u32>,
    #[serde(alias = "total_items", alias = "TotalItems")]
    pub total_items: Option<u64>,
    #[serde(alias = "total_pages", alias = "TotalPages")]
    pub total_pages: Option<u32>,
}

/// Response of the create endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateImportResponse {
    #[serde(alias = "importacao_id", alias = "ImportacaoId", alias = "id")]
    pub importacao_id: Option<Value>,
}

/// Structured error body; any of these fields may carry the message
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErrorPayload {
    #[serde(alias = "Message")]
    pub message: Option<Value>,
    pub error: Option<Value>,
    pub detail: Option<Value>,
    pub title: Option<Value>,
}

impl ErrorPayload {
    /// Parse an error body, returning the first usable message
    pub fn message_from_body(body: &str) -> Option<String> {
        let payload: ErrorPayload = serde_json::from_str(body).ok()?;
        [payload.message, payload.error, payload.detail, payload.title]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
    }
}

/// Turn an opaque id (string or number) into its string form
pub fn opaque_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a service timestamp
///
/// RFC 3339 is preferred; naive ISO-8601 values are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn optional_timestamp(field: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| CliError::invalid_payload(format!("{} is not a timestamp: '{}'", field, raw))),
    }
}

/// Attempt counter as a number or a numeric string
fn attempt_count(id: &str, value: Option<Value>) -> Result<u32> {
    let count = match value {
        None | Some(Value::Null) => Some(0),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    count
        .map(|n| n.clamp(0, i64::from(u32::MAX)) as u32)
        .ok_or_else(|| CliError::invalid_payload(format!("import {} has a non-numeric tentativas", id)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl RawImportEvent {
    fn normalize(self, job_id: &str, position: usize) -> Result<ImportEvent> {
        let id = self
            .id
            .as_ref()
            .and_then(opaque_id)
            .unwrap_or_else(|| format!("{}-{}", job_id, position));

        let created_at = optional_timestamp("event createdAt", self.created_at)?
            .ok_or_else(|| {
                CliError::invalid_payload(format!("event {} of import {} has no createdAt", id, job_id))
            })?;

        Ok(ImportEvent {
            id,
            status: EventStatus::from(self.status.unwrap_or_default()),
            message: non_blank(self.message),
            created_at,
        })
    }
}

impl RawImportJob {
    /// Map into the strict job shape
    ///
    /// Events keep the order the server sent them in.
    pub fn normalize(self) -> Result<ImportJob> {
        let id = self
            .id
            .as_ref()
            .and_then(opaque_id)
            .ok_or_else(|| CliError::invalid_payload("import without id"))?;

        let created_at = optional_timestamp("createdAt", self.created_at)?
            .ok_or_else(|| CliError::invalid_payload(format!("import {} has no createdAt", id)))?;

        let events = self
            .events
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(position, event)| event.normalize(&id, position))
            .collect::<Result<Vec<_>>>()?;

        let tentativas = attempt_count(&id, self.tentativas)?;

        Ok(ImportJob {
            fidc_id: non_blank(self.fidc_id),
            origem: non_blank(self.origem),
            tipo_arquivo: non_blank(self.tipo_arquivo),
            modalidade: non_blank(self.modalidade),
            cedente_id: self.cedente_id.as_ref().and_then(opaque_id),
            file_name: self.file_name.unwrap_or_default(),
            file_hash: non_blank(self.file_hash).map(|h| h.to_ascii_lowercase()),
            status: ImportStatus::from(self.status.unwrap_or_default()),
            error_summary: non_blank(self.error_summary),
            ultimo_codigo_falha: self.ultimo_codigo_falha.as_ref().and_then(opaque_id),
            tentativas,
            ultima_tentativa_em: optional_timestamp("ultimaTentativaEm", self.ultima_tentativa_em)?,
            created_at,
            completed_at: optional_timestamp("completedAt", self.completed_at)?,
            user_email: non_blank(self.user_email),
            events,
            id,
        })
    }
}

impl RawImportPage {
    /// Map into a page of strict jobs, filling in missing envelope fields
    ///
    /// Rows that cannot be decoded are logged and left out; the rest of the
    /// page is still usable.
    pub fn normalize(self, requested_page: u32, requested_size: u32) -> Page<ImportJob> {
        let mut items = Vec::with_capacity(self.items.len());
        for (position, value) in self.items.into_iter().enumerate() {
            let decoded = serde_json::from_value::<RawImportJob>(value)
                .map_err(CliError::from)
                .and_then(RawImportJob::normalize);
            match decoded {
                Ok(job) => items.push(job),
                Err(e) => warn!(position, error = %e, "Skipping unreadable import in list"),
            }
        }

        let page_size = self.page_size.filter(|s| *s > 0).unwrap_or(requested_size);
        let total_items = self.total_items.unwrap_or(items.len() as u64);
        let total_pages = self
            .total_pages
            .unwrap_or_else(|| total_items.div_ceil(u64::from(page_size.max(1))) as u32);

        Page {
            items,
            page: self.page.filter(|p| *p > 0).unwrap_or(requested_page),
            page_size,
            total_items,
            total_pages,
        }
    }
}

impl CreateImportResponse {
    pub fn into_id(self) -> Result<String> {
        self.importacao_id
            .as_ref()
            .and_then(opaque_id)
            .ok_or_else(|| CliError::invalid_payload("create response without importacaoId"))
    }
}
