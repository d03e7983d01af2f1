//! Import job model shared by the client crates
//!
//! These are the normalized shapes. Raw server payloads are mapped into them
//! once, at the repository boundary, and nothing downstream ever sees the
//! wire representation.

use crate::error::{CommonError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Statuses
// ============================================================================

/// Lifecycle status of an import job
///
/// The remote worker owns every transition except the reset to
/// `Processando` issued by a reprocess request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImportStatus {
    Processando,
    Validado,
    Pendente,
    FinalizadoSucesso,
    FinalizadoFalha,
    /// A value this client does not know; displayed neutrally
    Unknown(String),
}

impl ImportStatus {
    /// Wire value of the status
    pub fn as_str(&self) -> &str {
        match self {
            ImportStatus::Processando => "PROCESSANDO",
            ImportStatus::Validado => "VALIDADO",
            ImportStatus::Pendente => "PENDENTE",
            ImportStatus::FinalizadoSucesso => "FINALIZADO_SUCESSO",
            ImportStatus::FinalizadoFalha => "FINALIZADO_FALHA",
            ImportStatus::Unknown(raw) => raw,
        }
    }

    /// Whether no further automatic transition will happen
    ///
    /// Unknown values are not terminal, so a list containing one keeps the
    /// poller running.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportStatus::FinalizadoSucesso | ImportStatus::FinalizadoFalha
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ImportStatus::FinalizadoFalha)
    }

    /// Styling category used when rendering the current status
    pub fn tone(&self) -> EventTone {
        match self {
            ImportStatus::FinalizadoSucesso | ImportStatus::Validado => EventTone::Success,
            ImportStatus::FinalizadoFalha => EventTone::Failure,
            ImportStatus::Pendente => EventTone::Warning,
            ImportStatus::Processando | ImportStatus::Unknown(_) => EventTone::Neutral,
        }
    }
}

impl From<String> for ImportStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PROCESSANDO" => ImportStatus::Processando,
            "VALIDADO" => ImportStatus::Validado,
            "PENDENTE" => ImportStatus::Pendente,
            "FINALIZADO_SUCESSO" => ImportStatus::FinalizadoSucesso,
            "FINALIZADO_FALHA" => ImportStatus::FinalizadoFalha,
            _ => ImportStatus::Unknown(value),
        }
    }
}

impl From<&str> for ImportStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ImportStatus> for String {
    fn from(status: ImportStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status recorded on a single audit event
///
/// Events carry their own status, which may differ from the job's current
/// one, plus the `REPROCESSAR` marker appended by a manual retry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventStatus {
    Job(ImportStatus),
    Reprocessar,
}

impl EventStatus {
    pub fn as_str(&self) -> &str {
        match self {
            EventStatus::Job(status) => status.as_str(),
            EventStatus::Reprocessar => "REPROCESSAR",
        }
    }

    pub fn tone(&self) -> EventTone {
        match self {
            EventStatus::Job(status) => status.tone(),
            EventStatus::Reprocessar => EventTone::Warning,
        }
    }
}

impl From<String> for EventStatus {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("REPROCESSAR") {
            EventStatus::Reprocessar
        } else {
            EventStatus::Job(ImportStatus::from(value))
        }
    }
}

impl From<&str> for EventStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ImportStatus> for EventStatus {
    fn from(status: ImportStatus) -> Self {
        EventStatus::Job(status)
    }
}

impl From<EventStatus> for String {
    fn from(status: EventStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Styling category for a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTone {
    Success,
    Failure,
    Warning,
    Neutral,
}

// ============================================================================
// Import job
// ============================================================================

/// One entry of a job's audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEvent {
    pub id: String,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A tracked ingestion request and its externally observed lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fidc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_arquivo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalidade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cedente_id: Option<String>,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    pub status: ImportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultimo_codigo_falha: Option<String>,
    pub tentativas: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultima_tentativa_em: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default)]
    pub events: Vec<ImportEvent>,
}

/// A way in which a single snapshot disagrees with the lifecycle contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotViolation {
    /// `completedAt` is set although the status is not terminal
    CompletedWhileActive,
    /// The status is terminal but `completedAt` is missing
    TerminalWithoutCompletion,
    /// Failure details are present outside `FINALIZADO_FALHA`
    FailureFieldsOutsideFailure,
    /// Event at `position` is older than the one before it
    EventsOutOfOrder { position: usize },
}

impl std::fmt::Display for SnapshotViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotViolation::CompletedWhileActive => {
                write!(f, "completedAt set on a non-terminal import")
            },
            SnapshotViolation::TerminalWithoutCompletion => {
                write!(f, "terminal import without completedAt")
            },
            SnapshotViolation::FailureFieldsOutsideFailure => {
                write!(f, "failure details present on an import that did not fail")
            },
            SnapshotViolation::EventsOutOfOrder { position } => {
                write!(f, "event {} is older than its predecessor", position)
            },
        }
    }
}

impl ImportJob {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Most recent audit event, if any
    pub fn last_event(&self) -> Option<&ImportEvent> {
        self.events.last()
    }

    /// Check this snapshot against the lifecycle invariants
    ///
    /// Returns every violation found; an empty list means the snapshot is
    /// consistent.
    pub fn invariant_violations(&self) -> Vec<SnapshotViolation> {
        let mut violations = Vec::new();

        match (self.status.is_terminal(), self.completed_at.is_some()) {
            (false, true) => violations.push(SnapshotViolation::CompletedWhileActive),
            (true, false) => violations.push(SnapshotViolation::TerminalWithoutCompletion),
            _ => {},
        }

        if !self.status.is_failure()
            && (self.error_summary.is_some() || self.ultimo_codigo_falha.is_some())
        {
            violations.push(SnapshotViolation::FailureFieldsOutsideFailure);
        }

        for (position, pair) in self.events.windows(2).enumerate() {
            if pair[1].created_at < pair[0].created_at {
                violations.push(SnapshotViolation::EventsOutOfOrder {
                    position: position + 1,
                });
            }
        }

        violations
    }
}

/// Check that `next` is a legal successor snapshot of `previous`
///
/// Both must describe the same job; the creation timestamp is fixed, the
/// attempt counter never decreases and the event log only grows at its end.
pub fn check_progression(previous: &ImportJob, next: &ImportJob) -> Result<()> {
    if previous.id != next.id {
        return Err(CommonError::DifferentImport {
            previous: previous.id.clone(),
            next: next.id.clone(),
        });
    }

    if previous.created_at != next.created_at {
        return Err(CommonError::CreatedAtChanged {
            id: next.id.clone(),
        });
    }

    if next.tentativas < previous.tentativas {
        return Err(CommonError::AttemptsDecreased {
            id: next.id.clone(),
            previous: previous.tentativas,
            next: next.tentativas,
        });
    }

    for (position, event) in previous.events.iter().enumerate() {
        if next.events.get(position) != Some(event) {
            return Err(CommonError::EventLogRewritten {
                id: next.id.clone(),
                position,
            });
        }
    }

    Ok(())
}

// ============================================================================
// Pagination
// ============================================================================

/// One page of a paged listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Page number (1-indexed)
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// An empty first page
    pub fn empty(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            page_size,
            total_items: 0,
            total_pages: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

impl Page<ImportJob> {
    /// Whether any listed job may still change on its own
    pub fn any_non_terminal(&self) -> bool {
        self.items.iter().any(|job| !job.is_terminal())
    }

    pub fn non_terminal_count(&self) -> usize {
        self.items.iter().filter(|job| !job.is_terminal()).count()
    }
}
