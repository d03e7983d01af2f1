//! Single-import detail and event timeline
//!
//! A [`DetailView`] is bound to one import id. Every load fetches a fresh
//! snapshot; when a previous one is held, the pair is checked for lifecycle
//! regressions and any finding is logged.

use crate::api::ImportRepository;
use crate::error::Result;
use crate::reprocess::RefreshTarget;
use async_trait::async_trait;
use fidc_common::types::check_progression;
use fidc_common::{EventTone, ImportEvent, ImportJob};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// One row of the event timeline
#[derive(Debug, Clone, Copy)]
pub struct TimelineEntry<'a> {
    /// Zero-based position in the event log
    pub position: usize,
    pub event: &'a ImportEvent,
    pub tone: EventTone,
}

/// A fetched import with its timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDetail {
    pub job: ImportJob,
}

impl ImportDetail {
    pub fn new(job: ImportJob) -> Self {
        Self { job }
    }

    pub fn status_tone(&self) -> EventTone {
        self.job.status.tone()
    }

    /// Events in the order the service returned them
    pub fn timeline(&self) -> impl Iterator<Item = TimelineEntry<'_>> {
        self.job
            .events
            .iter()
            .enumerate()
            .map(|(position, event)| TimelineEntry {
                position,
                event,
                tone: event.status.tone(),
            })
    }

    /// Failure code and summary, only when the import failed
    pub fn failure(&self) -> Option<(Option<&str>, Option<&str>)> {
        self.job.status.is_failure().then(|| {
            (
                self.job.ultimo_codigo_falha.as_deref(),
                self.job.error_summary.as_deref(),
            )
        })
    }
}

/// Read-only view of one import
pub struct DetailView<R> {
    repository: R,
    import_id: String,
    current: Mutex<Option<ImportDetail>>,
}

impl<R: ImportRepository> DetailView<R> {
    pub fn new(repository: R, import_id: impl Into<String>) -> Self {
        Self {
            repository,
            import_id: import_id.into(),
            current: Mutex::new(None),
        }
    }

    pub fn import_id(&self) -> &str {
        &self.import_id
    }

    /// Fetch the latest snapshot and replace the held one
    #[instrument(skip(self), fields(import_id = %self.import_id))]
    pub async fn load(&self) -> Result<ImportDetail> {
        let job = self.repository.get(&self.import_id).await?;

        let mut current = self.current.lock().await;
        if let Some(previous) = current.as_ref() {
            if let Err(e) = check_progression(&previous.job, &job) {
                warn!(error = %e, "Import snapshot went backwards");
            }
        }

        let detail = ImportDetail::new(job);
        *current = Some(detail.clone());

        debug!(status = %detail.job.status, events = detail.job.events.len(), "Detail loaded");
        Ok(detail)
    }

    /// Last loaded snapshot, if any
    pub async fn current(&self) -> Option<ImportDetail> {
        self.current.lock().await.clone()
    }
}

#[async_trait]
impl<R: ImportRepository> RefreshTarget for DetailView<R> {
    async fn import_changed(&self, import_id: &str) -> Result<()> {
        if import_id != self.import_id {
            return Ok(());
        }
        self.load().await.map(|_| ())
    }
}
