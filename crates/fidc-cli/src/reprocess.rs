//! Reprocess command
//!
//! Issues a reprocess for one import and then refreshes whatever views were
//! registered, so the new attempt shows up without waiting for a poll.

use crate::api::ImportRepository;
use crate::error::{CliError, Result};
use async_trait::async_trait;
use fidc_common::types::check_progression;
use fidc_common::{ImportJob, ImportStatus};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Something that shows import state and must be refreshed after a change
#[async_trait]
pub trait RefreshTarget: Send + Sync {
    async fn import_changed(&self, import_id: &str) -> Result<()>;
}

/// Which imports may be reprocessed from here
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReprocessPolicy {
    /// Only imports that reached a terminal status
    #[default]
    TerminalOnly,
    /// Any import; the service has the final say
    Force,
}

impl ReprocessPolicy {
    pub fn allows(&self, status: &ImportStatus) -> bool {
        match self {
            ReprocessPolicy::TerminalOnly => status.is_terminal(),
            ReprocessPolicy::Force => true,
        }
    }
}

/// Snapshots taken around an accepted reprocess
#[derive(Debug, Clone)]
pub struct ReprocessOutcome {
    pub import_id: String,
    pub before: ImportJob,
    /// Fresh snapshot; `None` when the follow-up read failed
    pub after: Option<ImportJob>,
}

impl ReprocessOutcome {
    /// Whether the attempt counter already reflects the new attempt
    pub fn attempt_recorded(&self) -> bool {
        self.after
            .as_ref()
            .is_some_and(|after| after.tentativas > self.before.tentativas)
    }
}

pub struct ReprocessController<R> {
    repository: R,
    policy: ReprocessPolicy,
    targets: Vec<Arc<dyn RefreshTarget>>,
}

impl<R: ImportRepository> ReprocessController<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            policy: ReprocessPolicy::default(),
            targets: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: ReprocessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register a view to refresh after every accepted reprocess
    pub fn notify(mut self, target: Arc<dyn RefreshTarget>) -> Self {
        self.targets.push(target);
        self
    }

    #[instrument(skip(self), fields(policy = ?self.policy))]
    pub async fn reprocess(&self, import_id: &str) -> Result<ReprocessOutcome> {
        let before = self.repository.get(import_id).await?;

        if !self.policy.allows(&before.status) {
            return Err(CliError::ReprocessRejected {
                id: import_id.to_string(),
                status: before.status,
            });
        }

        self.repository.reprocess(import_id).await?;
        info!(import_id, attempts = before.tentativas, "Reprocess requested");

        let after = match self.repository.get(import_id).await {
            Ok(after) => {
                if let Err(e) = check_progression(&before, &after) {
                    warn!(import_id, error = %e, "Snapshot after reprocess went backwards");
                }
                Some(after)
            },
            Err(e) => {
                warn!(import_id, error = %e, "Could not read import after reprocess");
                None
            },
        };

        for target in &self.targets {
            if let Err(e) = target.import_changed(import_id).await {
                warn!(import_id, error = %e, "View refresh after reprocess failed");
            }
        }

        let outcome = ReprocessOutcome {
            import_id: import_id.to_string(),
            before,
            after,
        };
        debug!(import_id, recorded = outcome.attempt_recorded(), "Reprocess finished");

        Ok(outcome)
    }
}
