//! Import list with self-managing status polling
//!
//! The list view owns the paging state and at most one polling timer. After
//! every successful fetch it re-evaluates a two-state machine:
//!
//! - some listed import is not terminal: start the timer if none is running
//!   (`Idle -> Polling`);
//! - every listed import is terminal: cancel the timer (`Polling -> Idle`).
//!
//! Fetches triggered by the user (refresh, page changes) go through the same
//! rule. A failed fetch changes nothing; the next tick simply tries again.
//! Dropping the view, or calling [`ImportListView::shutdown`], releases the
//! timer and discards any response that arrives afterwards.

use crate::api::{ImportRepository, ListQuery};
use crate::error::Result;
use crate::reprocess::RefreshTarget;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fidc_common::{ImportJob, Page};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shortest period the timer accepts
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Whether the list is currently being refreshed on a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
}

/// What caused a list fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    User,
    Timer,
}

/// Immutable result of one successful list fetch
#[derive(Debug, Clone)]
pub struct ListSnapshot {
    pub page: Page<ImportJob>,
    /// Poller state right after this fetch was evaluated
    pub state: PollerState,
    pub fetched_at: DateTime<Utc>,
}

/// Owned handle on the polling task
///
/// Dropping the handle stops the task.
struct PollTimer {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PollTimer {
    fn start<R>(core: Weak<ListCore<R>>, period: Duration, parent: &CancellationToken) -> Self
    where
        R: ImportRepository + 'static,
    {
        let cancel = parent.child_token();
        let handle = tokio::spawn(run_timer(core, period, cancel.clone()));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Cancel the task, handing back its join handle
    fn stop(mut self) -> Option<JoinHandle<()>> {
        self.cancel.cancel();
        self.handle.take()
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_timer<R>(core: Weak<ListCore<R>>, period: Duration, cancel: CancellationToken)
where
    R: ImportRepository + 'static,
{
    // The fetch that started the timer already has fresh data.
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {},
        }

        let Some(core) = core.upgrade() else { break };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = core.fetch(FetchOrigin::Timer, Some(&cancel)) => {
                if let Err(e) = result {
                    warn!(error = %e, "Polling fetch failed, retrying on next tick");
                }
            },
        }
    }

    debug!("Polling task finished");
}

struct ListCore<R> {
    repository: R,
    query: Mutex<ListQuery>,
    timer: Mutex<Option<PollTimer>>,
    snapshots: watch::Sender<Option<Arc<ListSnapshot>>>,
    teardown: CancellationToken,
    period: Duration,
}

impl<R: ImportRepository + 'static> ListCore<R> {
    /// Fetch the current page and apply the start/stop rule
    ///
    /// `owner` is the token of the timer issuing a tick fetch. If that timer
    /// was stopped while the request was in flight, the response is stale
    /// and is dropped without touching the timer.
    async fn fetch(
        self: &Arc<Self>,
        origin: FetchOrigin,
        owner: Option<&CancellationToken>,
    ) -> Result<Option<Arc<ListSnapshot>>> {
        let query = *self.query.lock().await;
        let result = self.repository.list(query).await;

        if self.teardown.is_cancelled() {
            debug!(?origin, "List view closed, discarding response");
            return Ok(None);
        }

        let page = result?;
        let Some(state) = self.evaluate(&page, owner).await else {
            debug!(?origin, "Polling timer was stopped, discarding response");
            return Ok(None);
        };

        let snapshot = Arc::new(ListSnapshot {
            page,
            state,
            fetched_at: Utc::now(),
        });
        self.snapshots.send_replace(Some(Arc::clone(&snapshot)));

        debug!(?origin, ?state, page = query.page, "List refreshed");
        Ok(Some(snapshot))
    }

    /// Apply the start/stop rule for the page just fetched
    async fn evaluate(
        self: &Arc<Self>,
        page: &Page<ImportJob>,
        owner: Option<&CancellationToken>,
    ) -> Option<PollerState> {
        let mut timer = self.timer.lock().await;

        if owner.is_some_and(CancellationToken::is_cancelled) {
            return None;
        }

        if page.any_non_terminal() {
            if timer.is_none() {
                *timer = Some(PollTimer::start(
                    Arc::downgrade(self),
                    self.period,
                    &self.teardown,
                ));
                info!(
                    running = page.non_terminal_count(),
                    interval_secs = self.period.as_secs(),
                    "Imports in progress, polling started"
                );
            }
            Some(PollerState::Polling)
        } else {
            if let Some(active) = timer.take() {
                // May run on the polling task itself; the handle is detached.
                drop(active.stop());
                info!("All listed imports finished, polling stopped");
            }
            Some(PollerState::Idle)
        }
    }
}

/// Paged import list with automatic status polling
pub struct ImportListView<R: ImportRepository + 'static> {
    core: Arc<ListCore<R>>,
}

impl<R: ImportRepository + 'static> ImportListView<R> {
    pub fn new(repository: R, query: ListQuery, poll_interval: Duration) -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            core: Arc::new(ListCore {
                repository,
                query: Mutex::new(query),
                timer: Mutex::new(None),
                snapshots,
                teardown: CancellationToken::new(),
                period: poll_interval.max(MIN_POLL_INTERVAL),
            }),
        }
    }

    /// Fetch the current page now
    ///
    /// Returns `None` when the view was shut down while the request was in
    /// flight.
    pub async fn refresh(&self) -> Result<Option<Arc<ListSnapshot>>> {
        self.core.fetch(FetchOrigin::User, None).await
    }

    /// Move to another page and fetch it
    pub async fn go_to_page(&self, page: u32) -> Result<Option<Arc<ListSnapshot>>> {
        {
            let mut query = self.core.query.lock().await;
            *query = ListQuery::new(page, query.page_size);
        }
        self.refresh().await
    }

    pub async fn next_page(&self) -> Result<Option<Arc<ListSnapshot>>> {
        let page = self.core.query.lock().await.page;
        self.go_to_page(page.saturating_add(1)).await
    }

    pub async fn previous_page(&self) -> Result<Option<Arc<ListSnapshot>>> {
        let page = self.core.query.lock().await.page;
        self.go_to_page(page.saturating_sub(1)).await
    }

    /// Change the page size, going back to the first page
    pub async fn set_page_size(&self, page_size: u32) -> Result<Option<Arc<ListSnapshot>>> {
        {
            let mut query = self.core.query.lock().await;
            *query = ListQuery::new(1, page_size);
        }
        self.refresh().await
    }

    pub async fn query(&self) -> ListQuery {
        *self.core.query.lock().await
    }

    pub async fn state(&self) -> PollerState {
        if self.core.timer.lock().await.is_some() {
            PollerState::Polling
        } else {
            PollerState::Idle
        }
    }

    /// Most recent successful snapshot
    pub fn latest(&self) -> Option<Arc<ListSnapshot>> {
        self.core.snapshots.borrow().clone()
    }

    /// Receive every snapshot published from now on
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ListSnapshot>>> {
        self.core.snapshots.subscribe()
    }

    /// Release the timer and wait for the polling task to finish
    pub async fn shutdown(&self) {
        self.core.teardown.cancel();
        let active = self.core.timer.lock().await.take();
        if let Some(handle) = active.and_then(PollTimer::stop) {
            let _ = handle.await;
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.core.teardown.is_cancelled()
    }
}

impl<R: ImportRepository + 'static> Drop for ImportListView<R> {
    fn drop(&mut self) {
        self.core.teardown.cancel();
    }
}

#[async_trait]
impl<R: ImportRepository + 'static> RefreshTarget for ImportListView<R> {
    async fn import_changed(&self, import_id: &str) -> Result<()> {
        debug!(import_id, "Refreshing list after reprocess");
        self.refresh().await.map(|_| ())
    }
}
