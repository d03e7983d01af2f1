//! In-memory repositories shared by unit tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::api::{CreateImportRequest, ImportRepository, ListQuery};
use crate::error::{CliError, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use fidc_common::{EventStatus, ImportEvent, ImportJob, ImportStatus, Page};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
}

pub fn event(id: &str, status: &str, minute: u32) -> ImportEvent {
    ImportEvent {
        id: id.to_string(),
        status: EventStatus::from(status),
        message: None,
        created_at: at(minute),
    }
}

/// A consistent snapshot in the given status
pub fn job(id: &str, status: ImportStatus) -> ImportJob {
    let completed_at = status.is_terminal().then(|| at(5));
    let mut events = vec![event(&format!("{id}-0"), "PROCESSANDO", 0)];
    if status.is_terminal() {
        events.push(event(&format!("{id}-1"), status.as_str(), 5));
    }

    ImportJob {
        id: id.to_string(),
        fidc_id: Some("F1".to_string()),
        origem: Some("Cnab".to_string()),
        tipo_arquivo: None,
        modalidade: None,
        cedente_id: None,
        file_name: "lote.rem".to_string(),
        file_hash: None,
        error_summary: status.is_failure().then(|| "Layout inválido".to_string()),
        ultimo_codigo_falha: status.is_failure().then(|| "E042".to_string()),
        status,
        tentativas: 1,
        ultima_tentativa_em: Some(at(0)),
        created_at: at(0),
        completed_at,
        user_email: Some("ops@fundo.com.br".to_string()),
        events,
    }
}

pub fn page_of(items: Vec<ImportJob>) -> Page<ImportJob> {
    Page {
        total_items: items.len() as u64,
        items,
        page: 1,
        page_size: 20,
        total_pages: 1,
    }
}

/// One scripted list response
#[derive(Debug, Clone)]
pub enum Step {
    Page(Page<ImportJob>),
    Fail,
}

/// Answers list calls from a script, repeating the last step once exhausted
pub struct ScriptedRepository {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    queries: Mutex<Vec<ListQuery>>,
    calls: AtomicUsize,
    latency: Duration,
}

impl ScriptedRepository {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            queries: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<ListQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        let mut last = self.last.lock().unwrap();
        if let Some(step) = self.script.lock().unwrap().pop_front() {
            *last = Some(step);
        }
        last.clone().expect("script must not be empty")
    }
}

#[async_trait]
impl ImportRepository for ScriptedRepository {
    async fn list(&self, query: ListQuery) -> Result<Page<ImportJob>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query);
        let step = self.next_step();

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match step {
            Step::Page(mut page) => {
                page.page = query.page;
                page.page_size = query.page_size;
                Ok(page)
            },
            Step::Fail => Err(CliError::api(503, None)),
        }
    }

    async fn create(&self, _request: CreateImportRequest) -> Result<String> {
        unreachable!("list script only")
    }

    async fn get(&self, _id: &str) -> Result<ImportJob> {
        unreachable!("list script only")
    }

    async fn reprocess(&self, _id: &str) -> Result<()> {
        unreachable!("list script only")
    }
}

/// Serves per-import snapshot sequences and records reprocess calls
#[derive(Default)]
pub struct JobStore {
    snapshots: Mutex<HashMap<String, VecDeque<ImportJob>>>,
    reprocessed: Mutex<Vec<String>>,
    reject_reprocess: Option<(u16, String)>,
}

impl JobStore {
    /// Each `get` pops the next snapshot for that id; the last one sticks
    pub fn with_snapshots(mut self, snapshots: Vec<ImportJob>) -> Self {
        let map = self.snapshots.get_mut().unwrap();
        for job in snapshots {
            map.entry(job.id.clone()).or_default().push_back(job);
        }
        self
    }

    pub fn rejecting_reprocess(mut self, status: u16, message: &str) -> Self {
        self.reject_reprocess = Some((status, message.to_string()));
        self
    }

    pub fn reprocessed(&self) -> Vec<String> {
        self.reprocessed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImportRepository for JobStore {
    async fn list(&self, _query: ListQuery) -> Result<Page<ImportJob>> {
        let snapshots = self.snapshots.lock().unwrap();
        let items = snapshots
            .values()
            .filter_map(|queue| queue.front().cloned())
            .collect();
        Ok(page_of(items))
    }

    async fn create(&self, _request: CreateImportRequest) -> Result<String> {
        unreachable!("job store does not create")
    }

    async fn get(&self, id: &str) -> Result<ImportJob> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let queue = snapshots
            .get_mut(id)
            .ok_or_else(|| CliError::ImportNotFound(id.to_string()))?;

        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap())
        } else {
            Ok(queue.front().cloned().unwrap())
        }
    }

    async fn reprocess(&self, id: &str) -> Result<()> {
        if let Some((status, message)) = &self.reject_reprocess {
            return Err(CliError::api(*status, Some(message.clone())));
        }
        if !self.snapshots.lock().unwrap().contains_key(id) {
            return Err(CliError::ImportNotFound(id.to_string()));
        }
        self.reprocessed.lock().unwrap().push(id.to_string());
        Ok(())
    }
}
