//! Common test utilities: in-memory repositories, audit sinks and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use document_service::contract::*;
use document_service::domain::allocation::{CounterWrite, StreamKey};
use document_service::domain::format::issue_number;
use document_service::domain::repository::{
    AdvanceFn, CounterRepository, DocumentRepository, StoreError, StoreResult,
};
use document_service::domain::{AuditEvent, AuditSink};
use document_service::{Config, DocumentServiceModule};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Route service logs to the test output; `RUST_LOG` selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn print_test_header(test_name: &str, purpose: &[&str]) {
    init_tracing();
    println!("\n🧪 TEST: {}", test_name);
    if let Some(first) = purpose.first() {
        println!("📋 PURPOSE: {}", first);
    }
    for line in purpose.iter().skip(1) {
        println!("   {}", line);
    }
}

// ===== Counter Repository =====

#[derive(Clone, Default)]
pub struct MockCounterRepo {
    data: Arc<RwLock<HashMap<Uuid, Counter>>>,
    fail_writes: Arc<AtomicBool>,
    /// Number of upcoming first-use inserts that lose to a simulated concurrent writer
    lost_races: Arc<AtomicU32>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockCounterRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with a backend error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn lose_next_races(&self, count: u32) {
        self.lost_races.store(count, Ordering::SeqCst);
    }

    /// Sleep before each allocation
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write() = Some(delay);
    }

    /// Place a row directly, bypassing the service
    pub fn seed(&self, counter: Counter) {
        self.data.write().insert(counter.id, counter);
    }

    pub fn get(&self, counter_id: Uuid) -> Option<Counter> {
        self.data.read().get(&counter_id).cloned()
    }

    pub fn count(&self) -> usize {
        self.data.read().len()
    }

    /// Current values of all stored rows, ascending
    pub fn current_values(&self) -> Vec<i64> {
        let mut values: Vec<i64> = self.data.read().values().map(|c| c.current_value).collect();
        values.sort_unstable();
        values
    }

    pub fn count_active(&self) -> usize {
        self.data.read().values().filter(|c| c.deleted_at.is_none()).count()
    }

    pub fn print_state(&self, context: &str) {
        let data = self.data.read();
        println!("\n========== CounterRepository State: {} ==========", context);
        for counter in data.values() {
            println!(
                "  {} key={} value={} deleted={:?}",
                counter.id,
                counter.key(),
                counter.current_value,
                counter.deleted_at
            );
        }
        println!("====================================================\n");
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!("connection reset by peer")));
        }
        Ok(())
    }

    fn live_key_taken(data: &HashMap<Uuid, Counter>, counter: &Counter) -> bool {
        data.values().any(|c| {
            c.deleted_at.is_none()
                && c.id != counter.id
                && c.tenant_id == counter.tenant_id
                && c.key() == counter.key()
        })
    }
}

#[async_trait]
impl CounterRepository for MockCounterRepo {
    async fn insert(&self, counter: &Counter) -> StoreResult<Counter> {
        self.check_writable()?;
        let mut data = self.data.write();
        if Self::live_key_taken(&data, counter) {
            return Err(StoreError::Duplicate(counter.key().to_string()));
        }
        data.insert(counter.id, counter.clone());
        Ok(counter.clone())
    }

    async fn update_settings(&self, counter: &Counter) -> StoreResult<Counter> {
        self.check_writable()?;
        let mut data = self.data.write();
        let stored = data
            .get_mut(&counter.id)
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("row vanished")))?;
        stored.prefix = counter.prefix.clone();
        stored.padding_length = counter.padding_length;
        stored.format_pattern = counter.format_pattern.clone();
        stored.reset_on_year_change = counter.reset_on_year_change;
        stored.notes = counter.notes.clone();
        stored.updated_at = counter.updated_at;
        stored.updated_by = counter.updated_by.clone();
        Ok(stored.clone())
    }

    async fn soft_delete(
        &self,
        tenant_id: Uuid,
        counter_id: Uuid,
        deleted_by: &str,
    ) -> StoreResult<bool> {
        self.check_writable()?;
        let mut data = self.data.write();
        match data.get_mut(&counter_id) {
            Some(c) if c.tenant_id == tenant_id && c.deleted_at.is_none() => {
                let now = chrono::Utc::now();
                c.deleted_at = Some(now);
                c.updated_at = now;
                c.updated_by = deleted_by.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_by_id(&self, tenant_id: Uuid, counter_id: Uuid) -> StoreResult<Option<Counter>> {
        Ok(self
            .data
            .read()
            .get(&counter_id)
            .filter(|c| c.tenant_id == tenant_id && c.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_key(&self, tenant_id: Uuid, key: &CounterKey) -> StoreResult<Option<Counter>> {
        Ok(self
            .data
            .read()
            .values()
            .find(|c| c.tenant_id == tenant_id && c.deleted_at.is_none() && &c.key() == key)
            .cloned())
    }

    async fn list(&self, tenant_id: Uuid) -> StoreResult<Vec<Counter>> {
        let mut counters: Vec<Counter> = self
            .data
            .read()
            .values()
            .filter(|c| c.tenant_id == tenant_id && c.deleted_at.is_none())
            .cloned()
            .collect();
        counters.sort_by(|a, b| {
            (a.document_type_id, &a.series, a.year).cmp(&(b.document_type_id, &b.series, b.year))
        });
        Ok(counters)
    }

    async fn allocate(&self, stream: &StreamKey, advance: AdvanceFn<'_>) -> StoreResult<Counter> {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_writable()?;

        let mut data = self.data.write();
        let rows: Vec<Counter> = data
            .values()
            .filter(|c| {
                c.tenant_id == stream.tenant_id
                    && c.document_type_id == stream.document_type_id
                    && c.series == stream.series
                    && c.deleted_at.is_none()
            })
            .cloned()
            .collect();

        match advance(rows) {
            CounterWrite::Insert(counter) => {
                let lose = self
                    .lost_races
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
                if lose {
                    // The competing writer took value 1 under the same key
                    let mut winner = counter.clone();
                    winner.id = Uuid::new_v4();
                    data.insert(winner.id, winner);
                }
                if Self::live_key_taken(&data, &counter) {
                    return Err(StoreError::Duplicate(counter.key().to_string()));
                }
                data.insert(counter.id, counter.clone());
                Ok(counter)
            }
            CounterWrite::Update(counter) => {
                data.insert(counter.id, counter.clone());
                Ok(counter)
            }
        }
    }
}

// ===== Document Repository =====

#[derive(Clone, Default)]
pub struct MockDocumentRepo {
    documents: Arc<RwLock<HashMap<Uuid, Document>>>,
    history: Arc<RwLock<Vec<StatusHistoryEntry>>>,
    fail_writes: Arc<AtomicBool>,
    /// Bump the stored version right before the next write, as a concurrent writer would
    interfere_next_write: Arc<AtomicBool>,
    /// Counter storage shared with the numbering side
    counters: MockCounterRepo,
}

impl MockDocumentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counters(counters: MockCounterRepo) -> Self {
        Self {
            counters,
            ..Self::default()
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn interfere_next_write(&self) {
        self.interfere_next_write.store(true, Ordering::SeqCst);
    }

    pub fn stored(&self, document_id: Uuid) -> Option<Document> {
        self.documents.read().get(&document_id).cloned()
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!("disk full")));
        }
        Ok(())
    }

    fn check_version(
        &self,
        documents: &mut HashMap<Uuid, Document>,
        document: &Document,
        expected_version: i64,
    ) -> StoreResult<()> {
        let stale = StoreError::StaleVersion {
            entity: "document",
            id: document.id,
        };
        let Some(stored) = documents
            .get_mut(&document.id)
            .filter(|d| d.tenant_id == document.tenant_id)
        else {
            return Err(stale);
        };
        if self.interfere_next_write.swap(false, Ordering::SeqCst) {
            stored.version += 1;
        }
        if stored.version != expected_version {
            return Err(stale);
        }
        Ok(())
    }

    fn swap_version(
        &self,
        documents: &mut HashMap<Uuid, Document>,
        document: &Document,
        expected_version: i64,
    ) -> StoreResult<()> {
        self.check_version(documents, document, expected_version)?;
        documents.insert(document.id, document.clone());
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for MockDocumentRepo {
    async fn insert(&self, document: &Document) -> StoreResult<Document> {
        self.check_writable()?;
        self.documents.write().insert(document.id, document.clone());
        Ok(document.clone())
    }

    async fn find_by_id(&self, tenant_id: Uuid, document_id: Uuid) -> StoreResult<Option<Document>> {
        Ok(self
            .documents
            .read()
            .get(&document_id)
            .filter(|d| d.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_status(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> StoreResult<Option<DocumentStatus>> {
        Ok(self
            .documents
            .read()
            .get(&document_id)
            .filter(|d| d.tenant_id == tenant_id)
            .map(|d| d.status))
    }

    async fn assign_number(
        &self,
        document: &Document,
        expected_version: i64,
        stream: &StreamKey,
        advance: AdvanceFn<'_>,
    ) -> StoreResult<(Document, DocumentNumber)> {
        self.check_writable()?;
        // A stale document fails before the counter moves, as a rolled back
        // transaction would leave it
        self.check_version(&mut self.documents.write(), document, expected_version)?;

        let counter = self.counters.allocate(stream, advance).await?;
        let number = issue_number(&counter);

        let mut numbered = document.clone();
        numbered.number = Some(number.formatted.clone());
        self.documents.write().insert(numbered.id, numbered.clone());
        Ok((numbered, number))
    }

    async fn apply_transition(
        &self,
        document: &Document,
        expected_version: i64,
        entry: &StatusHistoryEntry,
    ) -> StoreResult<Document> {
        self.check_writable()?;
        let mut documents = self.documents.write();
        self.swap_version(&mut documents, document, expected_version)?;
        self.history.write().push(entry.clone());
        Ok(document.clone())
    }

    async fn status_history(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> StoreResult<Vec<StatusHistoryEntry>> {
        let owned = self
            .documents
            .read()
            .get(&document_id)
            .is_some_and(|d| d.tenant_id == tenant_id);
        if !owned {
            return Ok(Vec::new());
        }
        let mut entries: Vec<StatusHistoryEntry> = self
            .history
            .read()
            .iter()
            .filter(|e| e.document_id == document_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            (b.changed_at, b.document_version).cmp(&(a.changed_at, a.document_version))
        });
        Ok(entries)
    }
}

// ===== Audit Sinks =====

#[derive(Clone, Default)]
pub struct RecordingAuditSink {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: AuditEvent) -> anyhow::Result<()> {
        self.events.write().push(event);
        Ok(())
    }
}

/// Sink whose every write fails
pub struct BrokenAuditSink;

#[async_trait]
impl AuditSink for BrokenAuditSink {
    async fn record(&self, _event: AuditEvent) -> anyhow::Result<()> {
        anyhow::bail!("audit backend unavailable")
    }
}

/// Sink that takes `delay` to accept each event
pub struct SlowAuditSink {
    delay: Duration,
}

impl SlowAuditSink {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl AuditSink for SlowAuditSink {
    async fn record(&self, _event: AuditEvent) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

// ===== Harness =====

/// Module wired over in-memory repositories
pub struct Harness {
    pub module: Arc<DocumentServiceModule>,
    pub api: Arc<dyn DocumentsApi>,
    pub counters: MockCounterRepo,
    pub documents: MockDocumentRepo,
    pub audit: RecordingAuditSink,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, None)
    }

    pub fn with_audit(audit: Arc<dyn AuditSink>) -> Self {
        Self::build(Config::default(), Some(audit))
    }

    fn build(config: Config, audit_override: Option<Arc<dyn AuditSink>>) -> Self {
        let counters = MockCounterRepo::new();
        let documents = MockDocumentRepo::with_counters(counters.clone());
        let audit = RecordingAuditSink::new();
        let sink: Arc<dyn AuditSink> = audit_override.unwrap_or_else(|| Arc::new(audit.clone()));

        let module = Arc::new(DocumentServiceModule::new(config));
        module
            .init_with(Arc::new(counters.clone()), Arc::new(documents.clone()), sink)
            .unwrap();
        let api = module.client().unwrap();

        Self {
            module,
            api,
            counters,
            documents,
            audit,
        }
    }
}

// ===== Fixtures =====

pub fn ctx(tenant_id: Uuid) -> RequestContext {
    RequestContext::new(tenant_id, "alice")
}

pub fn row(quantity: i64, unit_price: i64, vat_rate: i64) -> NewDocumentRow {
    NewDocumentRow {
        description: "Consulting".to_string(),
        quantity: Decimal::from(quantity),
        unit_price: Decimal::from(unit_price),
        vat_rate: Decimal::from(vat_rate),
    }
}

/// Draft with a type, a business party and one priced row
pub fn complete_draft(document_type_id: Uuid) -> NewDocument {
    NewDocument {
        document_type_id: Some(document_type_id),
        business_party_id: Some(Uuid::new_v4()),
        rows: vec![row(2, 50, 20)],
    }
}

/// Counter row as stored by a previous allocation
pub fn stored_counter(
    tenant_id: Uuid,
    document_type_id: Uuid,
    series: &str,
    year: Option<i32>,
    current_value: i64,
    reset_on_year_change: bool,
) -> Counter {
    let now = chrono::Utc::now();
    Counter {
        id: Uuid::new_v4(),
        tenant_id,
        document_type_id,
        series: series.to_string(),
        year,
        current_value,
        prefix: None,
        padding_length: 5,
        format_pattern: None,
        reset_on_year_change,
        notes: None,
        created_at: now,
        created_by: "seed".to_string(),
        updated_at: now,
        updated_by: "seed".to_string(),
        deleted_at: None,
    }
}
