//! Repository traits for data access
//!
//! These traits define the interface for data access operations.
//! Implementations are in infra/storage/repositories.rs

use super::allocation::{CounterWrite, StreamKey};
use crate::contract::{
    Counter, CounterKey, Document, DocumentNumber, DocumentStatus, DocumentsError,
    StatusHistoryEntry,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Storage failures the domain distinguishes
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key is already taken by a live row
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// The row changed since it was read
    #[error("Stale version for {entity} {id}")]
    StaleVersion { entity: &'static str, id: Uuid },

    /// Connectivity, transaction or mapping failure
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for DocumentsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(key) => DocumentsError::Conflict {
                reason: format!("Duplicate key: {}", key),
            },
            StoreError::StaleVersion { id, .. } => {
                DocumentsError::ConcurrentModification { document_id: id }
            }
            StoreError::Backend(e) => {
                tracing::error!(error = ?e, "Persistence failure");
                DocumentsError::Persistence {
                    message: format!("{:#}", e),
                }
            }
        }
    }
}

/// Computes the next counter state from the stream's live rows.
/// Called while the rows are locked, exactly once per attempt.
pub type AdvanceFn<'a> = &'a (dyn Fn(Vec<Counter>) -> CounterWrite + Send + Sync);

/// Repository for numbering counters
#[async_trait]
pub trait CounterRepository: Send + Sync {
    /// Insert an explicitly configured counter.
    /// Fails with `Duplicate` if a live counter holds the same key.
    async fn insert(&self, counter: &Counter) -> StoreResult<Counter>;

    /// Write configuration columns (prefix, padding, pattern, reset flag, notes)
    async fn update_settings(&self, counter: &Counter) -> StoreResult<Counter>;

    /// Mark a counter as retired; returns false if no live counter matched
    async fn soft_delete(&self, tenant_id: Uuid, counter_id: Uuid, deleted_by: &str)
        -> StoreResult<bool>;

    /// Find a live counter by id
    async fn find_by_id(&self, tenant_id: Uuid, counter_id: Uuid) -> StoreResult<Option<Counter>>;

    /// Find a live counter by exact key
    async fn find_by_key(&self, tenant_id: Uuid, key: &CounterKey) -> StoreResult<Option<Counter>>;

    /// List live counters ordered by document type, series and year
    async fn list(&self, tenant_id: Uuid) -> StoreResult<Vec<Counter>>;

    /// Run one allocation as a single unit of work: load the stream's live rows
    /// with exclusive access, apply `advance`, persist the result and commit.
    /// Fails with `Duplicate` when a concurrent first use inserted the same key;
    /// nothing is persisted in that case.
    async fn allocate(&self, stream: &StreamKey, advance: AdvanceFn<'_>) -> StoreResult<Counter>;
}

/// Repository for documents and their status history.
///
/// History rows are written only by `apply_transition`; there is no way to
/// update or delete them.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Insert a document with its rows
    async fn insert(&self, document: &Document) -> StoreResult<Document>;

    /// Find a document with its rows
    async fn find_by_id(&self, tenant_id: Uuid, document_id: Uuid) -> StoreResult<Option<Document>>;

    /// Load only the status of a document
    async fn find_status(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> StoreResult<Option<DocumentStatus>>;

    /// Advance the counter of `stream` with `advance` and store the issued
    /// number on `document`, all in one unit of work, provided the stored
    /// version still equals `expected_version`. On any failure nothing is
    /// persisted and no value is consumed.
    async fn assign_number(
        &self,
        document: &Document,
        expected_version: i64,
        stream: &StreamKey,
        advance: AdvanceFn<'_>,
    ) -> StoreResult<(Document, DocumentNumber)>;

    /// Persist the new status of `document` and append `entry` atomically,
    /// provided the stored version still equals `expected_version`.
    async fn apply_transition(
        &self,
        document: &Document,
        expected_version: i64,
        entry: &StatusHistoryEntry,
    ) -> StoreResult<Document>;

    /// Status history of a document, most recent first
    async fn status_history(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> StoreResult<Vec<StatusHistoryEntry>>;
}
