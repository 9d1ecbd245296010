//! Native client trait for inter-module communication
//!
//! This trait defines the API that controllers, schedulers and other modules
//! use to interact with the document service.

use super::error::DocumentsError;
use super::model::{
    Counter, CounterKey, CounterSettings, Document, DocumentNumber, DocumentStatus, NewCounter,
    NewDocument, RequestContext, StatusHistoryEntry, ValidationResult,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Document service API for inter-module communication
#[async_trait]
pub trait DocumentsApi: Send + Sync {
    // ===== Numbering =====

    /// Allocate the next number of the (document type, series) stream
    async fn generate_document_number(
        &self,
        ctx: &RequestContext,
        document_type_id: Uuid,
        series: &str,
    ) -> Result<DocumentNumber, DocumentsError>;

    /// Configure a counter explicitly; fails if one already exists for the key
    async fn create_counter(
        &self,
        ctx: &RequestContext,
        counter: NewCounter,
    ) -> Result<Counter, DocumentsError>;

    /// Replace a counter's configuration
    async fn update_counter(
        &self,
        ctx: &RequestContext,
        counter_id: Uuid,
        settings: CounterSettings,
    ) -> Result<Counter, DocumentsError>;

    /// Retire a counter (soft delete)
    async fn delete_counter(&self, ctx: &RequestContext, counter_id: Uuid)
        -> Result<(), DocumentsError>;

    /// Get a counter by its exact key
    async fn get_counter(
        &self,
        ctx: &RequestContext,
        key: &CounterKey,
    ) -> Result<Counter, DocumentsError>;

    /// List the tenant's live counters
    async fn list_counters(&self, ctx: &RequestContext) -> Result<Vec<Counter>, DocumentsError>;

    // ===== Documents =====

    /// Create a document in Draft
    async fn create_document(
        &self,
        ctx: &RequestContext,
        document: NewDocument,
    ) -> Result<Document, DocumentsError>;

    /// Get a document with its rows
    async fn get_document(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
    ) -> Result<Document, DocumentsError>;

    /// Allocate and store a number for a document that has none
    async fn assign_number(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
        series: &str,
    ) -> Result<Document, DocumentsError>;

    // ===== Lifecycle =====

    /// Execute a validated status change and record it in the history
    async fn change_status(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
        new_status: DocumentStatus,
        reason: Option<String>,
    ) -> Result<Document, DocumentsError>;

    /// Statuses reachable from the document's current status
    async fn get_available_transitions(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
    ) -> Result<Vec<DocumentStatus>, DocumentsError>;

    /// Status history, most recent first
    async fn get_status_history(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
    ) -> Result<Vec<StatusHistoryEntry>, DocumentsError>;

    /// Dry-run a status change
    async fn validate_transition(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
        new_status: DocumentStatus,
    ) -> Result<ValidationResult, DocumentsError>;
}
