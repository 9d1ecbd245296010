//! Native client implementation - wraps domain services for in-process calls

use crate::contract::{
    Counter, CounterKey, CounterSettings, Document, DocumentNumber, DocumentStatus, DocumentsApi,
    DocumentsError, NewCounter, NewDocument, RequestContext, StatusHistoryEntry, ValidationResult,
};
use crate::domain::{CounterService, LifecycleService};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Native client implementation that directly calls the domain services
///
/// This client is used for in-process communication without HTTP overhead.
#[derive(Clone)]
pub struct NativeClient {
    counters: Arc<CounterService>,
    lifecycle: Arc<LifecycleService>,
}

impl NativeClient {
    /// Create a new native client
    pub fn new(counters: Arc<CounterService>, lifecycle: Arc<LifecycleService>) -> Self {
        Self { counters, lifecycle }
    }
}

#[async_trait]
impl DocumentsApi for NativeClient {
    async fn generate_document_number(
        &self,
        ctx: &RequestContext,
        document_type_id: Uuid,
        series: &str,
    ) -> Result<DocumentNumber, DocumentsError> {
        self.counters
            .generate_document_number(ctx, document_type_id, series)
            .await
    }

    async fn create_counter(
        &self,
        ctx: &RequestContext,
        counter: NewCounter,
    ) -> Result<Counter, DocumentsError> {
        self.counters.create_counter(ctx, counter).await
    }

    async fn update_counter(
        &self,
        ctx: &RequestContext,
        counter_id: Uuid,
        settings: CounterSettings,
    ) -> Result<Counter, DocumentsError> {
        self.counters.update_counter(ctx, counter_id, settings).await
    }

    async fn delete_counter(
        &self,
        ctx: &RequestContext,
        counter_id: Uuid,
    ) -> Result<(), DocumentsError> {
        self.counters.delete_counter(ctx, counter_id).await
    }

    async fn get_counter(
        &self,
        ctx: &RequestContext,
        key: &CounterKey,
    ) -> Result<Counter, DocumentsError> {
        self.counters.get_counter(ctx, key).await
    }

    async fn list_counters(&self, ctx: &RequestContext) -> Result<Vec<Counter>, DocumentsError> {
        self.counters.list_counters(ctx).await
    }

    async fn create_document(
        &self,
        ctx: &RequestContext,
        document: NewDocument,
    ) -> Result<Document, DocumentsError> {
        self.lifecycle.create_document(ctx, document).await
    }

    async fn get_document(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
    ) -> Result<Document, DocumentsError> {
        self.lifecycle.get_document(ctx, document_id).await
    }

    async fn assign_number(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
        series: &str,
    ) -> Result<Document, DocumentsError> {
        self.lifecycle.assign_number(ctx, document_id, series).await
    }

    async fn change_status(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
        new_status: DocumentStatus,
        reason: Option<String>,
    ) -> Result<Document, DocumentsError> {
        self.lifecycle
            .change_status(ctx, document_id, new_status, reason)
            .await
    }

    async fn get_available_transitions(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
    ) -> Result<Vec<DocumentStatus>, DocumentsError> {
        self.lifecycle.get_available_transitions(ctx, document_id).await
    }

    async fn get_status_history(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
    ) -> Result<Vec<StatusHistoryEntry>, DocumentsError> {
        self.lifecycle.get_status_history(ctx, document_id).await
    }

    async fn validate_transition(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
        new_status: DocumentStatus,
    ) -> Result<ValidationResult, DocumentsError> {
        self.lifecycle
            .validate_transition(ctx, document_id, new_status)
            .await
    }
}
