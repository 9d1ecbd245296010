//! Lifecycle service - validated status changes with an append-only history

use super::allocation::StreamKey;
use super::audit::{record_quietly, AuditEvent, AuditSink};
use super::cancellation::run_cancellable;
use super::counters::CounterService;
use super::repository::DocumentRepository;
use super::transitions;
use crate::config::Config;
use crate::contract::{
    Document, DocumentRow, DocumentStatus, DocumentsError, NewDocument, RequestContext,
    StatusHistoryEntry, ValidationResult,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Domain service for documents and their status lifecycle
pub struct LifecycleService {
    repo: Arc<dyn DocumentRepository>,
    counters: Arc<CounterService>,
    audit: Arc<dyn AuditSink>,
    system_user: String,
}

impl LifecycleService {
    /// Create a new service instance
    pub fn new(
        repo: Arc<dyn DocumentRepository>,
        counters: Arc<CounterService>,
        audit: Arc<dyn AuditSink>,
        config: &Config,
    ) -> Self {
        Self {
            repo,
            counters,
            audit,
            system_user: config.system_user.clone(),
        }
    }

    // ===== Documents =====

    /// Create a document in Draft
    pub async fn create_document(
        &self,
        ctx: &RequestContext,
        new_document: NewDocument,
    ) -> Result<Document, DocumentsError> {
        let tenant_id = ctx.tenant()?;
        if new_document.document_type_id.is_some_and(|id| id.is_nil())
            || new_document.business_party_id.is_some_and(|id| id.is_nil())
        {
            return Err(DocumentsError::validation(
                "document_type_id and business_party_id must not be nil",
            ));
        }
        let user = ctx.acting_user(&self.system_user);

        let now = Utc::now();
        let rows = new_document
            .rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| DocumentRow {
                position: i32::try_from(index + 1).unwrap_or(i32::MAX),
                description: row.description,
                quantity: row.quantity,
                unit_price: row.unit_price,
                vat_rate: row.vat_rate,
            })
            .collect();
        let document = Document {
            id: Uuid::new_v4(),
            tenant_id,
            status: DocumentStatus::Draft,
            number: None,
            business_party_id: new_document.business_party_id,
            document_type_id: new_document.document_type_id,
            rows,
            closed_at: None,
            version: 1,
            created_at: now,
            created_by: user.to_string(),
            updated_at: now,
            updated_by: user.to_string(),
        };

        let created = run_cancellable(&ctx.cancel, async {
            Ok::<_, DocumentsError>(self.repo.insert(&document).await?)
        })
        .await?;

        tracing::info!(%tenant_id, document_id = %created.id, "Document created");
        record_quietly(self.audit.as_ref(), AuditEvent::document_created(&created, user)).await;
        Ok(created)
    }

    /// Get a document with its rows
    pub async fn get_document(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
    ) -> Result<Document, DocumentsError> {
        let tenant_id = ctx.tenant()?;
        run_cancellable(&ctx.cancel, self.load(tenant_id, document_id)).await
    }

    /// Allocate a number from the document type's stream and store it on the
    /// document. Only non-terminal documents without a number qualify.
    ///
    /// The counter advance and the document write commit together, so a
    /// stale document or a cancelled call consumes no value.
    pub async fn assign_number(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
        series: &str,
    ) -> Result<Document, DocumentsError> {
        let tenant_id = ctx.tenant()?;
        let user = ctx.acting_user(&self.system_user);

        let (updated, number) = run_cancellable(&ctx.cancel, async {
            let document = self.load(tenant_id, document_id).await?;

            if transitions::is_terminal(document.status) {
                return Err(DocumentsError::Conflict {
                    reason: format!("Document {} is {} and cannot change", document_id, document.status),
                });
            }
            if let Some(number) = &document.number {
                return Err(DocumentsError::Conflict {
                    reason: format!("Document {} already has number {}", document_id, number),
                });
            }
            let document_type_id = document.document_type_id.ok_or_else(|| {
                DocumentsError::validation("Document has no document type to number it by")
            })?;

            let stream = StreamKey {
                tenant_id,
                document_type_id,
                series: series.to_string(),
            };
            let mut pending = document.clone();
            pending.version += 1;
            pending.updated_at = Utc::now();
            pending.updated_by = user.to_string();

            let _guard = self.counters.lock_stream(&stream).await;
            let (stream, pending, expected_version) = (&stream, &pending, document.version);
            self.counters
                .with_duplicate_retry(move || async move {
                    let advance = self.counters.planner(stream, user);
                    self.repo
                        .assign_number(pending, expected_version, stream, &advance)
                        .await
                })
                .await
        })
        .await?;

        tracing::info!(%tenant_id, %document_id, number = %number.formatted, "Document number assigned");
        record_quietly(
            self.audit.as_ref(),
            AuditEvent::number_allocated(tenant_id, &number, user),
        )
        .await;
        record_quietly(self.audit.as_ref(), AuditEvent::number_assigned(&updated, user)).await;
        Ok(updated)
    }

    // ===== Lifecycle =====

    /// Execute a validated status change.
    ///
    /// The status mutation and its history entry are written in one unit of
    /// work guarded by the document version. A rejected transition returns
    /// `DocumentsError::Transition` and writes nothing.
    pub async fn change_status(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
        new_status: DocumentStatus,
        reason: Option<String>,
    ) -> Result<Document, DocumentsError> {
        let tenant_id = ctx.tenant()?;
        let user = ctx.acting_user(&self.system_user);
        let reason = reason.filter(|r| !r.trim().is_empty());

        let (updated, entry) = run_cancellable(&ctx.cancel, async {
            let document = self.load(tenant_id, document_id).await?;

            if let ValidationResult::Rejected(rejection) =
                transitions::validate_transition(&document, new_status)
            {
                tracing::debug!(
                    %document_id,
                    from = %document.status,
                    to = %new_status,
                    kind = %rejection.kind,
                    "Status change rejected"
                );
                return Err(DocumentsError::Transition(rejection));
            }

            let now = Utc::now();
            let mut updated = document.clone();
            updated.status = new_status;
            if new_status == DocumentStatus::Closed {
                updated.closed_at = Some(now);
            }
            updated.version += 1;
            updated.updated_at = now;
            updated.updated_by = user.to_string();

            let entry = StatusHistoryEntry {
                id: Uuid::new_v4(),
                document_id,
                from_status: document.status,
                to_status: new_status,
                reason,
                changed_by: user.to_string(),
                changed_at: now,
                client_ip: ctx.client_ip.clone(),
                user_agent: ctx.user_agent.clone(),
                document_version: updated.version,
            };

            let saved = self
                .repo
                .apply_transition(&updated, document.version, &entry)
                .await?;
            Ok((saved, entry))
        })
        .await?;

        tracing::info!(
            %tenant_id,
            %document_id,
            from = %entry.from_status,
            to = %entry.to_status,
            user,
            "Document status changed"
        );
        record_quietly(self.audit.as_ref(), AuditEvent::status_changed(tenant_id, &entry)).await;
        Ok(updated)
    }

    /// Statuses reachable from the document's current status; empty when the
    /// document does not exist.
    pub async fn get_available_transitions(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
    ) -> Result<Vec<DocumentStatus>, DocumentsError> {
        let tenant_id = ctx.tenant()?;

        run_cancellable(&ctx.cancel, async {
            let status = self.repo.find_status(tenant_id, document_id).await?;
            Ok::<_, DocumentsError>(
                status
                    .map(|s| transitions::available_transitions(s).to_vec())
                    .unwrap_or_default(),
            )
        })
        .await
    }

    /// Status history, most recent first
    pub async fn get_status_history(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
    ) -> Result<Vec<StatusHistoryEntry>, DocumentsError> {
        let tenant_id = ctx.tenant()?;

        run_cancellable(&ctx.cancel, async {
            Ok::<_, DocumentsError>(self.repo.status_history(tenant_id, document_id).await?)
        })
        .await
    }

    /// Dry-run a status change against the document's current state
    pub async fn validate_transition(
        &self,
        ctx: &RequestContext,
        document_id: Uuid,
        new_status: DocumentStatus,
    ) -> Result<ValidationResult, DocumentsError> {
        let tenant_id = ctx.tenant()?;

        let document = run_cancellable(&ctx.cancel, self.load(tenant_id, document_id)).await?;
        Ok(transitions::validate_transition(&document, new_status))
    }

    // ===== Helper Methods =====

    async fn load(&self, tenant_id: Uuid, document_id: Uuid) -> Result<Document, DocumentsError> {
        self.repo
            .find_by_id(tenant_id, document_id)
            .await?
            .ok_or_else(|| DocumentsError::not_found("document", document_id))
    }
}
