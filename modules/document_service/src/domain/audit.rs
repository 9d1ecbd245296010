//! Audit events for document service
//!
//! Every successful mutation is reported to an `AuditSink` after it commits:
//! - Counter events: explicit configuration changes and allocations
//! - Document events: creation, number assignment and status changes
//!
//! Recording is fire-and-forget from the service's point of view.

use crate::contract::{Counter, Document, DocumentNumber, StatusHistoryEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Counter was configured explicitly
    CounterCreated(CounterChangedEvent),
    /// Counter configuration was replaced
    CounterUpdated(CounterChangedEvent),
    /// Counter was retired (soft delete)
    CounterRetired(CounterChangedEvent),
    /// A number was allocated from a counter
    NumberAllocated(NumberAllocatedEvent),
    /// Document was created in draft
    DocumentCreated(DocumentChangedEvent),
    /// Document received its number
    NumberAssigned(DocumentChangedEvent),
    /// Document status changed
    StatusChanged(StatusChangedEvent),
}

/// Event data for counter configuration changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterChangedEvent {
    pub counter_id: Uuid,
    pub tenant_id: Uuid,
    pub document_type_id: Uuid,
    pub series: String,
    pub year: Option<i32>,
    pub user: String,
    pub timestamp: DateTime<Utc>,
}

/// Event data for an allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberAllocatedEvent {
    pub counter_id: Uuid,
    pub tenant_id: Uuid,
    pub number: String,
    pub value: i64,
    pub user: String,
    pub timestamp: DateTime<Utc>,
}

/// Event data for document changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChangedEvent {
    pub document_id: Uuid,
    pub tenant_id: Uuid,
    pub number: Option<String>,
    pub version: i64,
    pub user: String,
    pub timestamp: DateTime<Utc>,
}

/// Event data for status changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangedEvent {
    pub document_id: Uuid,
    pub tenant_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub reason: Option<String>,
    pub user: String,
    pub client_ip: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Write-only recorder of "entity X changed by user Y" events
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    /// Record an event. Errors are reported but never undo the mutation.
    async fn record(&self, event: AuditEvent) -> anyhow::Result<()>;
}

/// No-op sink for testing or when auditing is handled elsewhere
pub struct NoOpAuditSink;

#[async_trait::async_trait]
impl AuditSink for NoOpAuditSink {
    async fn record(&self, _event: AuditEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Sink that writes events to the `audit` tracing target as JSON
pub struct TracingAuditSink;

#[async_trait::async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&event)?;
        tracing::info!(target: "audit", event = %payload, "audit event");
        Ok(())
    }
}

/// Record an event, logging failures instead of returning them
pub async fn record_quietly(sink: &dyn AuditSink, event: AuditEvent) {
    if let Err(e) = sink.record(event).await {
        tracing::warn!(error = %e, "Failed to record audit event");
    }
}

impl AuditEvent {
    fn counter_changed(counter: &Counter, user: &str) -> CounterChangedEvent {
        CounterChangedEvent {
            counter_id: counter.id,
            tenant_id: counter.tenant_id,
            document_type_id: counter.document_type_id,
            series: counter.series.clone(),
            year: counter.year,
            user: user.to_string(),
            timestamp: Utc::now(),
        }
    }

    fn document_changed(document: &Document, user: &str) -> DocumentChangedEvent {
        DocumentChangedEvent {
            document_id: document.id,
            tenant_id: document.tenant_id,
            number: document.number.clone(),
            version: document.version,
            user: user.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn counter_created(counter: &Counter, user: &str) -> Self {
        AuditEvent::CounterCreated(Self::counter_changed(counter, user))
    }

    pub fn counter_updated(counter: &Counter, user: &str) -> Self {
        AuditEvent::CounterUpdated(Self::counter_changed(counter, user))
    }

    pub fn counter_retired(counter: &Counter, user: &str) -> Self {
        AuditEvent::CounterRetired(Self::counter_changed(counter, user))
    }

    pub fn number_allocated(tenant_id: Uuid, number: &DocumentNumber, user: &str) -> Self {
        AuditEvent::NumberAllocated(NumberAllocatedEvent {
            counter_id: number.counter_id,
            tenant_id,
            number: number.formatted.clone(),
            value: number.value,
            user: user.to_string(),
            timestamp: Utc::now(),
        })
    }

    pub fn document_created(document: &Document, user: &str) -> Self {
        AuditEvent::DocumentCreated(Self::document_changed(document, user))
    }

    pub fn number_assigned(document: &Document, user: &str) -> Self {
        AuditEvent::NumberAssigned(Self::document_changed(document, user))
    }

    pub fn status_changed(tenant_id: Uuid, entry: &StatusHistoryEntry) -> Self {
        AuditEvent::StatusChanged(StatusChangedEvent {
            document_id: entry.document_id,
            tenant_id,
            from_status: entry.from_status.to_string(),
            to_status: entry.to_status.to_string(),
            reason: entry.reason.clone(),
            user: entry.changed_by.clone(),
            client_ip: entry.client_ip.clone(),
            timestamp: entry.changed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::DocumentStatus;

    fn make_entry() -> StatusHistoryEntry {
        StatusHistoryEntry {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            from_status: DocumentStatus::Draft,
            to_status: DocumentStatus::Open,
            reason: Some("ready".to_string()),
            changed_by: "alice".to_string(),
            changed_at: Utc::now(),
            client_ip: Some("10.0.0.7".to_string()),
            user_agent: None,
            document_version: 2,
        }
    }

    #[test]
    fn test_status_changed_event_creation() {
        let entry = make_entry();
        let tenant_id = Uuid::new_v4();

        match AuditEvent::status_changed(tenant_id, &entry) {
            AuditEvent::StatusChanged(e) => {
                assert_eq!(e.document_id, entry.document_id);
                assert_eq!(e.tenant_id, tenant_id);
                assert_eq!(e.from_status, "DRAFT");
                assert_eq!(e.to_status, "OPEN");
                assert_eq!(e.user, "alice");
                assert_eq!(e.timestamp, entry.changed_at);
            }
            other => panic!("Expected StatusChanged event, got: {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = AuditEvent::status_changed(Uuid::new_v4(), &make_entry());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "status_changed");
        assert_eq!(json["to_status"], "OPEN");
    }

    #[tokio::test]
    async fn test_sinks_accept_events() {
        let event = AuditEvent::status_changed(Uuid::new_v4(), &make_entry());

        assert!(NoOpAuditSink.record(event.clone()).await.is_ok());
        assert!(TracingAuditSink.record(event.clone()).await.is_ok());
        record_quietly(&NoOpAuditSink, event).await;
    }
}
