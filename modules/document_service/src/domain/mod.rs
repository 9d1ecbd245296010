//! Domain layer - business logic and services

pub mod allocation;
pub mod audit;
pub mod cancellation;
pub mod counters;
pub mod format;
pub mod lifecycle;
pub mod repository;
pub mod transitions;
pub mod validation;

pub use audit::{AuditEvent, AuditSink, NoOpAuditSink, TracingAuditSink};
pub use counters::CounterService;
pub use lifecycle::LifecycleService;
pub use repository::{CounterRepository, DocumentRepository, StoreError};
