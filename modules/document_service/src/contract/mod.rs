//! Contract layer - public API for inter-module communication
//!
//! This layer contains transport-agnostic models and the native client trait.
//! NO serde derives on models - these are pure domain types.

pub mod client;
pub mod error;
pub mod model;

pub use client::DocumentsApi;
pub use error::DocumentsError;
pub use model::{
    Counter, CounterKey, CounterSettings, Document, DocumentNumber, DocumentRow, DocumentStatus,
    NewCounter, NewDocument, NewDocumentRow, RequestContext, StatusHistoryEntry,
    TransitionErrorKind, TransitionRejection, ValidationResult,
};
