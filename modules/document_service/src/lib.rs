//! Document Service Module
//!
//! Gapless, tenant-scoped document numbering and the document status
//! lifecycle (Draft, Open, Closed, Cancelled) with an append-only history.

// Public exports
pub mod contract;
pub use contract::{
    client::DocumentsApi, error::DocumentsError, Counter, CounterKey, CounterSettings, Document,
    DocumentNumber, DocumentRow, DocumentStatus, NewCounter, NewDocument, NewDocumentRow,
    RequestContext, StatusHistoryEntry, TransitionErrorKind, TransitionRejection,
    ValidationResult,
};

pub mod config;
pub use config::Config;

pub mod module;
pub use module::DocumentServiceModule;

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
