//! Contract error types for document service
//!
//! These errors are transport-agnostic and used for inter-module communication.

use super::model::{TransitionErrorKind, TransitionRejection};
use uuid::Uuid;

/// Document service domain errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentsError {
    /// No tenant scope could be resolved for the call
    #[error("Tenant scope is missing")]
    MissingScope,

    /// Invalid input (missing identifiers, out-of-range configuration)
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Counter or document not found
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Duplicate counter key, number already assigned, etc.
    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    /// Status transition rejected by the transition rules
    #[error("Transition rejected: {0}")]
    Transition(TransitionRejection),

    /// The document changed between load and write
    #[error("Document {document_id} was modified concurrently")]
    ConcurrentModification { document_id: Uuid },

    /// The caller cancelled the operation; nothing was stored
    #[error("Operation cancelled")]
    Cancelled,

    /// Storage failure; the unit of work was rolled back
    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl DocumentsError {
    /// Kind of the transition rejection, if this is one
    pub fn transition_kind(&self) -> Option<TransitionErrorKind> {
        match self {
            Self::Transition(rejection) => Some(rejection.kind),
            _ => None,
        }
    }

    pub(crate) fn not_found(resource: &str, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
