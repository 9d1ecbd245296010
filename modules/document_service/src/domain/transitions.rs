//! Document status transition rules
//!
//! Pure functions over a document snapshot. The transition table is a
//! compile-time constant; business rules gate each target status.

use crate::contract::{Document, DocumentStatus, TransitionErrorKind, ValidationResult};
use rust_decimal::Decimal;

use DocumentStatus::{Cancelled, Closed, Draft, Open};

/// Statuses reachable from `from`
pub const fn available_transitions(from: DocumentStatus) -> &'static [DocumentStatus] {
    match from {
        Draft => &[Open, Cancelled],
        Open => &[Closed, Draft, Cancelled],
        Closed => &[],
        Cancelled => &[],
    }
}

/// Check the transition table only
pub fn can_transition(from: DocumentStatus, to: DocumentStatus) -> bool {
    available_transitions(from).contains(&to)
}

/// Check if a status has no outgoing transitions
pub fn is_terminal(status: DocumentStatus) -> bool {
    available_transitions(status).is_empty()
}

/// Validate a proposed status change against the table and the target's
/// business rules.
pub fn validate_transition(document: &Document, target: DocumentStatus) -> ValidationResult {
    let current = document.status;

    if !can_transition(current, target) {
        return ValidationResult::rejected(
            TransitionErrorKind::InvalidTransition,
            format!("Cannot change status from {} to {}", current, target),
        );
    }

    match target {
        Open => validate_open(document),
        Closed => validate_close(document),
        Cancelled => validate_cancel(document),
        Draft => validate_revert_to_draft(document),
    }
}

fn validate_open(document: &Document) -> ValidationResult {
    if document.business_party_id.is_none() {
        return ValidationResult::rejected(
            TransitionErrorKind::MissingBusinessParty,
            "Cannot open: document has no business party",
        );
    }
    if document.document_type_id.is_none() {
        return ValidationResult::rejected(
            TransitionErrorKind::MissingDocumentType,
            "Cannot open: document has no document type",
        );
    }
    ValidationResult::Valid
}

fn validate_close(document: &Document) -> ValidationResult {
    if document.rows.is_empty() {
        return ValidationResult::rejected(
            TransitionErrorKind::NoRows,
            "Cannot close: document has no rows",
        );
    }
    let total = document.gross_total();
    if total <= Decimal::ZERO {
        return ValidationResult::rejected(
            TransitionErrorKind::ZeroTotal,
            format!("Cannot close: gross total is {}", total),
        );
    }
    if document.business_party_id.is_none() {
        return ValidationResult::rejected(
            TransitionErrorKind::MissingBusinessParty,
            "Cannot close: document has no business party",
        );
    }
    if document.number.is_none() {
        return ValidationResult::rejected(
            TransitionErrorKind::MissingNumber,
            "Cannot close: document has no number assigned",
        );
    }
    ValidationResult::Valid
}

// The table already forbids Closed -> Cancelled; this guards direct calls.
fn validate_cancel(document: &Document) -> ValidationResult {
    if document.status == Closed {
        return ValidationResult::rejected(
            TransitionErrorKind::CannotCancelClosed,
            "Cannot cancel a closed document",
        );
    }
    ValidationResult::Valid
}

fn validate_revert_to_draft(document: &Document) -> ValidationResult {
    if document.status != Open {
        return ValidationResult::rejected(
            TransitionErrorKind::InvalidTransition,
            format!(
                "Only open documents can return to {}, current status is {}",
                Draft, document.status
            ),
        );
    }
    ValidationResult::Valid
}
