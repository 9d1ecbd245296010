//! Contract models for document service
//!
//! These models are transport-agnostic and used for inter-module communication.
//! NO serde derives - these are pure domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::DocumentsError;

// ===== Counters =====

/// Identity of one numbering stream configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    /// Document type the stream numbers
    pub document_type_id: Uuid,
    /// Series label; empty string is the default series
    pub series: String,
    /// Year scope; `None` when the stream is not year-scoped
    pub year: Option<i32>,
}

impl CounterKey {
    pub fn new(document_type_id: Uuid, series: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            document_type_id,
            series: series.into(),
            year,
        }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{}/{}/{}", self.document_type_id, self.series, year),
            None => write!(f, "{}/{}", self.document_type_id, self.series),
        }
    }
}

/// Current allocation state of one numbering stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub document_type_id: Uuid,
    pub series: String,
    pub year: Option<i32>,
    /// Last allocated value (0 before the first allocation)
    pub current_value: i64,
    pub prefix: Option<String>,
    /// Zero-padding width of the numeric part (1..=10)
    pub padding_length: u8,
    /// Template with `{PREFIX}`, `{SERIES}`, `{YEAR}`, `{NUMBER}` placeholders
    pub format_pattern: Option<String>,
    pub reset_on_year_change: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    /// Soft delete timestamp
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Counter {
    pub fn key(&self) -> CounterKey {
        CounterKey::new(self.document_type_id, self.series.clone(), self.year)
    }
}

/// Request to configure a counter explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCounter {
    pub key: CounterKey,
    /// Value the stream continues from; the next allocation returns `starting_value + 1`
    pub starting_value: i64,
    pub settings: CounterSettings,
}

/// Mutable configuration of a counter. Never includes the value or the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSettings {
    pub prefix: Option<String>,
    pub padding_length: u8,
    pub format_pattern: Option<String>,
    pub reset_on_year_change: bool,
    pub notes: Option<String>,
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            prefix: None,
            padding_length: 5,
            format_pattern: None,
            reset_on_year_change: true,
            notes: None,
        }
    }
}

/// Result of one allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNumber {
    /// Rendered document number
    pub formatted: String,
    /// Raw counter value produced by this allocation
    pub value: i64,
    pub year: Option<i32>,
    pub counter_id: Uuid,
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted)
    }
}

// ===== Documents =====

/// Document lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    Draft,
    Open,
    Closed,
    Cancelled,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 4] = [
        DocumentStatus::Draft,
        DocumentStatus::Open,
        DocumentStatus::Closed,
        DocumentStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Draft => "DRAFT",
            DocumentStatus::Open => "OPEN",
            DocumentStatus::Closed => "CLOSED",
            DocumentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = DocumentsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(DocumentStatus::Draft),
            "OPEN" => Ok(DocumentStatus::Open),
            "CLOSED" => Ok(DocumentStatus::Closed),
            "CANCELLED" => Ok(DocumentStatus::Cancelled),
            other => Err(DocumentsError::Validation {
                message: format!("unknown document status '{}'", other),
            }),
        }
    }
}

/// Document line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub position: i32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// VAT rate in percent
    pub vat_rate: Decimal,
}

impl DocumentRow {
    /// Gross amount of the line including VAT
    pub fn gross_amount(&self) -> Decimal {
        let net = self.quantity * self.unit_price;
        net + net * self.vat_rate / Decimal::ONE_HUNDRED
    }
}

/// Document whose lifecycle is governed by the transition rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub status: DocumentStatus,
    /// Assigned document number; `None` until allocated
    pub number: Option<String>,
    pub business_party_id: Option<Uuid>,
    pub document_type_id: Option<Uuid>,
    pub rows: Vec<DocumentRow>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, incremented by every mutation
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl Document {
    /// Sum of the rows' gross amounts, rounded to cents
    pub fn gross_total(&self) -> Decimal {
        self.rows
            .iter()
            .map(DocumentRow::gross_amount)
            .sum::<Decimal>()
            .round_dp(2)
    }
}

/// Request to create a draft document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDocument {
    pub document_type_id: Option<Uuid>,
    pub business_party_id: Option<Uuid>,
    pub rows: Vec<NewDocumentRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocumentRow {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vat_rate: Decimal,
}

/// Immutable audit record of one executed transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub document_id: Uuid,
    pub from_status: DocumentStatus,
    pub to_status: DocumentStatus,
    pub reason: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    /// Document version reached by this transition
    pub document_version: i64,
}

// ===== Transition validation =====

/// Stable reason a transition was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionErrorKind {
    InvalidTransition,
    MissingBusinessParty,
    MissingDocumentType,
    NoRows,
    ZeroTotal,
    MissingNumber,
    CannotCancelClosed,
}

impl TransitionErrorKind {
    /// Stable machine-readable code
    pub fn code(self) -> &'static str {
        match self {
            TransitionErrorKind::InvalidTransition => "INVALID_TRANSITION",
            TransitionErrorKind::MissingBusinessParty => "MISSING_BUSINESS_PARTY",
            TransitionErrorKind::MissingDocumentType => "MISSING_DOCUMENT_TYPE",
            TransitionErrorKind::NoRows => "NO_ROWS",
            TransitionErrorKind::ZeroTotal => "ZERO_TOTAL",
            TransitionErrorKind::MissingNumber => "MISSING_NUMBER",
            TransitionErrorKind::CannotCancelClosed => "CANNOT_CANCEL_CLOSED",
        }
    }
}

impl fmt::Display for TransitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A rejected transition: stable kind plus a human-readable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRejection {
    pub kind: TransitionErrorKind,
    pub message: String,
}

impl TransitionRejection {
    pub fn new(kind: TransitionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransitionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

/// Outcome of a side-effect-free transition check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// The transition may be executed
    Valid,
    /// The transition is not allowed
    Rejected(TransitionRejection),
}

impl ValidationResult {
    pub fn rejected(kind: TransitionErrorKind, message: impl Into<String>) -> Self {
        ValidationResult::Rejected(TransitionRejection::new(kind, message))
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Kind of the rejection, if any
    pub fn error_kind(&self) -> Option<TransitionErrorKind> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Rejected(rejection) => Some(rejection.kind),
        }
    }

    /// Convert into the error raised by mutating operations
    pub fn into_result(self) -> Result<(), DocumentsError> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Rejected(rejection) => Err(DocumentsError::Transition(rejection)),
        }
    }
}

// ===== Request context =====

/// Per-call scope, actor and cancellation context
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Tenant scope; every operation fails with `MissingScope` when absent
    pub tenant_id: Option<Uuid>,
    /// Acting user; the configured system user is used when absent
    pub user: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    /// Cancels the unit of work of the call
    pub cancel: CancellationToken,
}

impl RequestContext {
    /// Create a context for a tenant and acting user
    pub fn new(tenant_id: Uuid, user: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            user: Some(user.into()),
            ..Default::default()
        }
    }

    /// Create a context for background work without a user
    pub fn system(tenant_id: Uuid) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            ..Default::default()
        }
    }

    pub fn with_client(mut self, client_ip: Option<String>, user_agent: Option<String>) -> Self {
        self.client_ip = client_ip;
        self.user_agent = user_agent;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve the tenant scope
    pub fn tenant(&self) -> Result<Uuid, DocumentsError> {
        self.tenant_id.ok_or(DocumentsError::MissingScope)
    }

    /// Acting user, or `fallback` when the caller is anonymous
    pub fn acting_user<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.user
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(fallback)
    }
}
