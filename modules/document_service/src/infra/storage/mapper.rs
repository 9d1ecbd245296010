//! Entity to model mappers
//!
//! Conversions between SeaORM entities and contract models

use super::entity::{counter, document, document_row, status_history};
use crate::contract::{Counter, Document, DocumentRow, DocumentStatus, StatusHistoryEntry};
use crate::domain::validation::validate_padding_length;
use anyhow::Context;
use uuid::Uuid;

// ===== Counter Conversions =====

impl TryFrom<counter::Model> for Counter {
    type Error = anyhow::Error;

    fn try_from(entity: counter::Model) -> Result<Self, Self::Error> {
        let padding_length = u8::try_from(entity.padding_length)
            .with_context(|| format!("counter {} has invalid padding_length", entity.id))?;
        validate_padding_length(padding_length)?;

        Ok(Self {
            id: entity.id,
            tenant_id: entity.tenant_id,
            document_type_id: entity.document_type_id,
            series: entity.series,
            year: entity.year,
            current_value: entity.current_value,
            prefix: entity.prefix,
            padding_length,
            format_pattern: entity.format_pattern,
            reset_on_year_change: entity.reset_on_year_change,
            notes: entity.notes,
            created_at: entity.created_at,
            created_by: entity.created_by,
            updated_at: entity.updated_at,
            updated_by: entity.updated_by,
            deleted_at: entity.deleted_at,
        })
    }
}

impl From<&Counter> for counter::ActiveModel {
    fn from(model: &Counter) -> Self {
        use sea_orm::ActiveValue::*;

        Self {
            id: Set(model.id),
            tenant_id: Set(model.tenant_id),
            document_type_id: Set(model.document_type_id),
            series: Set(model.series.clone()),
            year: Set(model.year),
            current_value: Set(model.current_value),
            prefix: Set(model.prefix.clone()),
            padding_length: Set(i16::from(model.padding_length)),
            format_pattern: Set(model.format_pattern.clone()),
            reset_on_year_change: Set(model.reset_on_year_change),
            notes: Set(model.notes.clone()),
            created_at: Set(model.created_at),
            created_by: Set(model.created_by.clone()),
            updated_at: Set(model.updated_at),
            updated_by: Set(model.updated_by.clone()),
            deleted_at: Set(model.deleted_at),
        }
    }
}

// ===== Document Conversions =====

/// Assemble a document from its row and line rows
pub fn document_from_entities(
    entity: document::Model,
    rows: Vec<document_row::Model>,
) -> anyhow::Result<Document> {
    let status: DocumentStatus = entity
        .status
        .parse()
        .with_context(|| format!("document {} has invalid status", entity.id))?;

    Ok(Document {
        id: entity.id,
        tenant_id: entity.tenant_id,
        status,
        number: entity.number,
        business_party_id: entity.business_party_id,
        document_type_id: entity.document_type_id,
        rows: rows.into_iter().map(DocumentRow::from).collect(),
        closed_at: entity.closed_at,
        version: entity.version,
        created_at: entity.created_at,
        created_by: entity.created_by,
        updated_at: entity.updated_at,
        updated_by: entity.updated_by,
    })
}

impl From<&Document> for document::ActiveModel {
    fn from(model: &Document) -> Self {
        use sea_orm::ActiveValue::*;

        Self {
            id: Set(model.id),
            tenant_id: Set(model.tenant_id),
            status: Set(model.status.as_str().to_string()),
            number: Set(model.number.clone()),
            business_party_id: Set(model.business_party_id),
            document_type_id: Set(model.document_type_id),
            closed_at: Set(model.closed_at),
            version: Set(model.version),
            created_at: Set(model.created_at),
            created_by: Set(model.created_by.clone()),
            updated_at: Set(model.updated_at),
            updated_by: Set(model.updated_by.clone()),
        }
    }
}

impl From<document_row::Model> for DocumentRow {
    fn from(entity: document_row::Model) -> Self {
        Self {
            position: entity.position,
            description: entity.description,
            quantity: entity.quantity,
            unit_price: entity.unit_price,
            vat_rate: entity.vat_rate,
        }
    }
}

/// Active model for one line of `document_id`
pub fn row_active_model(document_id: Uuid, row: &DocumentRow) -> document_row::ActiveModel {
    use sea_orm::ActiveValue::*;

    document_row::ActiveModel {
        id: Set(Uuid::new_v4()),
        document_id: Set(document_id),
        position: Set(row.position),
        description: Set(row.description.clone()),
        quantity: Set(row.quantity),
        unit_price: Set(row.unit_price),
        vat_rate: Set(row.vat_rate),
    }
}

// ===== Status History Conversions =====

impl TryFrom<status_history::Model> for StatusHistoryEntry {
    type Error = anyhow::Error;

    fn try_from(entity: status_history::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            document_id: entity.document_id,
            from_status: entity.from_status.parse()?,
            to_status: entity.to_status.parse()?,
            reason: entity.reason,
            changed_by: entity.changed_by,
            changed_at: entity.changed_at,
            client_ip: entity.client_ip,
            user_agent: entity.user_agent,
            document_version: entity.document_version,
        })
    }
}

/// Active model for a new history entry of a document owned by `tenant_id`
pub fn history_active_model(
    tenant_id: Uuid,
    entry: &StatusHistoryEntry,
) -> status_history::ActiveModel {
    use sea_orm::ActiveValue::*;

    status_history::ActiveModel {
        id: Set(entry.id),
        document_id: Set(entry.document_id),
        tenant_id: Set(tenant_id),
        from_status: Set(entry.from_status.as_str().to_string()),
        to_status: Set(entry.to_status.as_str().to_string()),
        reason: Set(entry.reason.clone()),
        changed_by: Set(entry.changed_by.clone()),
        changed_at: Set(entry.changed_at),
        client_ip: Set(entry.client_ip.clone()),
        user_agent: Set(entry.user_agent.clone()),
        document_version: Set(entry.document_version),
    }
}
