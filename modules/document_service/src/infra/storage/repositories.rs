//! SeaORM repository implementations

use crate::contract::{
    Counter, CounterKey, Document, DocumentNumber, DocumentStatus, StatusHistoryEntry,
};
use crate::domain::allocation::{CounterWrite, StreamKey};
use crate::domain::format::issue_number;
use crate::domain::repository::{
    AdvanceFn, CounterRepository, DocumentRepository, StoreError, StoreResult,
};
use async_trait::async_trait;
use sea_orm::{
    prelude::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend,
    DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use super::entity::{counter, document, document_row, status_history};
use super::mapper::{document_from_entities, history_active_model, row_active_model};

/// Classify a database error; unique violations become `Duplicate`
fn map_db_err(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::Duplicate(detail),
        _ => StoreError::Backend(err.into()),
    }
}

// ===== Counter Repository =====

pub struct SeaOrmCounterRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmCounterRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn live_counters(tenant_id: Uuid) -> sea_orm::Select<counter::Entity> {
    counter::Entity::find()
        .filter(counter::Column::TenantId.eq(tenant_id))
        .filter(counter::Column::DeletedAt.is_null())
}

#[async_trait]
impl CounterRepository for SeaOrmCounterRepository {
    async fn insert(&self, model: &Counter) -> StoreResult<Counter> {
        let active: counter::ActiveModel = model.into();
        let saved = active.insert(&*self.db).await.map_err(map_db_err)?;
        Ok(Counter::try_from(saved)?)
    }

    async fn update_settings(&self, model: &Counter) -> StoreResult<Counter> {
        use sea_orm::ActiveValue::{Set, Unchanged};

        let active = counter::ActiveModel {
            id: Unchanged(model.id),
            prefix: Set(model.prefix.clone()),
            padding_length: Set(i16::from(model.padding_length)),
            format_pattern: Set(model.format_pattern.clone()),
            reset_on_year_change: Set(model.reset_on_year_change),
            notes: Set(model.notes.clone()),
            updated_at: Set(model.updated_at),
            updated_by: Set(model.updated_by.clone()),
            ..Default::default()
        };
        let saved = active.update(&*self.db).await.map_err(map_db_err)?;
        Ok(Counter::try_from(saved)?)
    }

    async fn soft_delete(
        &self,
        tenant_id: Uuid,
        counter_id: Uuid,
        deleted_by: &str,
    ) -> StoreResult<bool> {
        let now = chrono::Utc::now();
        let result = counter::Entity::update_many()
            .col_expr(counter::Column::DeletedAt, Expr::value(now))
            .col_expr(counter::Column::UpdatedAt, Expr::value(now))
            .col_expr(counter::Column::UpdatedBy, Expr::value(deleted_by))
            .filter(counter::Column::Id.eq(counter_id))
            .filter(counter::Column::TenantId.eq(tenant_id))
            .filter(counter::Column::DeletedAt.is_null())
            .exec(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn find_by_id(&self, tenant_id: Uuid, counter_id: Uuid) -> StoreResult<Option<Counter>> {
        let result = live_counters(tenant_id)
            .filter(counter::Column::Id.eq(counter_id))
            .one(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Counter::try_from).transpose()?)
    }

    async fn find_by_key(&self, tenant_id: Uuid, key: &CounterKey) -> StoreResult<Option<Counter>> {
        let mut query = live_counters(tenant_id)
            .filter(counter::Column::DocumentTypeId.eq(key.document_type_id))
            .filter(counter::Column::Series.eq(key.series.as_str()));

        query = match key.year {
            Some(year) => query.filter(counter::Column::Year.eq(year)),
            None => query.filter(counter::Column::Year.is_null()),
        };

        let result = query.one(&*self.db).await.map_err(map_db_err)?;
        Ok(result.map(Counter::try_from).transpose()?)
    }

    async fn list(&self, tenant_id: Uuid) -> StoreResult<Vec<Counter>> {
        let results = live_counters(tenant_id)
            .order_by_asc(counter::Column::DocumentTypeId)
            .order_by_asc(counter::Column::Series)
            .order_by_asc(counter::Column::Year)
            .all(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(results
            .into_iter()
            .map(Counter::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }

    async fn allocate(&self, stream: &StreamKey, advance: AdvanceFn<'_>) -> StoreResult<Counter> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let saved = advance_in(&txn, stream, advance).await?;
        txn.commit().await.map_err(map_db_err)?;
        Ok(saved)
    }
}

/// Load the stream's live rows with exclusive access inside `txn`, apply
/// `advance` and write the result. The caller commits.
async fn advance_in(
    txn: &DatabaseTransaction,
    stream: &StreamKey,
    advance: AdvanceFn<'_>,
) -> StoreResult<Counter> {
    use sea_orm::ActiveValue::{Set, Unchanged};

    let mut query = live_counters(stream.tenant_id)
        .filter(counter::Column::DocumentTypeId.eq(stream.document_type_id))
        .filter(counter::Column::Series.eq(stream.series.as_str()));
    // SQLite serializes writers on its own and has no FOR UPDATE
    if txn.get_database_backend() != DatabaseBackend::Sqlite {
        query = query.lock_exclusive();
    }

    let rows = query
        .all(txn)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .map(Counter::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let saved = match advance(rows) {
        CounterWrite::Insert(next) => {
            let active: counter::ActiveModel = (&next).into();
            active.insert(txn).await
        }
        CounterWrite::Update(next) => {
            counter::ActiveModel {
                id: Unchanged(next.id),
                year: Set(next.year),
                current_value: Set(next.current_value),
                updated_at: Set(next.updated_at),
                updated_by: Set(next.updated_by.clone()),
                ..Default::default()
            }
            .update(txn)
            .await
        }
    }
    .map_err(map_db_err)?;

    Ok(Counter::try_from(saved)?)
}

// ===== Document Repository =====

pub struct SeaOrmDocumentRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmDocumentRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentRepository for SeaOrmDocumentRepository {
    async fn insert(&self, model: &Document) -> StoreResult<Document> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let active: document::ActiveModel = model.into();
        active.insert(&txn).await.map_err(map_db_err)?;

        if !model.rows.is_empty() {
            document_row::Entity::insert_many(
                model.rows.iter().map(|row| row_active_model(model.id, row)),
            )
            .exec(&txn)
            .await
            .map_err(map_db_err)?;
        }

        txn.commit().await.map_err(map_db_err)?;
        Ok(model.clone())
    }

    async fn find_by_id(&self, tenant_id: Uuid, document_id: Uuid) -> StoreResult<Option<Document>> {
        let Some(found) = document::Entity::find_by_id(document_id)
            .filter(document::Column::TenantId.eq(tenant_id))
            .one(&*self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        let rows = document_row::Entity::find()
            .filter(document_row::Column::DocumentId.eq(document_id))
            .order_by_asc(document_row::Column::Position)
            .all(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(Some(document_from_entities(found, rows)?))
    }

    async fn find_status(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> StoreResult<Option<DocumentStatus>> {
        let status: Option<String> = document::Entity::find_by_id(document_id)
            .filter(document::Column::TenantId.eq(tenant_id))
            .select_only()
            .column(document::Column::Status)
            .into_tuple::<String>()
            .one(&*self.db)
            .await
            .map_err(map_db_err)?;

        status
            .map(|s| s.parse::<DocumentStatus>())
            .transpose()
            .map_err(|e| StoreError::Backend(anyhow::anyhow!(e)))
    }

    async fn assign_number(
        &self,
        model: &Document,
        expected_version: i64,
        stream: &StreamKey,
        advance: AdvanceFn<'_>,
    ) -> StoreResult<(Document, DocumentNumber)> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let counter = advance_in(&txn, stream, advance).await?;
        let number = issue_number(&counter);

        let result = document::Entity::update_many()
            .col_expr(document::Column::Number, Expr::value(number.formatted.clone()))
            .col_expr(document::Column::Version, Expr::value(model.version))
            .col_expr(document::Column::UpdatedAt, Expr::value(model.updated_at))
            .col_expr(document::Column::UpdatedBy, Expr::value(model.updated_by.clone()))
            .filter(document::Column::Id.eq(model.id))
            .filter(document::Column::TenantId.eq(model.tenant_id))
            .filter(document::Column::Version.eq(expected_version))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            // Rolls back the counter advance with it
            return Err(StoreError::StaleVersion {
                entity: "document",
                id: model.id,
            });
        }

        txn.commit().await.map_err(map_db_err)?;

        let mut numbered = model.clone();
        numbered.number = Some(number.formatted.clone());
        Ok((numbered, number))
    }

    async fn apply_transition(
        &self,
        model: &Document,
        expected_version: i64,
        entry: &StatusHistoryEntry,
    ) -> StoreResult<Document> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let result = document::Entity::update_many()
            .col_expr(document::Column::Status, Expr::value(model.status.as_str()))
            .col_expr(document::Column::ClosedAt, Expr::value(model.closed_at))
            .col_expr(document::Column::Version, Expr::value(model.version))
            .col_expr(document::Column::UpdatedAt, Expr::value(model.updated_at))
            .col_expr(document::Column::UpdatedBy, Expr::value(model.updated_by.clone()))
            .filter(document::Column::Id.eq(model.id))
            .filter(document::Column::TenantId.eq(model.tenant_id))
            .filter(document::Column::Version.eq(expected_version))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            // Dropping the transaction rolls it back
            return Err(StoreError::StaleVersion {
                entity: "document",
                id: model.id,
            });
        }

        history_active_model(model.tenant_id, entry)
            .insert(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(model.clone())
    }

    async fn status_history(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> StoreResult<Vec<StatusHistoryEntry>> {
        let results = status_history::Entity::find()
            .filter(status_history::Column::DocumentId.eq(document_id))
            .filter(status_history::Column::TenantId.eq(tenant_id))
            .order_by_desc(status_history::Column::ChangedAt)
            .order_by_desc(status_history::Column::DocumentVersion)
            .all(&*self.db)
            .await
            .map_err(map_db_err)?;

        Ok(results
            .into_iter()
            .map(StatusHistoryEntry::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }
}
