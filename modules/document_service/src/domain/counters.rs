//! Counter service - number allocation and counter configuration

use super::allocation::{
    plan_allocation, AllocationRequest, CounterDefaults, CounterWrite, StreamKey,
};
use super::audit::{record_quietly, AuditEvent, AuditSink};
use super::cancellation::run_cancellable;
use super::format::issue_number;
use super::repository::{CounterRepository, StoreError, StoreResult};
use super::validation::{validate_document_type_id, validate_new_counter, validate_settings};
use crate::config::Config;
use crate::contract::{
    Counter, CounterKey, CounterSettings, DocumentNumber, DocumentsError, NewCounter,
    RequestContext,
};
use chrono::{Datelike, Utc};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Domain service for document numbering
pub struct CounterService {
    repo: Arc<dyn CounterRepository>,
    audit: Arc<dyn AuditSink>,
    defaults: CounterDefaults,
    retry_attempts: u32,
    system_user: String,
    /// One async lock per stream, held for the whole read-increment-write
    stream_locks: DashMap<StreamKey, Arc<Mutex<()>>>,
}

impl CounterService {
    /// Create a new service instance
    pub fn new(repo: Arc<dyn CounterRepository>, audit: Arc<dyn AuditSink>, config: &Config) -> Self {
        Self {
            repo,
            audit,
            defaults: config.counter_defaults(),
            retry_attempts: config.allocation_retry_attempts.max(1),
            system_user: config.system_user.clone(),
            stream_locks: DashMap::new(),
        }
    }

    // ===== Allocation =====

    /// Allocate the next number of the (document type, series) stream
    pub async fn generate_document_number(
        &self,
        ctx: &RequestContext,
        document_type_id: Uuid,
        series: &str,
    ) -> Result<DocumentNumber, DocumentsError> {
        let tenant_id = ctx.tenant()?;
        validate_document_type_id(document_type_id)?;
        let user = ctx.acting_user(&self.system_user);
        let stream = StreamKey {
            tenant_id,
            document_type_id,
            series: series.to_string(),
        };

        // The stream lock is released when the unit of work ends; auditing
        // happens after the commit and never turns it into a cancellation.
        let counter = run_cancellable(&ctx.cancel, async {
            let _guard = self.lock_stream(&stream).await;
            let stream = &stream;
            self.with_duplicate_retry(move || async move {
                let advance = self.planner(stream, user);
                self.repo.allocate(stream, &advance).await
            })
            .await
        })
        .await?;
        let number = issue_number(&counter);

        tracing::debug!(
            %tenant_id,
            %document_type_id,
            series,
            number = %number.formatted,
            value = number.value,
            "Allocated document number"
        );
        record_quietly(
            self.audit.as_ref(),
            AuditEvent::number_allocated(tenant_id, &number, user),
        )
        .await;

        Ok(number)
    }

    /// Serialize allocations of one stream within this process
    pub(crate) async fn lock_stream(&self, stream: &StreamKey) -> OwnedMutexGuard<()> {
        let lock = self
            .stream_locks
            .entry(stream.clone())
            .or_default()
            .value()
            .clone();
        lock.lock_owned().await
    }

    /// Row planner for one allocation attempt on `stream`
    pub(crate) fn planner(
        &self,
        stream: &StreamKey,
        user: &str,
    ) -> impl Fn(Vec<Counter>) -> CounterWrite + Send + Sync {
        let stream = stream.clone();
        let user = user.to_string();
        let defaults = self.defaults;
        let now = Utc::now();

        move |rows| {
            plan_allocation(
                rows,
                &AllocationRequest {
                    stream: &stream,
                    current_year: now.year(),
                    acting_user: &user,
                    now,
                    defaults,
                },
            )
        }
    }

    /// Run `attempt` until it stops losing first-use races or the retry
    /// budget is spent.
    pub(crate) async fn with_duplicate_retry<T, F, Fut>(&self, attempt: F) -> Result<T, DocumentsError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut tries = 1;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(StoreError::Duplicate(key)) if tries < self.retry_attempts => {
                    // Another writer created the row first; the retry sees it.
                    tracing::debug!(key = %key, attempt = tries, "Counter created concurrently, retrying allocation");
                    tries += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    // ===== Counter configuration =====

    /// Configure a counter explicitly. Fails if a live counter holds the key.
    pub async fn create_counter(
        &self,
        ctx: &RequestContext,
        new_counter: NewCounter,
    ) -> Result<Counter, DocumentsError> {
        let tenant_id = ctx.tenant()?;
        validate_new_counter(&new_counter)?;
        let user = ctx.acting_user(&self.system_user);
        let key = new_counter.key.clone();

        let created = run_cancellable(&ctx.cancel, async {
            if self.repo.find_by_key(tenant_id, &key).await?.is_some() {
                return Err(counter_exists(&key));
            }

            let now = Utc::now();
            let settings = new_counter.settings;
            let counter = Counter {
                id: Uuid::new_v4(),
                tenant_id,
                document_type_id: key.document_type_id,
                series: key.series.clone(),
                year: key.year,
                current_value: new_counter.starting_value,
                prefix: settings.prefix,
                padding_length: settings.padding_length,
                format_pattern: settings.format_pattern,
                reset_on_year_change: settings.reset_on_year_change,
                notes: settings.notes,
                created_at: now,
                created_by: user.to_string(),
                updated_at: now,
                updated_by: user.to_string(),
                deleted_at: None,
            };

            self.repo.insert(&counter).await.map_err(|e| match e {
                StoreError::Duplicate(_) => counter_exists(&key),
                other => other.into(),
            })
        })
        .await?;

        tracing::info!(%tenant_id, counter_id = %created.id, key = %key, "Counter created");
        record_quietly(self.audit.as_ref(), AuditEvent::counter_created(&created, user)).await;
        Ok(created)
    }

    /// Replace a counter's configuration. The value and key are untouched.
    pub async fn update_counter(
        &self,
        ctx: &RequestContext,
        counter_id: Uuid,
        settings: CounterSettings,
    ) -> Result<Counter, DocumentsError> {
        let tenant_id = ctx.tenant()?;
        validate_settings(&settings)?;
        let user = ctx.acting_user(&self.system_user);

        let updated = run_cancellable(&ctx.cancel, async {
            let mut counter = self
                .repo
                .find_by_id(tenant_id, counter_id)
                .await?
                .ok_or_else(|| DocumentsError::not_found("counter", counter_id))?;

            counter.prefix = settings.prefix;
            counter.padding_length = settings.padding_length;
            counter.format_pattern = settings.format_pattern;
            counter.reset_on_year_change = settings.reset_on_year_change;
            counter.notes = settings.notes;
            counter.updated_at = Utc::now();
            counter.updated_by = user.to_string();

            Ok::<_, DocumentsError>(self.repo.update_settings(&counter).await?)
        })
        .await?;

        tracing::info!(%tenant_id, %counter_id, "Counter updated");
        record_quietly(self.audit.as_ref(), AuditEvent::counter_updated(&updated, user)).await;
        Ok(updated)
    }

    /// Retire a counter (soft delete)
    pub async fn delete_counter(
        &self,
        ctx: &RequestContext,
        counter_id: Uuid,
    ) -> Result<(), DocumentsError> {
        let tenant_id = ctx.tenant()?;
        let user = ctx.acting_user(&self.system_user);

        let retired = run_cancellable(&ctx.cancel, async {
            let counter = self
                .repo
                .find_by_id(tenant_id, counter_id)
                .await?
                .ok_or_else(|| DocumentsError::not_found("counter", counter_id))?;

            if !self.repo.soft_delete(tenant_id, counter_id, user).await? {
                return Err(DocumentsError::not_found("counter", counter_id));
            }
            Ok(counter)
        })
        .await?;

        tracing::info!(%tenant_id, %counter_id, "Counter retired");
        record_quietly(self.audit.as_ref(), AuditEvent::counter_retired(&retired, user)).await;
        Ok(())
    }

    /// Get a counter by its exact key
    pub async fn get_counter(
        &self,
        ctx: &RequestContext,
        key: &CounterKey,
    ) -> Result<Counter, DocumentsError> {
        let tenant_id = ctx.tenant()?;

        run_cancellable(&ctx.cancel, async {
            self.repo
                .find_by_key(tenant_id, key)
                .await?
                .ok_or_else(|| DocumentsError::not_found("counter", key))
        })
        .await
    }

    /// List the tenant's live counters
    pub async fn list_counters(&self, ctx: &RequestContext) -> Result<Vec<Counter>, DocumentsError> {
        let tenant_id = ctx.tenant()?;

        run_cancellable(&ctx.cancel, async {
            Ok::<_, DocumentsError>(self.repo.list(tenant_id).await?)
        }).await
    }
}

fn counter_exists(key: &CounterKey) -> DocumentsError {
    DocumentsError::Conflict {
        reason: format!("Counter already exists: {}", key),
    }
}
