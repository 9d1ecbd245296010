//! Module wiring and lifecycle

use crate::api::native::NativeClient;
use crate::config::Config;
use crate::contract::DocumentsApi;
use crate::domain::{
    AuditSink, CounterRepository, CounterService, DocumentRepository, LifecycleService,
    TracingAuditSink,
};
use crate::infra::storage::{Migrator, SeaOrmCounterRepository, SeaOrmDocumentRepository};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Document service module
pub struct DocumentServiceModule {
    config: RwLock<Config>,
    client: RwLock<Option<Arc<NativeClient>>>,
}

impl Default for DocumentServiceModule {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl DocumentServiceModule {
    pub fn new(config: Config) -> Self {
        Self {
            config: RwLock::new(config),
            client: RwLock::new(None),
        }
    }

    /// Current configuration
    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Open a connection to `database_url`
    pub async fn connect(&self) -> Result<Arc<DatabaseConnection>> {
        let url = self
            .config
            .read()
            .database_url
            .clone()
            .context("database_url is not configured")?;
        let db = Database::connect(url.as_str())
            .await
            .context("failed to connect to document database")?;
        Ok(Arc::new(db))
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self, db: &DatabaseConnection) -> Result<()> {
        Migrator::up(db, None).await?;
        tracing::info!("Document service migrations completed");
        Ok(())
    }

    /// Wire SeaORM repositories and the tracing audit sink
    pub fn init(&self, db: Arc<DatabaseConnection>) -> Result<()> {
        let counter_repo = Arc::new(SeaOrmCounterRepository::new(db.clone()));
        let document_repo = Arc::new(SeaOrmDocumentRepository::new(db));
        self.init_with(counter_repo, document_repo, Arc::new(TracingAuditSink))
    }

    /// Wire the services over arbitrary repositories
    pub fn init_with(
        &self,
        counter_repo: Arc<dyn CounterRepository>,
        document_repo: Arc<dyn DocumentRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<()> {
        let cfg = self.config();
        cfg.validate()?;

        let counters = Arc::new(CounterService::new(counter_repo, audit.clone(), &cfg));
        let lifecycle = Arc::new(LifecycleService::new(
            document_repo,
            counters.clone(),
            audit,
            &cfg,
        ));
        *self.client.write() = Some(Arc::new(NativeClient::new(counters, lifecycle)));

        tracing::info!(
            system_user = %cfg.system_user,
            retry_attempts = cfg.allocation_retry_attempts,
            "Document service initialized"
        );
        Ok(())
    }

    /// In-process client; fails before `init`
    pub fn client(&self) -> Result<Arc<dyn DocumentsApi>> {
        let client = self
            .client
            .read()
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))?
            .clone();
        Ok(client)
    }

    /// Run until `cancel` fires
    pub async fn serve(self: Arc<Self>, cancel: CancellationToken) -> Result<()> {
        cancel.cancelled().await;
        tracing::info!("Document service stopped");
        Ok(())
    }
}
