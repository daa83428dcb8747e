//! Multi-provider file storage core.
//!
//! Files are persisted to one of several interchangeable object-storage
//! backends behind a prioritized failover orchestrator, while a per-user
//! quota ledger enforces a flat capacity limit on a rolling monthly cycle
//! and keeps a daily usage history for reporting. The HTTP layer, request
//! validation, and authentication live in the consuming service; this crate
//! exposes the caller-facing operations through [`FileService`].

use std::sync::Arc;

pub mod catalog;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod quota;
pub mod services;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use errors::{AppError, Result};
pub use services::{FileDownload, FileService};

use quota::QuotaLedger;
use storage::StorageOrchestrator;

/// Wire a [`FileService`] against Postgres-backed state and the configured
/// provider list. This is the production composition; tests and embedders
/// can assemble the same pieces around the in-memory stores instead.
pub async fn build_service(config: &Config) -> Result<FileService> {
    let db = database::Database::new(&config.database_url).await?;
    db.migrate().await?;

    let providers = storage::create_providers(config)?;
    let orchestrator = StorageOrchestrator::new(providers, config.provider_timeout);

    let catalog = Arc::new(database::PgFileCatalog::new(db.pool().clone()));
    let quota = QuotaLedger::new(Arc::new(database::PgQuotaStore::new(db.pool().clone())));

    Ok(FileService::new(orchestrator, catalog, quota))
}
