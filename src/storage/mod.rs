//! Menu persistence
//!
//! The engine works on an in-memory snapshot; a repository loads that
//! snapshot at startup and receives every committed change afterwards.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, StorageKind};
use crate::menu::{ChangeSet, MenuRecord, MenuStore};

pub mod database;
pub mod json;

pub use database::DbMenuRepository;
pub use json::JsonFileRepository;

#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// Short name for logs and the health endpoint
    fn name(&self) -> &'static str;

    /// Full collection, any order
    async fn load_all(&self) -> anyhow::Result<Vec<MenuRecord>>;

    /// Persist `changes`; `snapshot` is the state after they are applied.
    async fn apply(&self, snapshot: &MenuStore, changes: &ChangeSet) -> anyhow::Result<()>;
}

/// Keeps nothing; the process owns the only copy.
#[derive(Debug, Default)]
pub struct MemoryRepository;

#[async_trait]
impl MenuRepository for MemoryRepository {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load_all(&self) -> anyhow::Result<Vec<MenuRecord>> {
        Ok(Vec::new())
    }

    async fn apply(&self, _snapshot: &MenuStore, _changes: &ChangeSet) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Open the repository selected by `config.storage.kind`
pub async fn open(config: &Config) -> anyhow::Result<Arc<dyn MenuRepository>> {
    let repo: Arc<dyn MenuRepository> = match config.storage.kind {
        StorageKind::Memory => Arc::new(MemoryRepository),
        StorageKind::Json => Arc::new(JsonFileRepository::new(&config.storage.json_path)),
        StorageKind::Postgres => {
            let db = crate::db::init_database(&config.database).await.map_err(|e| {
                tracing::error!("Database initialization failed: {}", e);
                anyhow::anyhow!("Database initialization failed: {}", e)
            })?;
            Arc::new(DbMenuRepository::new(db))
        }
    };
    info!("Menu storage: {}", repo.name());
    Ok(repo)
}
