//! Shared menu snapshot with write-through persistence
//!
//! Reads borrow the current snapshot under a read lock. A mutation holds
//! the write lock for its whole duration: it runs against a clone, hands
//! the resulting change set to the repository, and swaps the clone in only
//! after the repository accepted it.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult};
use crate::menu::{ChangeSet, MenuResult, MenuStore};
use crate::storage::MenuRepository;

pub struct MenuService {
    store: RwLock<MenuStore>,
    repo: Arc<dyn MenuRepository>,
}

impl MenuService {
    pub fn new(store: MenuStore, repo: Arc<dyn MenuRepository>) -> Self {
        Self {
            store: RwLock::new(store),
            repo,
        }
    }

    /// Build the snapshot from everything the repository holds
    pub async fn load(repo: Arc<dyn MenuRepository>) -> anyhow::Result<Self> {
        let records = repo.load_all().await?;
        let store = MenuStore::from_records(records);
        info!("Loaded {} menus from {} storage", store.len(), repo.name());
        Ok(Self::new(store, repo))
    }

    pub fn repo_name(&self) -> &'static str {
        self.repo.name()
    }

    /// Run `f` against the current snapshot
    pub async fn read<T>(&self, f: impl FnOnce(&MenuStore) -> T) -> T {
        let store = self.store.read().await;
        f(&store)
    }

    /// Run `f` against a working copy and commit it if both `f` and the
    /// repository succeed.
    pub async fn mutate<T>(&self, f: impl FnOnce(&mut MenuStore) -> MenuResult<T>) -> AppResult<T> {
        let mut store = self.store.write().await;
        let mut working = store.clone();
        let value = f(&mut working)?;

        let changes = ChangeSet::between(&store, &working);
        if changes.is_empty() {
            return Ok(value);
        }

        self.repo.apply(&working, &changes).await.map_err(|e| {
            error!("{} storage rejected changes: {:#}", self.repo.name(), e);
            AppError::from(e)
        })?;
        debug!(
            "Committed {} upserted, {} removed menus",
            changes.upserted.len(),
            changes.removed.len()
        );

        *store = working;
        Ok(value)
    }
}
