use std::sync::Arc;

use crate::config::Config;
use crate::menu::MenuStore;
use crate::service::MenuService;
use crate::storage::MemoryRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Menu snapshot and its repository
    pub menus: Arc<MenuService>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(menus: MenuService, config: Config) -> Self {
        Self {
            menus: Arc::new(menus),
            config: Arc::new(config),
        }
    }

    /// Unpersisted state around `store`, with default configuration
    pub fn in_memory(store: MenuStore) -> Self {
        Self::new(
            MenuService::new(store, Arc::new(MemoryRepository)),
            Config::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_state() {
        let state = AppState::in_memory(MenuStore::new());
        assert_eq!(state.menus.repo_name(), "memory");
        assert_eq!(state.config.pagination.max_per_page, 100);
    }
}
