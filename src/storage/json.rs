//! Whole-collection JSON file storage

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::MenuRepository;
use crate::menu::{ChangeSet, MenuRecord, MenuStore};

/// Rewrites the whole file on every change, through a temp file + rename.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl MenuRepository for JsonFileRepository {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn load_all(&self) -> anyhow::Result<Vec<MenuRecord>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No menu file at {}, starting empty", self.path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn apply(&self, snapshot: &MenuStore, changes: &ChangeSet) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let records: Vec<&MenuRecord> = snapshot.records().collect();
        let content = serde_json::to_vec_pretty(&records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(
            "Wrote {} menus to {} ({} upserted, {} removed)",
            records.len(),
            self.path.display(),
            changes.upserted.len(),
            changes.removed.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::CreateMenu;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("menus.json"));
        assert!(repo.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("nested/menus.json"));

        let mut store = MenuStore::new();
        let gallery = store.create(CreateMenu::new("gallery", "Gallery", "/gallery")).unwrap();
        store
            .create(CreateMenu::new("albums", "Albums", "/gallery/albums").under(gallery.id))
            .unwrap();
        let changes = ChangeSet::between(&MenuStore::new(), &store);
        repo.apply(&store, &changes).await.unwrap();

        let loaded = MenuStore::from_records(repo.load_all().await.unwrap());
        assert_eq!(loaded, store);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menus.json");
        tokio::fs::write(&path, "{").await.unwrap();
        assert!(JsonFileRepository::new(&path).load_all().await.is_err());
    }
}
