//! PostgreSQL storage through sea-orm

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use super::MenuRepository;
use crate::entity::menu;
use crate::menu::{ChangeSet, MenuRecord, MenuStore};

#[derive(Clone)]
pub struct DbMenuRepository {
    db: DatabaseConnection,
}

impl DbMenuRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Every column except the key is overwritten on conflict.
fn upsert_conflict() -> OnConflict {
    OnConflict::column(menu::Column::Id)
        .update_columns([
            menu::Column::Name,
            menu::Column::DisplayName,
            menu::Column::Url,
            menu::Column::Icon,
            menu::Column::Description,
            menu::Column::ParentId,
            menu::Column::SortOrder,
            menu::Column::IsActive,
            menu::Column::Target,
            menu::Column::Permission,
            menu::Column::CreatedAt,
            menu::Column::UpdatedAt,
        ])
        .to_owned()
}

#[async_trait]
impl MenuRepository for DbMenuRepository {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn load_all(&self) -> anyhow::Result<Vec<MenuRecord>> {
        let models = menu::Entity::find()
            .order_by_asc(menu::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(MenuRecord::from).collect())
    }

    async fn apply(&self, _snapshot: &MenuStore, changes: &ChangeSet) -> anyhow::Result<()> {
        let txn = self.db.begin().await?;

        // Deletes first so a freed name can be reused by an upsert.
        if !changes.removed.is_empty() {
            let result = menu::Entity::delete_many()
                .filter(menu::Column::Id.is_in(changes.removed.iter().copied()))
                .exec(&txn)
                .await?;
            tracing::debug!("Deleted {} menu rows", result.rows_affected);
        }

        for record in &changes.upserted {
            menu::Entity::insert(menu::ActiveModel::from(record))
                .on_conflict(upsert_conflict())
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }
}
