//! Menu entity - navigation menus
//!
//! Table: wed_menu
//!
//! Ids are assigned by the menu engine, not by the database. Parent links
//! are plain columns; cascading deletes happen in the engine.

use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::menu::{MenuRecord, MenuTarget};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wed_menu")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    /// Unique slug
    #[sea_orm(column_type = "String(Some(100))", unique)]
    pub name: String,

    #[sea_orm(column_type = "String(Some(100))")]
    pub display_name: String,

    #[sea_orm(column_type = "String(Some(255))")]
    pub url: String,

    #[sea_orm(column_type = "String(Some(50))", nullable)]
    pub icon: Option<String>,

    #[sea_orm(column_type = "String(Some(255))", nullable)]
    pub description: Option<String>,

    /// Parent menu id (NULL for root menus)
    #[sea_orm(nullable)]
    pub parent_id: Option<i64>,

    pub sort_order: i32,

    pub is_active: bool,

    /// _self / _blank / _parent / _top
    #[sea_orm(column_type = "String(Some(16))")]
    pub target: String,

    #[sea_orm(column_type = "String(Some(100))", nullable)]
    pub permission: Option<String>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for MenuRecord {
    fn from(m: Model) -> Self {
        let target = m.target.parse().unwrap_or_else(|_| {
            tracing::warn!("Menu {} has unknown target '{}', using _self", m.id, m.target);
            MenuTarget::default()
        });
        Self {
            id: m.id,
            name: m.name,
            display_name: m.display_name,
            url: m.url,
            icon: m.icon,
            description: m.description,
            parent_id: m.parent_id,
            sort_order: m.sort_order,
            is_active: m.is_active,
            target,
            permission: m.permission,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<&MenuRecord> for ActiveModel {
    fn from(r: &MenuRecord) -> Self {
        Self {
            id: Set(r.id),
            name: Set(r.name.clone()),
            display_name: Set(r.display_name.clone()),
            url: Set(r.url.clone()),
            icon: Set(r.icon.clone()),
            description: Set(r.description.clone()),
            parent_id: Set(r.parent_id),
            sort_order: Set(r.sort_order),
            is_active: Set(r.is_active),
            target: Set(r.target.as_str().to_string()),
            permission: Set(r.permission.clone()),
            created_at: Set(r.created_at),
            updated_at: Set(r.updated_at),
        }
    }
}
