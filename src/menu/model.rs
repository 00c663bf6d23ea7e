//! Menu model - records, tree nodes and operation inputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Menu identifier (always positive once assigned)
pub type MenuId = i64;

/// Link target of a menu entry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MenuTarget {
    #[default]
    #[serde(rename = "_self")]
    SelfFrame,
    #[serde(rename = "_blank")]
    Blank,
    #[serde(rename = "_parent")]
    Parent,
    #[serde(rename = "_top")]
    Top,
}

impl MenuTarget {
    pub const ALL: [MenuTarget; 4] = [
        MenuTarget::SelfFrame,
        MenuTarget::Blank,
        MenuTarget::Parent,
        MenuTarget::Top,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MenuTarget::SelfFrame => "_self",
            MenuTarget::Blank => "_blank",
            MenuTarget::Parent => "_parent",
            MenuTarget::Top => "_top",
        }
    }
}

impl fmt::Display for MenuTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MenuTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MenuTarget::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown target '{}'", s))
    }
}

/// Flat, persisted menu record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuRecord {
    pub id: MenuId,
    pub name: String,
    pub display_name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<MenuId>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub target: MenuTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl MenuRecord {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Tree view of a record; rebuilt on demand, never persisted
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MenuNode {
    #[serde(flatten)]
    pub record: MenuRecord,
    pub level: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuNode>,
}

/// Input for creating a menu
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreateMenu {
    pub name: String,
    pub display_name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub parent_id: Option<MenuId>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub permission: Option<String>,
}

impl CreateMenu {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn under(mut self, parent_id: MenuId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn sorted(mut self, sort_order: i64) -> Self {
        self.sort_order = Some(sort_order);
        self
    }
}

/// Partial update; absent fields are left unchanged.
///
/// `parent_id` distinguishes an absent key (`None`) from an explicit
/// `null` (`Some(None)`, move to root).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MenuPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<MenuId>>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub permission: Option<String>,
}

impl MenuPatch {
    pub fn parent(parent_id: Option<MenuId>) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.display_name.is_none()
            && self.url.is_none()
            && self.description.is_none()
            && self.icon.is_none()
            && self.parent_id.is_none()
            && self.sort_order.is_none()
            && self.is_active.is_none()
            && self.target.is_none()
            && self.permission.is_none()
    }
}

/// Optional overrides for `duplicate`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DuplicateOverrides {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<MenuId>>,
}

/// One entry of a reorder batch
#[derive(Clone, Debug, Deserialize)]
pub struct ReorderItem {
    pub id: MenuId,
    pub sort_order: i64,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<MenuId>>,
}

/// One record of an import file. Timestamps and unknown columns are
/// ignored; `id` and `parent_id` only link records within the file.
#[derive(Clone, Debug, Deserialize)]
pub struct ImportRecord {
    pub id: MenuId,
    pub name: String,
    pub display_name: String,
    pub url: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<MenuId>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub permission: Option<String>,
}

impl ImportRecord {
    pub fn new(id: MenuId, name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            display_name: name.clone(),
            name,
            url: url.into(),
            icon: None,
            description: None,
            parent_id: None,
            sort_order: None,
            is_active: None,
            target: None,
            permission: None,
        }
    }

    pub fn with_parent(mut self, parent_id: MenuId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Create input with the parent already resolved to a store id
    pub fn into_create(self, parent_id: Option<MenuId>) -> CreateMenu {
        CreateMenu {
            name: self.name,
            display_name: self.display_name,
            url: self.url,
            description: self.description,
            icon: self.icon,
            parent_id,
            sort_order: self.sort_order,
            is_active: self.is_active,
            target: self.target,
            permission: self.permission,
        }
    }
}

impl From<MenuRecord> for ImportRecord {
    fn from(r: MenuRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            display_name: r.display_name,
            url: r.url,
            icon: r.icon,
            description: r.description,
            parent_id: r.parent_id,
            sort_order: Some(r.sort_order.into()),
            is_active: Some(r.is_active),
            target: Some(r.target.as_str().to_string()),
            permission: r.permission,
        }
    }
}

/// Maps a present key (even `null`) to `Some`, leaving `None` for a missing key.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
