//! Menu validator
//!
//! Every mutation goes through here before it touches the store. Field
//! failures are collected together; structural failures (duplicate name,
//! missing parent, cycles) are reported one at a time, after the fields
//! are known to be well formed.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::error::{MenuError, MenuResult, ValidationErrors};
use super::model::{CreateMenu, MenuId, MenuPatch, MenuRecord, MenuTarget};
use super::store::MenuStore;

pub const NAME_MAX: usize = 100;
pub const DISPLAY_NAME_MAX: usize = 100;
pub const URL_MAX: usize = 255;
pub const DESCRIPTION_MAX: usize = 255;
pub const ICON_MAX: usize = 50;
pub const PERMISSION_MAX: usize = 100;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid name pattern"));

static EXTERNAL_URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/?#]+[^\s]*$").expect("valid url pattern"));

/// A create request that passed validation, waiting for an id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuDraft {
    pub name: String,
    pub display_name: String,
    pub url: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<MenuId>,
    pub sort_order: i32,
    pub is_active: bool,
    pub target: MenuTarget,
    pub permission: Option<String>,
}

impl MenuDraft {
    pub fn into_record(self, id: MenuId, now: DateTime<Utc>) -> MenuRecord {
        MenuRecord {
            id,
            name: self.name,
            display_name: self.display_name,
            url: self.url,
            icon: self.icon,
            description: self.description,
            parent_id: self.parent_id,
            sort_order: self.sort_order,
            is_active: self.is_active,
            target: self.target,
            permission: self.permission,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Records a delete would remove: the target first, then its descendants
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeletionPlan {
    pub id: MenuId,
    pub ids: Vec<MenuId>,
}

pub fn validate_create(store: &MenuStore, input: &CreateMenu) -> MenuResult<MenuDraft> {
    let mut errors = ValidationErrors::new();

    check_name(&mut errors, &input.name);
    check_display_name(&mut errors, &input.display_name);
    check_url(&mut errors, &input.url);
    let description = optional_text(&mut errors, "description", input.description.as_deref(), DESCRIPTION_MAX);
    let icon = optional_text(&mut errors, "icon", input.icon.as_deref(), ICON_MAX);
    let permission = optional_text(&mut errors, "permission", input.permission.as_deref(), PERMISSION_MAX);
    let sort_order = input
        .sort_order
        .map(|v| check_sort_order(&mut errors, v))
        .unwrap_or(0);
    let target = input
        .target
        .as_deref()
        .map(|t| check_target(&mut errors, t))
        .unwrap_or_default();
    if let Some(parent_id) = input.parent_id {
        check_parent_id(&mut errors, parent_id);
    }
    errors.into_result()?;

    if store.name_exists(&input.name, None) {
        return Err(MenuError::DuplicateName(input.name.clone()));
    }

    if let Some(parent_id) = input.parent_id {
        if !store.contains(parent_id) {
            return Err(MenuError::ParentNotFound(parent_id));
        }
        check_parent(store, None, parent_id)?;
    }

    Ok(MenuDraft {
        name: input.name.clone(),
        display_name: input.display_name.clone(),
        url: input.url.clone(),
        icon,
        description,
        parent_id: input.parent_id,
        sort_order,
        is_active: input.is_active.unwrap_or(true),
        target,
        permission,
    })
}

/// Returns the record with `patch` merged in. Timestamps are left alone.
pub fn validate_update(store: &MenuStore, id: MenuId, patch: &MenuPatch) -> MenuResult<MenuRecord> {
    let mut merged = store.require(id)?.clone();
    let mut errors = ValidationErrors::new();

    if let Some(name) = &patch.name {
        check_name(&mut errors, name);
        merged.name = name.clone();
    }
    if let Some(display_name) = &patch.display_name {
        check_display_name(&mut errors, display_name);
        merged.display_name = display_name.clone();
    }
    if let Some(url) = &patch.url {
        check_url(&mut errors, url);
        merged.url = url.clone();
    }
    if let Some(description) = &patch.description {
        merged.description = optional_text(&mut errors, "description", Some(description), DESCRIPTION_MAX);
    }
    if let Some(icon) = &patch.icon {
        merged.icon = optional_text(&mut errors, "icon", Some(icon), ICON_MAX);
    }
    if let Some(permission) = &patch.permission {
        merged.permission = optional_text(&mut errors, "permission", Some(permission), PERMISSION_MAX);
    }
    if let Some(sort_order) = patch.sort_order {
        merged.sort_order = check_sort_order(&mut errors, sort_order);
    }
    if let Some(is_active) = patch.is_active {
        merged.is_active = is_active;
    }
    if let Some(target) = &patch.target {
        merged.target = check_target(&mut errors, target);
    }
    if let Some(Some(parent_id)) = patch.parent_id {
        check_parent_id(&mut errors, parent_id);
    }
    errors.into_result()?;

    if patch.name.is_some() && store.name_exists(&merged.name, Some(id)) {
        return Err(MenuError::DuplicateName(merged.name));
    }

    if let Some(parent_id) = patch.parent_id {
        if let Some(parent) = parent_id {
            if !store.contains(parent) {
                return Err(MenuError::ParentNotFound(parent));
            }
            check_parent(store, Some(id), parent)?;
        }
        merged.parent_id = parent_id;
    }

    Ok(merged)
}

pub fn validate_delete(store: &MenuStore, id: MenuId) -> MenuResult<DeletionPlan> {
    store.require(id)?;
    let mut ids = vec![id];
    ids.extend(store.descendants(id));
    Ok(DeletionPlan { id, ids })
}

/// Rejects placing `id` (or a new record, when `None`) under `parent_id` if
/// the parent chain reaches `id`, revisits a node, or runs longer than the
/// store. A chain that ends at a missing record is left to the caller.
pub fn check_parent(store: &MenuStore, id: Option<MenuId>, parent_id: MenuId) -> MenuResult<()> {
    let cyclic = || MenuError::CyclicParent {
        id: id.unwrap_or(parent_id),
        parent_id,
    };

    let bound = store.len();
    let mut visited = HashSet::new();
    let mut cursor = Some(parent_id);

    while let Some(current) = cursor {
        if Some(current) == id {
            return Err(cyclic());
        }
        if !visited.insert(current) || visited.len() > bound {
            tracing::warn!("Parent chain from menu {} is corrupt at {}", parent_id, current);
            return Err(cyclic());
        }
        cursor = store.get(current).and_then(|r| r.parent_id);
    }

    Ok(())
}

fn check_name(errors: &mut ValidationErrors, name: &str) {
    if name.is_empty() {
        errors.push("name", "Name is required");
    } else if name.chars().count() > NAME_MAX {
        errors.push("name", format!("Name must be at most {} characters", NAME_MAX));
    } else if !NAME_PATTERN.is_match(name) {
        errors.push(
            "name",
            "Name must contain only lowercase letters, numbers, hyphens, and underscores",
        );
    }
}

fn check_display_name(errors: &mut ValidationErrors, display_name: &str) {
    if display_name.trim().is_empty() {
        errors.push("display_name", "Display name is required");
    } else if display_name.chars().count() > DISPLAY_NAME_MAX {
        errors.push(
            "display_name",
            format!("Display name must be at most {} characters", DISPLAY_NAME_MAX),
        );
    }
}

fn check_url(errors: &mut ValidationErrors, url: &str) {
    if url.is_empty() {
        errors.push("url", "URL is required");
    } else if url.chars().count() > URL_MAX {
        errors.push("url", format!("URL must be at most {} characters", URL_MAX));
    } else if !url.starts_with('/') && !EXTERNAL_URL_PATTERN.is_match(url) {
        errors.push("url", "URL must start with / or be an absolute http(s) URL");
    }
}

/// Empty input clears the field.
fn optional_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Option<String> {
    let value = value.filter(|v| !v.is_empty())?;
    if value.chars().count() > max {
        errors.push(field, format!("{} must be at most {} characters", field, max));
    }
    Some(value.to_string())
}

fn check_sort_order(errors: &mut ValidationErrors, sort_order: i64) -> i32 {
    match i32::try_from(sort_order) {
        Ok(v) if v >= 0 => v,
        _ => {
            errors.push("sort_order", "Sort order must be a non-negative integer");
            0
        }
    }
}

fn check_target(errors: &mut ValidationErrors, target: &str) -> MenuTarget {
    target.parse().unwrap_or_else(|_| {
        errors.push("target", "Target must be one of _self, _blank, _parent, _top");
        MenuTarget::default()
    })
}

fn check_parent_id(errors: &mut ValidationErrors, parent_id: MenuId) {
    if parent_id <= 0 {
        errors.push("parent_id", "Parent ID must be positive");
    }
}
