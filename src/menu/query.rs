//! Ordering and query engine over the flat menu collection

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::error::{MenuResult, ValidationErrors};
use super::model::{MenuId, MenuRecord};
use super::tree::build_tree;

pub const DEFAULT_PER_PAGE: usize = 10;
pub const MAX_PER_PAGE: usize = 100;

/// Display order among siblings: `sort_order`, then `id`
pub fn sibling_cmp(a: &MenuRecord, b: &MenuRecord) -> Ordering {
    a.sort_order.cmp(&b.sort_order).then(a.id.cmp(&b.id))
}

/// Restriction on the parent of listed records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ParentFilter {
    /// Root-level records only
    Root,
    /// Direct children of the given record only
    Child(MenuId),
}

impl TryFrom<String> for ParentFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "" | "root" | "null" => Ok(ParentFilter::Root),
            other => other
                .parse::<MenuId>()
                .map(ParentFilter::Child)
                .map_err(|_| format!("invalid parent_id '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MenuFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub parent_id: Option<ParentFilter>,
    #[serde(default)]
    pub permission: Option<String>,
}

impl MenuFilter {
    pub fn matches(&self, record: &MenuRecord) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            if !record.name.to_lowercase().contains(&needle)
                && !record.display_name.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(is_active) = self.is_active {
            if record.is_active != is_active {
                return false;
            }
        }
        match self.parent_id {
            Some(ParentFilter::Root) if record.parent_id.is_some() => return false,
            Some(ParentFilter::Child(id)) if record.parent_id != Some(id) => return false,
            _ => {}
        }
        if let Some(permission) = &self.permission {
            if record.permission.as_deref() != Some(permission.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Flat filter; no ancestors are pulled in for context.
pub fn filter<'a, I>(records: I, filter: &MenuFilter) -> Vec<&'a MenuRecord>
where
    I: IntoIterator<Item = &'a MenuRecord>,
{
    let mut out: Vec<&MenuRecord> = records.into_iter().filter(|r| filter.matches(r)).collect();
    out.sort_by(|a, b| sibling_cmp(a, b));
    out
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MenuStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub root_count: usize,
    pub child_count: usize,
    /// Zero-based level of the deepest menu
    pub max_depth: usize,
}

pub fn compute_stats<'a, I>(records: I) -> MenuStats
where
    I: IntoIterator<Item = &'a MenuRecord>,
{
    let records: Vec<&MenuRecord> = records.into_iter().collect();
    let total = records.len();
    let active = records.iter().filter(|r| r.is_active).count();
    let root_count = records.iter().filter(|r| r.is_root()).count();

    MenuStats {
        total,
        active,
        inactive: total - active,
        root_count,
        child_count: total - root_count,
        max_depth: build_tree(records).max_level(),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Name,
    DisplayName,
    Url,
    #[default]
    SortOrder,
    CreatedAt,
    UpdatedAt,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListParams {
    pub page: usize,
    pub per_page: usize,
    pub sort_by: SortField,
    pub direction: SortDirection,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            sort_by: SortField::default(),
            direction: SortDirection::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: usize,
    pub last_page: usize,
    pub per_page: usize,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

fn field_cmp(field: SortField, a: &MenuRecord, b: &MenuRecord) -> Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Name => a.name.cmp(&b.name),
        SortField::DisplayName => a.display_name.to_lowercase().cmp(&b.display_name.to_lowercase()),
        SortField::Url => a.url.cmp(&b.url),
        SortField::SortOrder => a.sort_order.cmp(&b.sort_order),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

/// Sorts and slices `records`. Ties on the sort field always fall back to
/// ascending id. `max_per_page` caps `per_page`.
pub fn paginate(
    mut records: Vec<&MenuRecord>,
    params: &ListParams,
    max_per_page: usize,
) -> MenuResult<Page<MenuRecord>> {
    let mut errors = ValidationErrors::new();
    if params.page == 0 {
        errors.push("page", "Page must be at least 1");
    }
    if params.per_page == 0 || params.per_page > max_per_page {
        errors.push("per_page", format!("Per page must be between 1 and {}", max_per_page));
    }
    errors.into_result()?;

    records.sort_by(|a, b| {
        let primary = match params.direction {
            SortDirection::Asc => field_cmp(params.sort_by, a, b),
            SortDirection::Desc => field_cmp(params.sort_by, b, a),
        };
        primary.then(a.id.cmp(&b.id))
    });

    let total = records.len();
    let last_page = total.div_ceil(params.per_page).max(1);
    // Pages past the end are empty, however large the page number.
    let offset = (params.page - 1)
        .checked_mul(params.per_page)
        .unwrap_or(usize::MAX);
    let data = records
        .into_iter()
        .skip(offset)
        .take(params.per_page)
        .cloned()
        .collect();

    Ok(Page {
        data,
        meta: PageMeta {
            current_page: params.page,
            last_page,
            per_page: params.per_page,
            total,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::error::MenuError;
    use crate::menu::model::CreateMenu;
    use crate::menu::store::MenuStore;

    fn store() -> MenuStore {
        let mut store = MenuStore::new();
        let planning = store
            .create(CreateMenu::new("planning", "Wedding Planning", "/planning").sorted(2))
            .unwrap()
            .id;
        store
            .create(CreateMenu {
                permission: Some("guests.view".to_string()),
                ..CreateMenu::new("guest-list", "Guest List", "/planning/guests").under(planning)
            })
            .unwrap();
        store
            .create(CreateMenu {
                is_active: Some(false),
                ..CreateMenu::new("seating", "Seating Chart", "/planning/seating").under(planning)
            })
            .unwrap();
        store
            .create(CreateMenu::new("vendors", "Vendors", "/vendors").sorted(1))
            .unwrap();
        store
    }

    fn names(records: &[&MenuRecord]) -> Vec<String> {
        records.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn test_search_matches_name_or_display_name() {
        let store = store();
        let by_display = MenuFilter {
            search: Some("CHART".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&filter(store.records(), &by_display)), vec!["seating"]);

        let by_name = MenuFilter {
            search: Some("guest-".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&filter(store.records(), &by_name)), vec!["guest-list"]);
    }

    #[test]
    fn test_search_does_not_pull_in_ancestors() {
        let store = store();
        let f = MenuFilter {
            search: Some("guest".to_string()),
            ..Default::default()
        };
        let found = filter(store.records(), &f);
        assert_eq!(found.len(), 1);
        assert!(found[0].parent_id.is_some());
    }

    #[test]
    fn test_parent_filter_root_and_direct_children() {
        let store = store();
        let roots = MenuFilter {
            parent_id: Some(ParentFilter::Root),
            ..Default::default()
        };
        assert_eq!(names(&filter(store.records(), &roots)), vec!["vendors", "planning"]);

        let planning = store.find_by_name("planning").unwrap().id;
        let children = MenuFilter {
            parent_id: Some(ParentFilter::Child(planning)),
            is_active: Some(true),
            ..Default::default()
        };
        assert_eq!(names(&filter(store.records(), &children)), vec!["guest-list"]);
    }

    #[test]
    fn test_permission_filter() {
        let store = store();
        let f = MenuFilter {
            permission: Some("guests.view".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&filter(store.records(), &f)), vec!["guest-list"]);
    }

    #[test]
    fn test_parent_filter_parsing() {
        assert_eq!(ParentFilter::try_from(String::new()), Ok(ParentFilter::Root));
        assert_eq!(ParentFilter::try_from("root".to_string()), Ok(ParentFilter::Root));
        assert_eq!(ParentFilter::try_from("12".to_string()), Ok(ParentFilter::Child(12)));
        assert!(ParentFilter::try_from("abc".to_string()).is_err());
    }

    #[test]
    fn test_stats() {
        let stats = compute_stats(store().records());
        assert_eq!(
            stats,
            MenuStats {
                total: 4,
                active: 3,
                inactive: 1,
                root_count: 2,
                child_count: 2,
                max_depth: 1,
            }
        );
        assert_eq!(compute_stats(MenuStore::new().records()), MenuStats::default());
    }

    #[test]
    fn test_paginate_meta_and_slices() {
        let store = store();
        let params = ListParams {
            page: 2,
            per_page: 3,
            sort_by: SortField::Name,
            direction: SortDirection::Asc,
        };
        let page = paginate(store.records().collect(), &params, MAX_PER_PAGE).unwrap();
        assert_eq!(page.meta.total, 4);
        assert_eq!(page.meta.last_page, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "vendors");

        let empty = paginate(Vec::new(), &ListParams::default(), MAX_PER_PAGE).unwrap();
        assert_eq!(empty.meta.last_page, 1);
        assert!(empty.data.is_empty());
    }

    #[test]
    fn test_paginate_desc_ties_by_id() {
        let store = store();
        let params = ListParams {
            sort_by: SortField::SortOrder,
            direction: SortDirection::Desc,
            ..Default::default()
        };
        let page = paginate(store.records().collect(), &params, MAX_PER_PAGE).unwrap();
        let ids: Vec<MenuId> = page.data.iter().map(|r| r.id).collect();
        // sort orders: planning 2, vendors 1, guest-list 0 (id 2), seating 0 (id 3)
        assert_eq!(ids, vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_paginate_past_last_page_is_empty() {
        let store = store();
        for page in [3, usize::MAX] {
            let params = ListParams {
                page,
                per_page: 3,
                ..Default::default()
            };
            let result = paginate(store.records().collect(), &params, MAX_PER_PAGE).unwrap();
            assert!(result.data.is_empty());
            assert_eq!(result.meta.current_page, page);
            assert_eq!(result.meta.last_page, 2);
            assert_eq!(result.meta.total, 4);
        }
    }

    #[test]
    fn test_paginate_rejects_bad_params() {
        let params = ListParams {
            page: 0,
            per_page: 500,
            ..Default::default()
        };
        let Err(MenuError::Validation(errors)) = paginate(Vec::new(), &params, MAX_PER_PAGE) else {
            panic!("expected validation error");
        };
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["page", "per_page"]);
    }
}
