//! In-memory menu collection and the mutation operations over it
//!
//! `MenuStore` is a plain snapshot keyed by id. Every mutation either
//! succeeds completely or returns an error with the store untouched; batch
//! operations run against a working copy that is only swapped in once
//! every entry has passed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use super::error::{BatchOutcome, MenuError, MenuResult};
use super::model::{
    CreateMenu, DuplicateOverrides, ImportRecord, MenuId, MenuPatch, MenuRecord, ReorderItem,
};
use super::query::sibling_cmp;
use super::validator::{self, DeletionPlan};

/// Flat menu collection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuStore {
    records: BTreeMap<MenuId, MenuRecord>,
    next_id: MenuId,
}

/// Result of a cascading delete
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Deletion {
    pub removed: Vec<MenuId>,
}

impl Deletion {
    pub fn count(&self) -> usize {
        self.removed.len()
    }
}

/// Result of a successful bulk operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub affected: Vec<MenuId>,
    pub outcomes: Vec<BatchOutcome>,
}

/// Result of a successful import; `outcomes` are keyed by source id
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: Vec<MenuRecord>,
    pub id_map: BTreeMap<MenuId, MenuId>,
    pub outcomes: Vec<BatchOutcome>,
}

/// Difference between two snapshots, in the shape storage needs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub upserted: Vec<MenuRecord>,
    pub removed: Vec<MenuId>,
}

impl ChangeSet {
    pub fn between(before: &MenuStore, after: &MenuStore) -> Self {
        let upserted = after
            .records
            .values()
            .filter(|r| before.records.get(&r.id) != Some(*r))
            .cloned()
            .collect();
        let removed = before
            .records
            .keys()
            .filter(|id| !after.records.contains_key(id))
            .copied()
            .collect();
        Self { upserted, removed }
    }

    pub fn is_empty(&self) -> bool {
        self.upserted.is_empty() && self.removed.is_empty()
    }
}

impl Default for MenuStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuStore {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Wraps records loaded from storage without validating them.
    pub fn from_records(records: impl IntoIterator<Item = MenuRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.next_id = store.next_id.max(record.id + 1);
            if let Some(previous) = store.records.insert(record.id, record) {
                tracing::warn!("Duplicate menu id {} in loaded records, keeping the last", previous.id);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: MenuId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: MenuId) -> Option<&MenuRecord> {
        self.records.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: MenuId) -> Option<&mut MenuRecord> {
        self.records.get_mut(&id)
    }

    pub fn require(&self, id: MenuId) -> MenuResult<&MenuRecord> {
        self.get(id).ok_or(MenuError::NotFound(id))
    }

    /// All records in id order
    pub fn records(&self) -> impl Iterator<Item = &MenuRecord> {
        self.records.values()
    }

    pub fn to_vec(&self) -> Vec<MenuRecord> {
        self.records.values().cloned().collect()
    }

    pub fn name_exists(&self, name: &str, exclude: Option<MenuId>) -> bool {
        self.records
            .values()
            .any(|r| r.name == name && Some(r.id) != exclude)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&MenuRecord> {
        self.records.values().find(|r| r.name == name)
    }

    /// Lowest id wins when several records share a url.
    pub fn find_by_url(&self, url: &str) -> Option<&MenuRecord> {
        self.records.values().find(|r| r.url == url)
    }

    /// Direct children of `parent` (`None` for roots) in sibling order
    pub fn children(&self, parent: Option<MenuId>) -> Vec<&MenuRecord> {
        let mut children: Vec<&MenuRecord> = self
            .records
            .values()
            .filter(|r| r.parent_id == parent)
            .collect();
        children.sort_by(|a, b| sibling_cmp(a, b));
        children
    }

    pub fn roots(&self) -> Vec<&MenuRecord> {
        self.children(None)
    }

    /// Every transitive descendant of `id`, breadth-first in sibling order.
    /// `id` itself is never included, even on a corrupt snapshot.
    pub fn descendants(&self, id: MenuId) -> Vec<MenuId> {
        let index = self.child_index();
        let mut seen = HashSet::from([id]);
        let mut out = Vec::new();
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for &child in index.get(&current).into_iter().flatten() {
                if seen.insert(child) {
                    out.push(child);
                    queue.push_back(child);
                }
            }
        }
        out
    }

    /// Ancestor chain from the root down to `id` inclusive
    pub fn breadcrumb(&self, id: MenuId) -> MenuResult<Vec<&MenuRecord>> {
        let mut chain = vec![self.require(id)?];
        let mut seen = HashSet::from([id]);
        let mut cursor = chain[0].parent_id;

        while let Some(parent_id) = cursor {
            let Some(parent) = self.get(parent_id) else {
                break;
            };
            if !seen.insert(parent_id) {
                tracing::warn!("Cycle detected while walking ancestors of menu {}", id);
                break;
            }
            chain.push(parent);
            cursor = parent.parent_id;
        }

        chain.reverse();
        Ok(chain)
    }

    fn child_index(&self) -> HashMap<MenuId, Vec<MenuId>> {
        let mut index: HashMap<MenuId, Vec<MenuId>> = HashMap::new();
        let mut siblings: Vec<&MenuRecord> = self.records.values().collect();
        siblings.sort_by(|a, b| sibling_cmp(a, b));
        for record in siblings {
            if let Some(parent_id) = record.parent_id {
                index.entry(parent_id).or_default().push(record.id);
            }
        }
        index
    }

    fn allocate_id(&mut self) -> MenuId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// New `updated_at`, never earlier than the previous one
    fn touch(record: &mut MenuRecord) {
        record.updated_at = now().max(record.updated_at);
    }

    pub fn create(&mut self, input: CreateMenu) -> MenuResult<MenuRecord> {
        let draft = validator::validate_create(self, &input)?;
        let id = self.allocate_id();
        let record = draft.into_record(id, now());
        self.records.insert(id, record.clone());
        tracing::debug!("Created menu {} ({})", record.id, record.name);
        Ok(record)
    }

    pub fn update(&mut self, id: MenuId, patch: &MenuPatch) -> MenuResult<MenuRecord> {
        let mut record = validator::validate_update(self, id, patch)?;
        Self::touch(&mut record);
        self.records.insert(id, record.clone());
        Ok(record)
    }

    /// Removes `id` and all of its descendants.
    pub fn delete(&mut self, id: MenuId) -> MenuResult<Deletion> {
        let DeletionPlan { ids, .. } = validator::validate_delete(self, id)?;
        for removed in &ids {
            self.records.remove(removed);
        }
        tracing::debug!("Deleted menu {} with {} descendants", id, ids.len() - 1);
        Ok(Deletion { removed: ids })
    }

    /// Re-parents `id`; `None` moves it to the root level.
    pub fn move_menu(&mut self, id: MenuId, new_parent: Option<MenuId>) -> MenuResult<MenuRecord> {
        self.require(id)?;
        if let Some(parent_id) = new_parent {
            if !self.contains(parent_id) {
                return Err(MenuError::ParentNotFound(parent_id));
            }
            validator::check_parent(self, Some(id), parent_id)?;
        }
        self.update(id, &MenuPatch::parent(new_parent))
    }

    /// Shallow copy of `id`; children are not copied.
    pub fn duplicate(&mut self, id: MenuId, overrides: DuplicateOverrides) -> MenuResult<MenuRecord> {
        let source = self.require(id)?.clone();
        let name = match overrides.name {
            Some(name) => name,
            None => self.copy_name(&source.name),
        };
        let display_name = overrides
            .display_name
            .unwrap_or_else(|| with_suffix(&source.display_name, " (Copy)", validator::DISPLAY_NAME_MAX));

        self.create(CreateMenu {
            name,
            display_name,
            url: source.url,
            description: source.description,
            icon: source.icon,
            parent_id: overrides.parent_id.unwrap_or(source.parent_id),
            sort_order: Some(source.sort_order.into()),
            is_active: Some(source.is_active),
            target: Some(source.target.as_str().to_string()),
            permission: source.permission,
        })
    }

    /// First free name of `<base>-copy`, `<base>-copy-2`, `<base>-copy-3`, ...
    /// The base is shortened as needed to keep the result within `NAME_MAX`.
    pub fn copy_name(&self, base: &str) -> String {
        let first = with_suffix(base, "-copy", validator::NAME_MAX);
        if !self.name_exists(&first, None) {
            return first;
        }
        (2..)
            .map(|n| with_suffix(base, &format!("-copy-{}", n), validator::NAME_MAX))
            .find(|candidate| !self.name_exists(candidate, None))
            .unwrap_or(first)
    }

    /// Flips `is_active` on `id` only; descendants keep their own flag.
    pub fn toggle_active(&mut self, id: MenuId) -> MenuResult<MenuRecord> {
        let record = self.get_mut(id).ok_or(MenuError::NotFound(id))?;
        record.is_active = !record.is_active;
        Self::touch(record);
        Ok(record.clone())
    }

    pub fn bulk_delete(&mut self, ids: &[MenuId]) -> MenuResult<BulkReport> {
        require_ids(ids)?;
        let mut working = self.clone();
        let mut affected = Vec::new();
        let mut outcomes = Vec::with_capacity(ids.len());

        for &id in ids {
            if !self.contains(id) {
                outcomes.push(BatchOutcome::failed(id, &MenuError::NotFound(id)));
            } else if !working.contains(id) {
                // Already removed with an ancestor earlier in the batch.
                outcomes.push(BatchOutcome::ok(id));
            } else {
                match working.delete(id) {
                    Ok(deletion) => {
                        affected.extend(deletion.removed);
                        outcomes.push(BatchOutcome::ok(id));
                    }
                    Err(e) => outcomes.push(BatchOutcome::failed(id, &e)),
                }
            }
        }

        self.commit_batch(working, affected, outcomes)
    }

    pub fn bulk_update(&mut self, ids: &[MenuId], patch: &MenuPatch) -> MenuResult<BulkReport> {
        require_ids(ids)?;
        let mut working = self.clone();
        let mut affected = Vec::new();
        let mut outcomes = Vec::with_capacity(ids.len());

        for &id in ids {
            match working.update(id, patch) {
                Ok(record) => {
                    affected.push(record.id);
                    outcomes.push(BatchOutcome::ok(id));
                }
                Err(e) => outcomes.push(BatchOutcome::failed(id, &e)),
            }
        }

        self.commit_batch(working, affected, outcomes)
    }

    /// Applies new sort orders (and optionally parents) as one unit. Each id
    /// may appear once. Every parent change is checked against the final
    /// shape of the batch, so two entries that only form a cycle together
    /// are both rejected.
    pub fn reorder(&mut self, items: &[ReorderItem]) -> MenuResult<Vec<MenuRecord>> {
        reject_repeated_ids(items.iter().map(|i| i.id), "Menu")?;

        let mut working = self.clone();
        let mut outcomes: Vec<BatchOutcome> = Vec::with_capacity(items.len());

        for item in items {
            let result = self.require(item.id).and_then(|_| {
                let sort_order = i32::try_from(item.sort_order)
                    .ok()
                    .filter(|v| *v >= 0)
                    .ok_or_else(|| {
                        MenuError::field("sort_order", "Sort order must be a non-negative integer")
                    })?;
                if let Some(Some(parent_id)) = item.parent_id {
                    if !self.contains(parent_id) {
                        return Err(MenuError::ParentNotFound(parent_id));
                    }
                }
                if let Some(record) = working.get_mut(item.id) {
                    record.sort_order = sort_order;
                    if let Some(parent_id) = item.parent_id {
                        record.parent_id = parent_id;
                    }
                }
                Ok(())
            });
            outcomes.push(match result {
                Ok(()) => BatchOutcome::ok(item.id),
                Err(e) => BatchOutcome::failed(item.id, &e),
            });
        }

        for (item, outcome) in items.iter().zip(outcomes.iter_mut()) {
            if !outcome.ok {
                continue;
            }
            if let Some(Some(parent_id)) = item.parent_id {
                if let Err(e) = validator::check_parent(&working, Some(item.id), parent_id) {
                    *outcome = BatchOutcome::failed(item.id, &e);
                }
            }
        }

        if outcomes.iter().any(|o| !o.ok) {
            return Err(MenuError::PartialBatch(outcomes));
        }

        let mut updated = Vec::with_capacity(items.len());
        for item in items {
            if let Some(record) = working.get_mut(item.id) {
                Self::touch(record);
                updated.push(record.clone());
            }
        }
        *self = working;
        Ok(updated)
    }

    /// Adds exported records as new ones. Source ids are remapped; a
    /// `parent_id` resolves against the imported set first, then against
    /// records already in the store.
    pub fn import(&mut self, records: Vec<ImportRecord>) -> MenuResult<ImportReport> {
        reject_repeated_ids(records.iter().map(|r| r.id), "Source id")?;

        let mut working = self.clone();
        let source_ids: HashSet<MenuId> = records.iter().map(|r| r.id).collect();
        let mut id_map = BTreeMap::new();
        let mut outcomes: HashMap<MenuId, BatchOutcome> = HashMap::new();
        let mut imported = Vec::new();

        let mut pending = records;
        pending.sort_by_key(|r| r.id);

        // Parents first: each pass creates every record whose parent is
        // already resolved. A pass with no progress leaves only cycles.
        loop {
            let before = pending.len();
            let mut blocked = Vec::new();

            for record in pending {
                let parent = match record.parent_id {
                    Some(p) if source_ids.contains(&p) && p != record.id => match id_map.get(&p) {
                        Some(&mapped) => Some(mapped),
                        None if outcomes.contains_key(&p) => {
                            let err = MenuError::ParentNotFound(p);
                            outcomes.insert(record.id, BatchOutcome::failed(record.id, &err));
                            continue;
                        }
                        None => {
                            blocked.push(record);
                            continue;
                        }
                    },
                    Some(p) if p == record.id => {
                        let err = MenuError::CyclicParent { id: p, parent_id: p };
                        outcomes.insert(record.id, BatchOutcome::failed(record.id, &err));
                        continue;
                    }
                    other => other,
                };

                let source_id = record.id;
                match working.create(record.into_create(parent)) {
                    Ok(created) => {
                        id_map.insert(source_id, created.id);
                        outcomes.insert(source_id, BatchOutcome::ok(source_id));
                        imported.push(created);
                    }
                    Err(e) => {
                        outcomes.insert(source_id, BatchOutcome::failed(source_id, &e));
                    }
                }
            }

            if blocked.is_empty() {
                break;
            }
            if blocked.len() == before {
                for record in &blocked {
                    let err = MenuError::CyclicParent {
                        id: record.id,
                        parent_id: record.parent_id.unwrap_or(record.id),
                    };
                    outcomes.insert(record.id, BatchOutcome::failed(record.id, &err));
                }
                break;
            }
            pending = blocked;
        }

        let mut outcomes: Vec<BatchOutcome> = outcomes.into_values().collect();
        outcomes.sort_by_key(|o| o.id);

        if outcomes.iter().any(|o| !o.ok) {
            return Err(MenuError::PartialBatch(outcomes));
        }

        *self = working;
        tracing::info!("Imported {} menus", imported.len());
        Ok(ImportReport {
            imported,
            id_map,
            outcomes,
        })
    }

    fn commit_batch(
        &mut self,
        working: MenuStore,
        affected: Vec<MenuId>,
        outcomes: Vec<BatchOutcome>,
    ) -> MenuResult<BulkReport> {
        if outcomes.iter().any(|o| !o.ok) {
            return Err(MenuError::PartialBatch(outcomes));
        }
        *self = working;
        Ok(BulkReport { affected, outcomes })
    }
}

/// `base` cut to fit `max` characters once `suffix` is appended
fn with_suffix(base: &str, suffix: &str, max: usize) -> String {
    let keep = max.saturating_sub(suffix.chars().count());
    let mut out: String = base.chars().take(keep).collect();
    out.push_str(suffix);
    out
}

/// Every occurrence of an id listed more than once fails the batch.
fn reject_repeated_ids(ids: impl Iterator<Item = MenuId> + Clone, label: &str) -> MenuResult<()> {
    let mut counts: HashMap<MenuId, usize> = HashMap::new();
    for id in ids.clone() {
        *counts.entry(id).or_default() += 1;
    }
    if counts.values().all(|&n| n == 1) {
        return Ok(());
    }

    let outcomes = ids
        .map(|id| {
            if counts[&id] > 1 {
                let err = MenuError::field("id", format!("{} {} appears more than once", label, id));
                BatchOutcome::failed(id, &err)
            } else {
                BatchOutcome::ok(id)
            }
        })
        .collect();
    Err(MenuError::PartialBatch(outcomes))
}

fn require_ids(ids: &[MenuId]) -> MenuResult<()> {
    if ids.is_empty() {
        return Err(MenuError::field("ids", "At least one menu must be selected"));
    }
    Ok(())
}

fn now() -> DateTime<Utc> {
    Utc::now()
}
