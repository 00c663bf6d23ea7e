//! Tree builder: flat records to an ordered forest of `MenuNode`s
//!
//! The builder never fails. Records pointing at a missing parent are shown
//! as roots and listed in `orphans`; records caught in a parent cycle can
//! never be reached from a root and are listed in `unreachable`.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::model::{MenuId, MenuNode, MenuRecord};
use super::query::sibling_cmp;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MenuForest {
    pub roots: Vec<MenuNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orphans: Vec<MenuId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unreachable: Vec<MenuId>,
}

pub fn build_tree<'a, I>(records: I) -> MenuForest
where
    I: IntoIterator<Item = &'a MenuRecord>,
{
    let mut by_id: BTreeMap<MenuId, &MenuRecord> = BTreeMap::new();
    for record in records {
        by_id.entry(record.id).or_insert(record);
    }

    let mut orphans = Vec::new();
    let mut children: HashMap<Option<MenuId>, Vec<&MenuRecord>> = HashMap::new();
    for record in by_id.values() {
        let key = match record.parent_id {
            Some(parent_id) if by_id.contains_key(&parent_id) => Some(parent_id),
            Some(_) => {
                orphans.push(record.id);
                None
            }
            None => None,
        };
        children.entry(key).or_default().push(record);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| sibling_cmp(a, b));
    }

    let mut visited = HashSet::new();
    let roots = attach(None, 0, &children, &mut visited);

    let unreachable = by_id
        .keys()
        .filter(|id| !visited.contains(*id))
        .copied()
        .collect::<Vec<_>>();
    if !orphans.is_empty() || !unreachable.is_empty() {
        tracing::debug!(
            "Menu tree built with {} orphans and {} unreachable records",
            orphans.len(),
            unreachable.len()
        );
    }

    MenuForest {
        roots,
        orphans,
        unreachable,
    }
}

fn attach(
    parent: Option<MenuId>,
    level: usize,
    children: &HashMap<Option<MenuId>, Vec<&MenuRecord>>,
    visited: &mut HashSet<MenuId>,
) -> Vec<MenuNode> {
    let Some(siblings) = children.get(&parent) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(siblings.len());
    for record in siblings {
        if !visited.insert(record.id) {
            continue;
        }
        nodes.push(MenuNode {
            record: (*record).clone(),
            level,
            children: attach(Some(record.id), level + 1, children, visited),
        });
    }
    nodes
}

impl MenuForest {
    /// Depth-first, parent before children, siblings in display order
    pub fn flatten(&self) -> Vec<MenuRecord> {
        fn walk(nodes: &[MenuNode], out: &mut Vec<MenuRecord>) {
            for node in nodes {
                out.push(node.record.clone());
                walk(&node.children, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.roots, &mut out);
        out
    }

    /// Drops every node failing `keep`, together with its subtree.
    pub fn prune<F>(mut self, keep: F) -> Self
    where
        F: Fn(&MenuRecord) -> bool,
    {
        fn retain<F: Fn(&MenuRecord) -> bool>(nodes: &mut Vec<MenuNode>, keep: &F) {
            nodes.retain(|n| keep(&n.record));
            for node in nodes.iter_mut() {
                retain(&mut node.children, keep);
            }
        }

        retain(&mut self.roots, &keep);
        self
    }

    /// Zero-based level of the deepest node; 0 for an empty forest
    pub fn max_level(&self) -> usize {
        fn deepest(nodes: &[MenuNode]) -> Option<usize> {
            nodes
                .iter()
                .map(|n| deepest(&n.children).unwrap_or(n.level))
                .max()
        }

        deepest(&self.roots).unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        fn count(nodes: &[MenuNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }

        count(&self.roots)
    }
}
