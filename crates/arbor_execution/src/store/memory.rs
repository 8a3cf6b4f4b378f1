//! In-memory store.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::ops::Bound;
use std::sync::Arc;

use arbor_catalog::model::group::Group;
use arbor_catalog::model::index::{Index, IndexTarget};
use arbor_catalog::model::table::UserTable;
use arbor_catalog::{Catalog, TableId};
use arbor_types::ScalarValue;
use parking_lot::RwLock;
use tracing::debug;

use super::{GroupCursor, Store};
use crate::cursor::{CursorLifecycle, CursorState};
use crate::errors::{ExecutionError, Result};
use crate::hkey::HKey;
use crate::row::{Row, RowRef};

type GroupTree = BTreeMap<HKey, RowRef>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct IndexEntry {
    key: Vec<ScalarValue>,
    hkey: HKey,
}

#[derive(Debug, Default)]
struct IndexTree {
    entries: BTreeSet<IndexEntry>,
}

/// Store keeping group and index trees in memory, keyed by tree name.
///
/// Index trees are populated by `build_indexes`. Rows inserted afterwards are
/// not added to existing indexes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    groups: RwLock<HashMap<String, Arc<RwLock<GroupTree>>>>,
    indexes: RwLock<HashMap<String, IndexTree>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn group_tree(&self, group: &Group) -> Arc<RwLock<GroupTree>> {
        if let Some(tree) = self.groups.read().get(&group.tree_name) {
            return tree.clone();
        }
        self.groups
            .write()
            .entry(group.tree_name.clone())
            .or_default()
            .clone()
    }

    /// Write a row into its group, replacing any row with the same hkey.
    pub fn write_row(&self, group: &Group, row: Row) -> Result<()> {
        if row.hkey().is_empty() {
            return Err(ExecutionError::MalformedHKey(format!(
                "cannot store row without hkey: {row}"
            )));
        }
        let tree = self.group_tree(group);
        let mut tree = tree.write();
        tree.insert(row.hkey().clone(), Arc::new(row));
        Ok(())
    }

    /// All rows of a group in hkey order.
    pub fn rows(&self, group: &Group) -> Vec<RowRef> {
        match self.groups.read().get(&group.tree_name) {
            Some(tree) => tree.read().values().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Keys of an index tree in order, or None if the tree doesn't exist.
    pub fn index_keys(&self, index: &Index) -> Option<Vec<Vec<ScalarValue>>> {
        self.indexes
            .read()
            .get(&index.tree_name)
            .map(|tree| tree.entries.iter().map(|e| e.key.clone()).collect())
    }

    pub fn has_tree(&self, tree_name: &str) -> bool {
        self.groups.read().contains_key(tree_name) || self.indexes.read().contains_key(tree_name)
    }

    fn all_group_indexes<'a>(catalog: &'a Catalog, group: &'a Group) -> impl Iterator<Item = &'a Index> {
        catalog
            .group_members(&group.name)
            .flat_map(|t| t.indexes.values())
            .chain(group.indexes.values())
    }

    fn build_index(&self, catalog: &Catalog, index: &Index, tree: &GroupTree) -> Result<IndexTree> {
        let depth = |id: TableId| {
            catalog
                .user_table_by_id(id)
                .and_then(|t| t.depth)
                .unwrap_or(0)
        };
        let leaf = index
            .leaf_most_table(depth)
            .ok_or_else(|| ExecutionError::Store(format!("index {} has no columns", index.name)))?;

        let mut entries = BTreeSet::new();
        let mut seen = HashSet::new();
        for row in tree.values().filter(|r| r.row_type().table_id() == leaf) {
            let mut key = Vec::with_capacity(index.columns().len());
            for col in index.columns() {
                let source = if col.table == leaf {
                    Some(row.clone())
                } else {
                    let ancestor = row.hkey().ancestor(depth(col.table))?;
                    tree.get(&ancestor).cloned()
                };
                let value = source
                    .and_then(|r| r.value(col.column_position).cloned())
                    .unwrap_or(ScalarValue::Null);
                key.push(value);
            }

            if index.unique && !key.iter().any(ScalarValue::is_null) && !seen.insert(key.clone()) {
                return Err(ExecutionError::Store(format!(
                    "Duplicate key for unique index {}",
                    index.name
                )));
            }
            entries.insert(IndexEntry {
                key,
                hkey: row.hkey().clone(),
            });
        }

        Ok(IndexTree { entries })
    }
}

impl Store for MemoryStore {
    fn remove_trees(&self, catalog: &Catalog, group: &Group, table: &UserTable) -> Result<()> {
        let mut indexes = self.indexes.write();
        for index in Self::all_group_indexes(catalog, group).chain(table.indexes.values()) {
            indexes.remove(&index.tree_name);
        }
        self.groups.write().remove(&group.tree_name);
        debug!(group = %group.name, table = %table.name, "removed trees");
        Ok(())
    }

    fn truncate_group(&self, catalog: &Catalog, group: &Group) -> Result<()> {
        if let Some(tree) = self.groups.read().get(&group.tree_name) {
            tree.write().clear();
        }
        let mut indexes = self.indexes.write();
        for index in Self::all_group_indexes(catalog, group) {
            if let Some(tree) = indexes.get_mut(&index.tree_name) {
                tree.entries.clear();
            }
        }
        Ok(())
    }

    fn truncate_table(&self, catalog: &Catalog, group: &Group, table: TableId) -> Result<()> {
        let removed: HashSet<HKey> = match self.groups.read().get(&group.tree_name) {
            Some(tree) => {
                let mut tree = tree.write();
                let keys: HashSet<HKey> = tree
                    .iter()
                    .filter(|(_, row)| row.row_type().table_id() == table)
                    .map(|(k, _)| k.clone())
                    .collect();
                tree.retain(|k, _| !keys.contains(k));
                keys
            }
            None => HashSet::new(),
        };
        if removed.is_empty() {
            return Ok(());
        }

        let mut indexes = self.indexes.write();
        for index in Self::all_group_indexes(catalog, group) {
            if let Some(tree) = indexes.get_mut(&index.tree_name) {
                tree.entries.retain(|e| !removed.contains(&e.hkey));
            }
        }
        Ok(())
    }

    fn build_indexes(&self, catalog: &Catalog, indexes: &[Index], defer: bool) -> Result<()> {
        for index in indexes {
            let tree = if defer {
                IndexTree::default()
            } else {
                let group = match &index.target {
                    IndexTarget::Table(id) => catalog
                        .user_table_by_id(*id)
                        .and_then(|t| t.group.as_deref())
                        .and_then(|g| catalog.group(g)),
                    IndexTarget::Group(name) => catalog.group(name),
                }
                .ok_or_else(|| {
                    ExecutionError::Store(format!("no group found for index {}", index.name))
                })?;
                let rows = self.group_tree(group);
                let rows = rows.read();
                self.build_index(catalog, index, &rows)?
            };
            debug!(index = %index.name, entries = tree.entries.len(), "built index");
            self.indexes.write().insert(index.tree_name.clone(), tree);
        }
        Ok(())
    }

    fn delete_indexes(&self, indexes: &[Index]) -> Result<()> {
        let mut trees = self.indexes.write();
        for index in indexes {
            trees.remove(&index.tree_name);
        }
        Ok(())
    }

    fn new_group_cursor(&self, group: &Group, batch_hint: usize) -> Result<Box<dyn GroupCursor>> {
        Ok(Box::new(MemoryGroupCursor {
            tree: self.group_tree(group),
            lifecycle: CursorLifecycle::new("MemoryGroupCursor", true),
            binding: None,
            last: None,
            buffer: VecDeque::new(),
            exhausted: false,
            batch_hint: batch_hint.max(1),
        }))
    }
}

#[derive(Debug)]
pub struct MemoryGroupCursor {
    tree: Arc<RwLock<GroupTree>>,
    lifecycle: CursorLifecycle,
    binding: Option<(HKey, bool)>,
    /// Last hkey fetched from the tree.
    last: Option<HKey>,
    buffer: VecDeque<RowRef>,
    exhausted: bool,
    batch_hint: usize,
}

impl MemoryGroupCursor {
    fn in_range(&self, hkey: &HKey) -> bool {
        match &self.binding {
            None => true,
            Some((bound, true)) => bound.is_prefix_of(hkey),
            Some((bound, false)) => bound == hkey,
        }
    }

    fn fill(&mut self) {
        let tree = self.tree.read();
        let start = match (&self.last, &self.binding) {
            (Some(last), _) => Bound::Excluded(last.clone()),
            (None, Some((bound, _))) => Bound::Included(bound.clone()),
            (None, None) => Bound::Unbounded,
        };

        for (hkey, row) in tree.range((start, Bound::Unbounded)) {
            if !self.in_range(hkey) {
                self.exhausted = true;
                break;
            }
            self.buffer.push_back(row.clone());
            self.last = Some(hkey.clone());
            if self.buffer.len() >= self.batch_hint {
                return;
            }
        }
        self.exhausted = true;
    }
}

impl GroupCursor for MemoryGroupCursor {
    fn rebind(&mut self, hkey: HKey, deep: bool) -> Result<()> {
        self.lifecycle.check_open()?;
        self.binding = Some((hkey, deep));
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        self.lifecycle.check_open()?;
        self.last = None;
        self.buffer.clear();
        self.exhausted = false;
        self.lifecycle.set_active();
        Ok(())
    }

    fn next(&mut self) -> Result<Option<RowRef>> {
        self.lifecycle.check_next()?;
        if self.buffer.is_empty() && !self.exhausted {
            self.fill();
        }
        match self.buffer.pop_front() {
            Some(row) => Ok(Some(row)),
            None => {
                self.lifecycle.set_idle();
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.lifecycle.check_close()?;
        self.buffer.clear();
        self.lifecycle.set_idle();
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        self.lifecycle.check_destroy()?;
        self.buffer.clear();
        self.lifecycle.set_destroyed();
        Ok(())
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }
}
