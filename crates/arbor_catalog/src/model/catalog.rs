use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::group::{Group, GroupTable};
use super::join::Join;
use super::sequence::Sequence;
use super::table::UserTable;
use super::view::View;
use crate::TableId;
use crate::errors::{CatalogError, Result};
use crate::name::TableName;

/// The in-memory schema.
///
/// Entities are stored in maps keyed by table id or name. Once frozen, every
/// mutating method errors with [`CatalogError::Frozen`]. Use
/// [`Catalog::clone_unfrozen`] to get a writable copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    frozen: bool,
    user_tables: BTreeMap<TableId, UserTable>,
    user_table_names: BTreeMap<TableName, TableId>,
    group_tables: BTreeMap<TableId, GroupTable>,
    group_table_names: BTreeMap<TableName, TableId>,
    groups: BTreeMap<String, Group>,
    joins: BTreeMap<String, Join>,
    sequences: BTreeMap<TableName, Sequence>,
    views: BTreeMap<TableName, View>,
}

impl PartialEq for Catalog {
    /// Structural equality, ignoring frozen state.
    fn eq(&self, other: &Self) -> bool {
        self.user_tables == other.user_tables
            && self.user_table_names == other.user_table_names
            && self.group_tables == other.group_tables
            && self.group_table_names == other.group_table_names
            && self.groups == other.groups
            && self.joins == other.joins
            && self.sequences == other.sequences
            && self.views == other.views
    }
}

impl Eq for Catalog {}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Deep copy that can be mutated regardless of this catalog's state.
    pub fn clone_unfrozen(&self) -> Catalog {
        let mut catalog = self.clone();
        catalog.frozen = false;
        catalog
    }

    pub fn user_table(&self, name: &TableName) -> Option<&UserTable> {
        self.user_table_names
            .get(name)
            .and_then(|id| self.user_tables.get(id))
    }

    pub fn user_table_by_id(&self, id: TableId) -> Option<&UserTable> {
        self.user_tables.get(&id)
    }

    /// User tables ordered by id.
    pub fn user_tables(&self) -> impl Iterator<Item = &UserTable> {
        self.user_tables.values()
    }

    pub fn group_table(&self, name: &TableName) -> Option<&GroupTable> {
        self.group_table_names
            .get(name)
            .and_then(|id| self.group_tables.get(id))
    }

    pub fn group_table_by_id(&self, id: TableId) -> Option<&GroupTable> {
        self.group_tables.get(&id)
    }

    pub fn group_tables(&self) -> impl Iterator<Item = &GroupTable> {
        self.group_tables.values()
    }

    /// Name of a user or group table.
    pub fn table_name_by_id(&self, id: TableId) -> Option<&TableName> {
        self.user_tables
            .get(&id)
            .map(|t| &t.name)
            .or_else(|| self.group_tables.get(&id).map(|t| &t.name))
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Tables belonging to a group, ordered by id.
    pub fn group_members<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a UserTable> {
        self.user_tables
            .values()
            .filter(move |t| t.group.as_deref() == Some(group))
    }

    pub fn join(&self, name: &str) -> Option<&Join> {
        self.joins.get(name)
    }

    pub fn joins(&self) -> impl Iterator<Item = &Join> {
        self.joins.values()
    }

    pub fn parent_join(&self, table: &UserTable) -> Option<&Join> {
        table
            .parent_join
            .as_deref()
            .and_then(|name| self.joins.get(name))
    }

    pub fn parent_table(&self, table: &UserTable) -> Option<&UserTable> {
        self.parent_join(table)
            .and_then(|join| self.user_tables.get(&join.parent))
    }

    /// Tables with a selected parent join pointing at `id`.
    pub fn child_tables(&self, id: TableId) -> Vec<&UserTable> {
        let Some(table) = self.user_tables.get(&id) else {
            return Vec::new();
        };
        table
            .child_joins
            .iter()
            .filter_map(|name| {
                let join = self.joins.get(name)?;
                let child = self.user_tables.get(&join.child)?;
                (child.parent_join.as_deref() == Some(name.as_str())).then_some(child)
            })
            .collect()
    }

    /// Ancestor of `table` at `depth`, or the table itself if it sits at that
    /// depth.
    pub fn ancestor_at_depth<'a>(
        &'a self,
        table: &'a UserTable,
        depth: u32,
    ) -> Option<&'a UserTable> {
        let mut current = table;
        loop {
            let current_depth = current.depth?;
            if current_depth == depth {
                return Some(current);
            }
            if current_depth < depth {
                return None;
            }
            current = self.parent_table(current)?;
        }
    }

    /// If `ancestor` is `table` or one of its ancestors.
    pub fn is_ancestor_of(&self, ancestor: &UserTable, table: &UserTable) -> bool {
        match ancestor.depth {
            Some(depth) => self
                .ancestor_at_depth(table, depth)
                .is_some_and(|t| t.id == ancestor.id),
            None => false,
        }
    }

    pub fn sequence(&self, name: &TableName) -> Option<&Sequence> {
        self.sequences.get(name)
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values()
    }

    pub fn view(&self, name: &TableName) -> Option<&View> {
        self.views.get(name)
    }

    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn schemas(&self) -> BTreeSet<&str> {
        self.user_table_names
            .keys()
            .chain(self.sequences.keys())
            .chain(self.views.keys())
            .map(|name| name.schema())
            .collect()
    }

    /// If a user table or view with this name exists.
    pub fn contains_table_name(&self, name: &TableName) -> bool {
        self.user_table_names.contains_key(name) || self.views.contains_key(name)
    }

    fn check_mutable(&self) -> Result<()> {
        if self.frozen {
            return Err(CatalogError::Frozen);
        }
        Ok(())
    }

    pub fn add_user_table(&mut self, table: UserTable) -> Result<()> {
        self.check_mutable()?;
        if self.contains_table_name(&table.name) || self.group_table_names.contains_key(&table.name)
        {
            return Err(CatalogError::DuplicateTableName(table.name));
        }
        self.user_table_names.insert(table.name.clone(), table.id);
        self.user_tables.insert(table.id, table);
        Ok(())
    }

    pub fn user_table_mut(&mut self, id: TableId) -> Result<&mut UserTable> {
        self.check_mutable()?;
        self.user_tables
            .get_mut(&id)
            .ok_or(CatalogError::NoSuchTableId(id))
    }

    pub fn remove_user_table(&mut self, id: TableId) -> Result<UserTable> {
        self.check_mutable()?;
        let table = self
            .user_tables
            .remove(&id)
            .ok_or(CatalogError::NoSuchTableId(id))?;
        self.user_table_names.remove(&table.name);
        Ok(table)
    }

    pub fn rename_user_table(&mut self, id: TableId, new_name: TableName) -> Result<()> {
        self.check_mutable()?;
        if self.contains_table_name(&new_name) || self.group_table_names.contains_key(&new_name) {
            return Err(CatalogError::DuplicateTableName(new_name));
        }
        let table = self
            .user_tables
            .get_mut(&id)
            .ok_or(CatalogError::NoSuchTableId(id))?;
        self.user_table_names.remove(&table.name);
        self.user_table_names.insert(new_name.clone(), id);
        table.name = new_name;
        Ok(())
    }

    pub fn add_group(&mut self, group: Group, group_table: GroupTable) -> Result<()> {
        self.check_mutable()?;
        if self.groups.contains_key(&group.name) {
            return Err(crate::errors::internal!("duplicate group {}", group.name));
        }
        if self.contains_table_name(&group_table.name)
            || self.group_table_names.contains_key(&group_table.name)
        {
            return Err(CatalogError::DuplicateTableName(group_table.name));
        }
        self.group_table_names
            .insert(group_table.name.clone(), group_table.id);
        self.group_tables.insert(group_table.id, group_table);
        self.groups.insert(group.name.clone(), group);
        Ok(())
    }

    pub fn group_mut(&mut self, name: &str) -> Result<&mut Group> {
        self.check_mutable()?;
        self.groups
            .get_mut(name)
            .ok_or_else(|| CatalogError::NoSuchGroup(name.to_string()))
    }

    /// Remove a group along with its group table.
    pub fn remove_group(&mut self, name: &str) -> Result<Group> {
        self.check_mutable()?;
        let group = self
            .groups
            .remove(name)
            .ok_or_else(|| CatalogError::NoSuchGroup(name.to_string()))?;
        if let Some(group_table) = self.group_tables.remove(&group.group_table) {
            self.group_table_names.remove(&group_table.name);
        }
        Ok(group)
    }

    pub fn add_join(&mut self, join: Join) -> Result<()> {
        self.check_mutable()?;
        if self.joins.contains_key(&join.name) {
            return Err(crate::errors::internal!("duplicate join {}", join.name));
        }
        self.joins.insert(join.name.clone(), join);
        Ok(())
    }

    pub fn join_mut(&mut self, name: &str) -> Result<&mut Join> {
        self.check_mutable()?;
        self.joins
            .get_mut(name)
            .ok_or_else(|| crate::errors::internal!("missing join {name}"))
    }

    pub fn remove_join(&mut self, name: &str) -> Result<Option<Join>> {
        self.check_mutable()?;
        Ok(self.joins.remove(name))
    }

    pub fn add_sequence(&mut self, sequence: Sequence) -> Result<()> {
        self.check_mutable()?;
        if self.sequences.contains_key(&sequence.name) {
            return Err(CatalogError::DuplicateSequenceName(
                sequence.name.to_string(),
            ));
        }
        self.sequences.insert(sequence.name.clone(), sequence);
        Ok(())
    }

    pub fn remove_sequence(&mut self, name: &TableName) -> Result<Option<Sequence>> {
        self.check_mutable()?;
        Ok(self.sequences.remove(name))
    }

    pub fn add_view(&mut self, view: View) -> Result<()> {
        self.check_mutable()?;
        if self.contains_table_name(&view.name) || self.group_table_names.contains_key(&view.name) {
            return Err(CatalogError::DuplicateTableName(view.name));
        }
        self.views.insert(view.name.clone(), view);
        Ok(())
    }

    pub fn remove_view(&mut self, name: &TableName) -> Result<Option<View>> {
        self.check_mutable()?;
        Ok(self.views.remove(name))
    }
}
