use std::collections::HashSet;

use crate::model::catalog::Catalog;
use crate::model::join::JoinColumn;
use crate::name::TableName;

/// Generates internal names that don't collide with names already in use.
///
/// Every generated group, sequence and tree name is added to its pool, so
/// calling the same method twice yields two different names. Collisions are
/// resolved by appending `$1`, `$2` and so on.
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    group_names: HashSet<String>,
    sequence_names: HashSet<String>,
    tree_names: HashSet<String>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the pools with every group, sequence and tree name in a catalog.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        NameGenerator::new()
            .with_group_names(catalog.groups().map(|g| g.name.clone()))
            .with_sequence_names(catalog.sequences().map(|s| s.name.table().to_string()))
            .with_tree_names(catalog_tree_names(catalog))
    }

    pub fn with_group_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.group_names.extend(names);
        self
    }

    pub fn with_sequence_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.sequence_names.extend(names);
        self
    }

    pub fn with_tree_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.tree_names.extend(names);
        self
    }

    /// Groups are named after their root table.
    pub fn group_name(&mut self, root: &TableName) -> String {
        make_unique(&mut self.group_names, root.table().to_string())
    }

    pub fn group_table_name(&self, group: &str) -> String {
        format!("_group_{group}")
    }

    pub fn join_name(&self, parent: &TableName, child: &TableName, columns: &[JoinColumn]) -> String {
        let parent_cols = columns
            .iter()
            .map(|c| c.parent.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let child_cols = columns
            .iter()
            .map(|c| c.child.as_str())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/{}/{}/{}/{}/{}",
            parent.schema(),
            parent.table(),
            parent_cols,
            child.schema(),
            child.table(),
            child_cols
        )
    }

    pub fn identity_sequence_name(&mut self, table: &TableName) -> String {
        make_unique(
            &mut self.sequence_names,
            format!("{}_identity", table.table()),
        )
    }

    pub fn tree_name_for_group(&mut self, schema: &str, group: &str) -> String {
        make_unique(&mut self.tree_names, format!("{schema}.{group}"))
    }

    /// `target` is the table name for table indexes, the group name for
    /// group indexes.
    pub fn tree_name_for_index(&mut self, schema: &str, target: &str, index: &str) -> String {
        make_unique(&mut self.tree_names, format!("{schema}.{target}.{index}"))
    }

    pub fn tree_name_for_sequence(&mut self, schema: &str, sequence: &str) -> String {
        make_unique(&mut self.tree_names, format!("{schema}.{sequence}"))
    }
}

/// Every tree name in use by groups, indexes and sequences.
pub fn catalog_tree_names(catalog: &Catalog) -> impl Iterator<Item = String> + '_ {
    let group_trees = catalog.groups().flat_map(|group| {
        std::iter::once(group.tree_name.clone())
            .chain(group.indexes.values().map(|idx| idx.tree_name.clone()))
    });
    let table_trees = catalog.user_tables().flat_map(|table| {
        let root_tree = if table.is_root() {
            table.tree_name.clone()
        } else {
            None
        };
        root_tree
            .into_iter()
            .chain(table.indexes.values().map(|idx| idx.tree_name.clone()))
    });
    let sequence_trees = catalog.sequences().filter_map(|seq| seq.tree_name.clone());

    group_trees.chain(table_trees).chain(sequence_trees)
}

fn make_unique(pool: &mut HashSet<String>, base: String) -> String {
    if pool.insert(base.clone()) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}${n}");
        if pool.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
