use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::column::{CharsetAndCollation, Column};
use super::index::Index;
use crate::TableId;
use crate::name::TableName;

/// Engine recorded for tables that don't declare one.
pub const DEFAULT_ENGINE: &str = "arbor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTable {
    pub id: TableId,
    pub name: TableName,
    pub engine: String,
    pub charset: Option<CharsetAndCollation>,
    /// Ordered by position.
    pub columns: Vec<Column>,
    pub indexes: IndexMap<String, Index>,
    /// Name of the selected parent join. None for a root table.
    pub parent_join: Option<String>,
    /// Every join declared with this table as the child.
    pub candidate_parent_joins: Vec<String>,
    pub child_joins: Vec<String>,
    pub group: Option<String>,
    /// Distance from the group root. Set when the table is grouped.
    pub depth: Option<u32>,
    /// Distinguishes tables within a group. Set when the table is grouped.
    pub ordinal: Option<u32>,
    /// Root tables carry the group's tree name.
    pub tree_name: Option<String>,
}

impl UserTable {
    pub fn new(id: TableId, name: TableName) -> Self {
        UserTable {
            id,
            name,
            engine: DEFAULT_ENGINE.to_string(),
            charset: None,
            columns: Vec::new(),
            indexes: IndexMap::new(),
            parent_join: None,
            candidate_parent_joins: Vec::new(),
            child_joins: Vec::new(),
            group: None,
            depth: None,
            ordinal: None,
            tree_name: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_join.is_none()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_at(&self, position: usize) -> Option<&Column> {
        self.columns.iter().find(|c| c.position == position)
    }

    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.values().find(|idx| idx.is_primary_key())
    }

    /// Primary key column names in key order. Empty if there's no primary key.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.primary_key()
            .map(|pk| pk.columns().iter().map(|c| c.column.as_str()).collect())
            .unwrap_or_default()
    }

    /// Insert a column, keeping columns ordered by position.
    pub(crate) fn insert_column(&mut self, column: Column) {
        let idx = self
            .columns
            .partition_point(|c| c.position <= column.position);
        self.columns.insert(idx, column);
    }
}
