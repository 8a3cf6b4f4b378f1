use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::index::Index;
use crate::TableId;
use crate::name::TableName;

/// A tree of user tables stored together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub root: Option<TableId>,
    pub group_table: TableId,
    pub tree_name: String,
    pub indexes: IndexMap<String, Index>,
}

/// Synthetic table describing a group's storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTable {
    pub id: TableId,
    pub name: TableName,
    pub group: String,
}
