use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::column::Column;
use crate::name::TableName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub name: TableName,
    pub definition: String,
    pub definition_properties: BTreeMap<String, String>,
    /// Columns of other tables this view reads.
    pub table_column_references: BTreeMap<TableName, BTreeSet<String>>,
    pub columns: Vec<Column>,
}

impl View {
    pub fn references_table(&self, table: &TableName) -> bool {
        self.table_column_references.contains_key(table)
    }
}
