use std::fmt;
use std::sync::Arc;

use arbor_catalog::model::table::UserTable;
use arbor_catalog::{TableId, TableName};
use arbor_types::ScalarValue;

use crate::hkey::HKey;

/// Row type of a user table's rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRowType {
    pub table: TableId,
    pub name: TableName,
}

impl TableRowType {
    pub fn new(table: TableId, name: TableName) -> Self {
        TableRowType { table, name }
    }

    pub fn for_table(table: &UserTable) -> Self {
        TableRowType::new(table.id, table.name.clone())
    }
}

impl fmt::Display for TableRowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowType {
    Table(TableRowType),
    /// Rows of an index on a table.
    Index { index: String, table: TableRowType },
    /// Rows carrying only the hkey of a table row.
    HKey(TableRowType),
}

impl RowType {
    /// The user table whose hkey rows of this type carry.
    pub fn table_type(&self) -> &TableRowType {
        match self {
            Self::Table(t) => t,
            Self::Index { table, .. } => table,
            Self::HKey(t) => t,
        }
    }

    pub fn table_id(&self) -> TableId {
        self.table_type().table
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table(_))
    }
}

impl From<TableRowType> for RowType {
    fn from(value: TableRowType) -> Self {
        RowType::Table(value)
    }
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(t) => write!(f, "{t}"),
            Self::Index { index, table } => write!(f, "Index({table}.{index})"),
            Self::HKey(t) => write!(f, "HKey({t})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    row_type: RowType,
    values: Vec<ScalarValue>,
    hkey: HKey,
}

/// Rows are shared between cursors, bindings and the store.
pub type RowRef = Arc<Row>;

impl Row {
    pub fn new(row_type: RowType, values: impl IntoIterator<Item = ScalarValue>, hkey: HKey) -> Self {
        Row {
            row_type,
            values: values.into_iter().collect(),
            hkey,
        }
    }

    pub fn row_type(&self) -> &RowType {
        &self.row_type
    }

    pub fn values(&self) -> &[ScalarValue] {
        &self.values
    }

    pub fn value(&self, idx: usize) -> Option<&ScalarValue> {
        self.values.get(idx)
    }

    pub fn hkey(&self) -> &HKey {
        &self.hkey
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.row_type)?;
        for (idx, v) in self.values.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "] {}", self.hkey)
    }
}
