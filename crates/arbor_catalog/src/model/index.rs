use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{IndexId, TableId};

/// Largest total key size an index may have, in bytes.
pub const MAX_INDEX_KEY_SIZE: u64 = 3072;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexConstraint {
    Primary,
    Unique,
    Key,
    ForeignKey,
}

impl IndexConstraint {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "PRIMARY",
            Self::Unique => "UNIQUE",
            Self::Key => "KEY",
            Self::ForeignKey => "FOREIGN_KEY_CONSTRAINT",
        }
    }
}

impl fmt::Display for IndexConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an index is declared on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexTarget {
    Table(TableId),
    Group(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Table owning the column. Differs from the index's table only for group
    /// indexes.
    pub table: TableId,
    pub column: String,
    /// Position of the column in its table.
    pub column_position: usize,
    /// Position of this column in the index key.
    pub position: usize,
    pub ascending: bool,
    /// Prefix length for string columns.
    pub indexed_length: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub target: IndexTarget,
    pub id: IndexId,
    pub unique: bool,
    pub constraint: IndexConstraint,
    pub tree_name: String,
    columns: Vec<IndexColumn>,
}

impl Index {
    pub fn new(
        name: impl Into<String>,
        target: IndexTarget,
        id: IndexId,
        unique: bool,
        constraint: IndexConstraint,
        tree_name: impl Into<String>,
    ) -> Self {
        Index {
            name: name.into(),
            target,
            id,
            // PRIMARY implies UNIQUE.
            unique: unique || constraint == IndexConstraint::Primary,
            constraint,
            tree_name: tree_name.into(),
            columns: Vec::new(),
        }
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraint == IndexConstraint::Primary
    }

    pub fn is_group_index(&self) -> bool {
        matches!(self.target, IndexTarget::Group(_))
    }

    /// Key columns, ordered by position.
    pub fn columns(&self) -> &[IndexColumn] {
        &self.columns
    }

    /// Insert a column keeping the columns ordered by key position.
    pub fn add_column(&mut self, column: IndexColumn) {
        let idx = self
            .columns
            .partition_point(|c| c.position <= column.position);
        self.columns.insert(idx, column);
    }

    /// Id of the deepest table with a column in this index.
    ///
    /// Tables are compared using the depth function provided by the caller.
    pub fn leaf_most_table(&self, depth: impl Fn(TableId) -> u32) -> Option<TableId> {
        match &self.target {
            IndexTarget::Table(id) => Some(*id),
            IndexTarget::Group(_) => self
                .columns
                .iter()
                .map(|c| c.table)
                .max_by_key(|t| depth(*t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, position: usize) -> IndexColumn {
        IndexColumn {
            table: 1,
            column: name.to_string(),
            column_position: 0,
            position,
            ascending: true,
            indexed_length: None,
        }
    }

    #[test]
    fn columns_kept_sorted() {
        let mut index = Index::new(
            "idx",
            IndexTarget::Table(1),
            1,
            false,
            IndexConstraint::Key,
            "test.t.idx",
        );
        index.add_column(col("c", 2));
        index.add_column(col("a", 0));
        index.add_column(col("b", 1));

        let names: Vec<_> = index.columns().iter().map(|c| c.column.as_str()).collect();
        assert_eq!(vec!["a", "b", "c"], names);
    }

    #[test]
    fn primary_is_unique() {
        let index = Index::new(
            "PRIMARY",
            IndexTarget::Table(1),
            1,
            false,
            IndexConstraint::Primary,
            "test.t.PRIMARY",
        );
        assert!(index.unique);
        assert!(index.is_primary_key());
    }
}
