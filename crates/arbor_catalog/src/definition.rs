//! Definitions of tables, indexes and views to be merged into a catalog.
//!
//! A definition carries no ids, group or tree names. Those are assigned
//! during merge.

use std::collections::{BTreeMap, BTreeSet};

use arbor_types::DataType;
use serde::{Deserialize, Serialize};

use crate::errors::{CatalogError, Result};
use crate::model::column::CharsetAndCollation;
use crate::model::index::IndexConstraint;
use crate::model::join::JoinColumn;
use crate::model::table::DEFAULT_ENGINE;
use crate::name::TableName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDefinition {
    pub start: i64,
    pub increment: i64,
    pub min: i64,
    pub max: i64,
    pub cycle: bool,
    pub default_identity: bool,
}

impl Default for IdentityDefinition {
    fn default() -> Self {
        IdentityDefinition {
            start: 1,
            increment: 1,
            min: 1,
            max: i64::MAX,
            cycle: false,
            default_identity: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub position: usize,
    pub datatype: DataType,
    pub type_param1: Option<u64>,
    pub type_param2: Option<u64>,
    pub nullable: bool,
    pub charset: Option<CharsetAndCollation>,
    pub initial_auto_increment: Option<i64>,
    pub identity: Option<IdentityDefinition>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, datatype: DataType, nullable: bool) -> Self {
        ColumnDefinition {
            name: name.into(),
            position: 0,
            datatype,
            type_param1: None,
            type_param2: None,
            nullable,
            charset: None,
            initial_auto_increment: None,
            identity: None,
        }
    }

    /// Create a column from a SQL type name such as `VARCHAR` or `INT`.
    pub fn from_type_name(
        table: &TableName,
        name: impl Into<String>,
        type_name: &str,
        nullable: bool,
    ) -> Result<Self> {
        let name = name.into();
        let datatype =
            DataType::from_type_name(type_name).ok_or_else(|| CatalogError::UnsupportedDataType {
                table: table.clone(),
                column: name.clone(),
                type_name: type_name.to_string(),
            })?;
        Ok(Self::new(name, datatype, nullable))
    }

    pub fn with_max_length(mut self, len: u64) -> Self {
        self.type_param1 = Some(len);
        self
    }

    pub fn with_charset(mut self, charset: CharsetAndCollation) -> Self {
        self.charset = Some(charset);
        self
    }

    pub fn with_identity(mut self, identity: IdentityDefinition) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_auto_increment(mut self, initial: i64) -> Self {
        self.initial_auto_increment = Some(initial);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumnDefinition {
    /// Table owning the column. None means the indexed table itself, which
    /// is the only option for table indexes.
    pub table: Option<TableName>,
    pub column: String,
    pub ascending: bool,
    pub indexed_length: Option<u64>,
}

impl IndexColumnDefinition {
    pub fn new(column: impl Into<String>) -> Self {
        IndexColumnDefinition {
            table: None,
            column: column.into(),
            ascending: true,
            indexed_length: None,
        }
    }

    pub fn on_table(mut self, table: TableName) -> Self {
        self.table = Some(table);
        self
    }
}

/// Index to create on a table or on a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub unique: bool,
    pub constraint: IndexConstraint,
    /// Ordered by key position.
    pub columns: Vec<IndexColumnDefinition>,
}

impl IndexDefinition {
    pub fn new(
        name: impl Into<String>,
        constraint: IndexConstraint,
        columns: impl IntoIterator<Item = IndexColumnDefinition>,
    ) -> Self {
        IndexDefinition {
            name: name.into(),
            unique: matches!(constraint, IndexConstraint::Primary | IndexConstraint::Unique),
            constraint,
            columns: columns.into_iter().collect(),
        }
    }
}

/// Where new indexes should be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexTargetDefinition {
    Table(TableName),
    Group(String),
}

/// An index definition along with where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIndex {
    pub target: IndexTargetDefinition,
    pub definition: IndexDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDefinition {
    pub parent: TableName,
    pub columns: Vec<JoinColumn>,
}

impl JoinDefinition {
    pub fn new(parent: TableName, columns: impl IntoIterator<Item = JoinColumn>) -> Self {
        JoinDefinition {
            parent,
            columns: columns.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: TableName,
    pub engine: String,
    pub charset: Option<CharsetAndCollation>,
    pub columns: Vec<ColumnDefinition>,
    pub indexes: Vec<IndexDefinition>,
    /// All declared parent joins. At most one is allowed by validation.
    pub parent_joins: Vec<JoinDefinition>,
}

impl TableDefinition {
    pub fn new(name: TableName) -> Self {
        TableDefinition {
            name,
            engine: DEFAULT_ENGINE.to_string(),
            charset: None,
            columns: Vec::new(),
            indexes: Vec::new(),
            parent_joins: Vec::new(),
        }
    }

    /// Append a column at the next position.
    pub fn with_column(mut self, mut column: ColumnDefinition) -> Self {
        column.position = self.columns.len();
        self.columns.push(column);
        self
    }

    /// Declare a primary key. Key columns become NOT NULL.
    pub fn with_primary_key<S: AsRef<str>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        let mut index_columns = Vec::new();
        for name in columns {
            let name = name.as_ref();
            if let Some(col) = self.columns.iter_mut().find(|c| c.name == name) {
                col.nullable = false;
            }
            index_columns.push(IndexColumnDefinition::new(name));
        }
        self.indexes.push(IndexDefinition::new(
            "PRIMARY",
            IndexConstraint::Primary,
            index_columns,
        ));
        self
    }

    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// Declare a grouping join to `parent` on (parent column, child column)
    /// pairs.
    pub fn with_parent_join<P: Into<String>, C: Into<String>>(
        mut self,
        parent: TableName,
        columns: impl IntoIterator<Item = (P, C)>,
    ) -> Self {
        self.parent_joins.push(JoinDefinition::new(
            parent,
            columns.into_iter().map(|(p, c)| JoinColumn::new(p, c)),
        ));
        self
    }

    pub fn parent_join(&self) -> Option<&JoinDefinition> {
        self.parent_joins.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub name: TableName,
    pub definition: String,
    pub definition_properties: BTreeMap<String, String>,
    pub table_column_references: BTreeMap<TableName, BTreeSet<String>>,
    pub columns: Vec<ColumnDefinition>,
}

impl ViewDefinition {
    pub fn new(name: TableName, definition: impl Into<String>) -> Self {
        ViewDefinition {
            name,
            definition: definition.into(),
            definition_properties: BTreeMap::new(),
            table_column_references: BTreeMap::new(),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, mut column: ColumnDefinition) -> Self {
        column.position = self.columns.len();
        self.columns.push(column);
        self
    }

    pub fn with_reference<S: Into<String>>(
        mut self,
        table: TableName,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.table_column_references
            .entry(table)
            .or_default()
            .extend(columns.into_iter().map(Into::into));
        self
    }
}
