use std::fmt;

use crate::name::TableName;
use crate::{IndexId, TableId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Table {child} has join to unknown parent table {parent}")]
    JoinToUnknownTable { child: TableName, parent: TableName },

    #[error(
        "Table {child} join reference part {child_column} does not match {parent} primary key part {parent_column}"
    )]
    JoinToWrongColumns {
        child: TableName,
        child_column: String,
        parent: TableName,
        parent_column: String,
    },

    #[error("Table {0} has multiple parent joins")]
    JoinToMultipleParents(TableName),

    #[error("Table {0} already exists")]
    DuplicateTableName(TableName),

    #[error("Duplicate column name {column} in table {table}")]
    DuplicateColumnName { table: TableName, column: String },

    #[error("Duplicate index name {index} on {target}")]
    DuplicateKey { target: String, index: String },

    #[error("Table {0} does not exist")]
    NoSuchTable(TableName),

    #[error("Table with id {0} does not exist")]
    NoSuchTableId(TableId),

    #[error("Index {0} does not exist")]
    NoSuchIndex(String),

    #[error("Group {0} does not exist")]
    NoSuchGroup(String),

    #[error("Column {column} does not exist in table {table}")]
    NoSuchColumn { table: TableName, column: String },

    #[error("Cannot drop non-leaf table {0}")]
    UnsupportedDrop(TableName),

    #[error("Cannot drop index {index} on table {table}")]
    DropIndexNotAllowed { index: String, table: TableName },

    #[error("Cannot run DDL against protected table {0}")]
    ProtectedTableDDL(TableName),

    #[error("Cannot drop {parent}, referenced by {child} in another schema")]
    ForeignConstraintDDL { parent: TableName, child: TableName },

    #[error("Unsupported data type {type_name} for column {column} in table {table}")]
    UnsupportedDataType {
        table: TableName,
        column: String,
        type_name: String,
    },

    #[error("Unsupported charset {charset} on {target}")]
    UnsupportedCharset { target: String, charset: String },

    #[error("Column {column} of type {type_name} cannot be part of index {index}")]
    UnsupportedIndexDataType {
        index: String,
        column: String,
        type_name: String,
    },

    #[error("Index {index} key size {size} exceeds maximum of {max}")]
    UnsupportedIndexSize { index: String, size: u64, max: u64 },

    #[error("Tables {first} and {second} share table id {id}")]
    DuplicateTableId {
        id: TableId,
        first: TableName,
        second: TableName,
    },

    #[error("Table {table} has id {id} outside of its schema's id range")]
    TableIdOutOfRange { table: TableName, id: TableId },

    #[error("Indexes {first} and {second} in group {group} share index id {id}")]
    DuplicateIndexId {
        group: String,
        id: IndexId,
        first: String,
        second: String,
    },

    #[error("Tree name {0} is used more than once")]
    DuplicateTreeName(String),

    #[error("Sequence name {0} is used more than once")]
    DuplicateSequenceName(String),

    #[error("Column {column} of {table} has position {position}, expected {expected}")]
    ColumnPositionGap {
        table: TableName,
        column: String,
        position: usize,
        expected: usize,
    },

    #[error("Primary key column {column} of table {table} is nullable")]
    PrimaryKeyNullable { table: TableName, column: String },

    #[error("Table {0} has more than one primary key")]
    MultiplePrimaryKeys(TableName),

    #[error("Primary key of table {0} is not unique")]
    PrimaryKeyNotUnique(TableName),

    #[error("Table {0} is part of a join cycle")]
    GroupCycle(TableName),

    #[error("Invalid group structure at table {table}: {reason}")]
    InvalidGroupStructure { table: TableName, reason: String },

    #[error(
        "Join {join} compares {parent_column} of type {parent_type} with {child_column} of type {child_type}"
    )]
    JoinTypeMismatch {
        join: String,
        parent_column: String,
        parent_type: String,
        child_column: String,
        child_type: String,
    },

    #[error("Join {0} does not reference the primary key of its parent")]
    JoinToNonPrimaryKey(String),

    #[error("Group {0} mixes information schema and user tables")]
    ReservedSchemaViolation(String),

    #[error("Name {name} has length {length}, max is {max}")]
    InvalidNameLength {
        name: String,
        length: usize,
        max: usize,
    },

    #[error("{0}")]
    Validation(ValidationFailures),

    #[error("Cannot modify a frozen catalog")]
    Frozen,

    #[error("Failed to parse DDL: {0}")]
    Parse(String),

    #[error("internal: {0}")]
    Internal(String),
}

/// All violations found by a validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailures(pub Vec<CatalogError>);

impl ValidationFailures {
    pub fn failures(&self) -> &[CatalogError] {
        &self.0
    }
}

impl fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Catalog validation failed with {} error(s)", self.0.len())?;
        for failure in &self.0 {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

macro_rules! internal {
    ($($arg:tt)*) => {
        crate::errors::CatalogError::Internal(std::format!($($arg)*))
    };
}
pub(crate) use internal;
