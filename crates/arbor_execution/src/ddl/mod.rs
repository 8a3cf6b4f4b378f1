//! DDL orchestration over a schema manager and a store.

pub mod functions;
pub mod memory;

use std::fmt::Debug;
use std::sync::Arc;

use arbor_catalog::definition::{NewIndex, TableDefinition, ViewDefinition};
use arbor_catalog::model::index::Index;
use arbor_catalog::{Catalog, TableName};

use crate::errors::Result;

pub use functions::{DdlFunctions, Table};
pub use memory::MemorySchemaManager;

/// Turns DDL text into a table definition.
pub trait TableDefinitionParser: Debug + Send + Sync {
    fn parse(&self, default_schema: &str, ddl: &str) -> arbor_catalog::Result<TableDefinition>;
}

/// Owner of the current catalog. Each change produces and publishes a new
/// frozen catalog. Readers keep whatever catalog they already hold.
pub trait SchemaManager: Debug + Send + Sync {
    fn create_table_definition(&self, table: &TableDefinition) -> Result<TableName>;

    fn create_table_definition_from_ddl(&self, default_schema: &str, ddl: &str) -> Result<TableName>;

    fn create_view_definition(&self, view: &ViewDefinition) -> Result<TableName>;

    fn rename_table(&self, current: &TableName, new_name: &TableName) -> Result<()>;

    /// Delete a user table, a view, or a group through its group table name.
    fn delete_table_definition(&self, name: &TableName) -> Result<()>;

    /// Returns the indexes as created, with ids and tree names assigned.
    fn create_indexes(&self, indexes: &[NewIndex]) -> Result<Vec<Index>>;

    fn drop_indexes(&self, indexes: &[Index]) -> Result<()>;

    fn get_catalog(&self) -> Arc<Catalog>;

    fn schema_strings(&self) -> Vec<String>;

    /// Bump the generation without changing the catalog.
    fn force_new_timestamp(&self);

    /// Incremented on every catalog change.
    fn schema_generation(&self) -> u64;
}
