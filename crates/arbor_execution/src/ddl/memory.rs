use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arbor_catalog::definition::{NewIndex, TableDefinition, ViewDefinition};
use arbor_catalog::model::index::Index;
use arbor_catalog::{Catalog, CatalogError, TableName, ddl_text, merge, mutate};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{SchemaManager, TableDefinitionParser};
use crate::errors::Result;

/// Schema manager holding the catalog in memory.
///
/// Changes are serialized by a writer lock. Each change computes a new frozen
/// catalog from the current one and swaps it in.
#[derive(Debug)]
pub struct MemorySchemaManager {
    catalog: RwLock<Arc<Catalog>>,
    writer: Mutex<()>,
    generation: AtomicU64,
    parser: Option<Box<dyn TableDefinitionParser>>,
}

impl Default for MemorySchemaManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySchemaManager {
    pub fn new() -> Self {
        Self::with_catalog(Catalog::new())
    }

    pub fn with_catalog(mut catalog: Catalog) -> Self {
        catalog.freeze();
        MemorySchemaManager {
            catalog: RwLock::new(Arc::new(catalog)),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
            parser: None,
        }
    }

    pub fn with_parser(mut self, parser: impl TableDefinitionParser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Apply a change to the current catalog and publish the result.
    fn update<T>(&self, f: impl FnOnce(&Catalog) -> Result<(Catalog, T)>) -> Result<T> {
        let _guard = self.writer.lock();
        let current = self.catalog.read().clone();
        let (next, out) = f(&current)?;
        *self.catalog.write() = Arc::new(next);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(generation, "published catalog");
        Ok(out)
    }
}

impl SchemaManager for MemorySchemaManager {
    fn create_table_definition(&self, table: &TableDefinition) -> Result<TableName> {
        self.update(|current| {
            let next = merge::merge_table(current, table)?;
            Ok((next, table.name.clone()))
        })
    }

    fn create_table_definition_from_ddl(&self, default_schema: &str, ddl: &str) -> Result<TableName> {
        let parser = self.parser.as_ref().ok_or_else(|| {
            CatalogError::Parse("no DDL parser configured".to_string())
        })?;
        let table = parser.parse(default_schema, ddl)?;
        self.create_table_definition(&table)
    }

    fn create_view_definition(&self, view: &ViewDefinition) -> Result<TableName> {
        self.update(|current| {
            let next = merge::merge_view(current, view)?;
            Ok((next, view.name.clone()))
        })
    }

    fn rename_table(&self, current: &TableName, new_name: &TableName) -> Result<()> {
        self.update(|catalog| Ok((mutate::rename_table(catalog, current, new_name)?, ())))
    }

    fn delete_table_definition(&self, name: &TableName) -> Result<()> {
        self.update(|catalog| Ok((mutate::drop_table(catalog, name)?, ())))
    }

    fn create_indexes(&self, indexes: &[NewIndex]) -> Result<Vec<Index>> {
        self.update(|catalog| Ok(mutate::add_indexes(catalog, indexes)?))
    }

    fn drop_indexes(&self, indexes: &[Index]) -> Result<()> {
        self.update(|catalog| Ok((mutate::drop_indexes(catalog, indexes)?, ())))
    }

    fn get_catalog(&self) -> Arc<Catalog> {
        self.catalog.read().clone()
    }

    fn schema_strings(&self) -> Vec<String> {
        ddl_text::schema_strings(&self.get_catalog())
    }

    fn force_new_timestamp(&self) {
        let _guard = self.writer.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn schema_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use arbor_catalog::definition::ColumnDefinition;
    use arbor_types::DataType;

    use super::*;
    use crate::errors::ExecutionError;

    #[derive(Debug)]
    struct SingleColumnParser;

    impl TableDefinitionParser for SingleColumnParser {
        fn parse(&self, default_schema: &str, ddl: &str) -> arbor_catalog::Result<TableDefinition> {
            let name = ddl
                .strip_prefix("CREATE TABLE ")
                .ok_or_else(|| CatalogError::Parse(ddl.to_string()))?;
            Ok(TableDefinition::new(TableName::new(default_schema, name))
                .with_column(ColumnDefinition::new("id", DataType::Int64, false))
                .with_primary_key(["id"]))
        }
    }

    #[test]
    fn readers_keep_old_catalog() {
        let manager = MemorySchemaManager::new();
        let before = manager.get_catalog();

        manager
            .create_table_definition(
                &TableDefinition::new(TableName::new("test", "t"))
                    .with_column(ColumnDefinition::new("id", DataType::Int32, false)),
            )
            .unwrap();

        assert_eq!(0, before.user_tables().count());
        assert_eq!(1, manager.get_catalog().user_tables().count());
        assert!(manager.get_catalog().is_frozen());
        assert_eq!(1, manager.schema_generation());
    }

    #[test]
    fn failed_change_keeps_generation() {
        let manager = MemorySchemaManager::new();
        let child = TableDefinition::new(TableName::new("test", "child"))
            .with_column(ColumnDefinition::new("pid", DataType::Int32, true))
            .with_parent_join(TableName::new("test", "ghost"), [("id", "pid")]);
        let err = manager.create_table_definition(&child).unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Catalog(CatalogError::JoinToUnknownTable { .. })
        ));
        assert_eq!(0, manager.schema_generation());

        manager.force_new_timestamp();
        assert_eq!(1, manager.schema_generation());
    }

    #[test]
    fn ddl_text_needs_parser() {
        let manager = MemorySchemaManager::new();
        let err = manager
            .create_table_definition_from_ddl("test", "CREATE TABLE t")
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Catalog(CatalogError::Parse(_))));

        let manager = MemorySchemaManager::new().with_parser(SingleColumnParser);
        let name = manager
            .create_table_definition_from_ddl("test", "CREATE TABLE t")
            .unwrap();
        assert_eq!(TableName::new("test", "t"), name);
        assert_eq!(
            vec![
                "CREATE SCHEMA IF NOT EXISTS `test`".to_string(),
                "CREATE TABLE `test`.`t`(`id` BIGINT NOT NULL, PRIMARY KEY(`id`)) engine=arbor"
                    .to_string(),
            ],
            manager.schema_strings()
        );
    }
}
