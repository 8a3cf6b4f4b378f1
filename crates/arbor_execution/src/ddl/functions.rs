use std::collections::BTreeSet;
use std::sync::Arc;

use arbor_catalog::definition::{IndexTargetDefinition, NewIndex, TableDefinition};
use arbor_catalog::model::group::GroupTable;
use arbor_catalog::model::index::{Index, IndexTarget};
use arbor_catalog::model::table::UserTable;
use arbor_catalog::{Catalog, CatalogError, TableId, TableName};
use tracing::{error, trace};

use super::SchemaManager;
use crate::errors::{Result, internal};
use crate::session::Session;
use crate::store::Store;

/// A user table or a group table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Table {
    User(UserTable),
    Group(GroupTable),
}

impl Table {
    pub fn id(&self) -> TableId {
        match self {
            Self::User(t) => t.id,
            Self::Group(t) => t.id,
        }
    }

    pub fn name(&self) -> &TableName {
        match self {
            Self::User(t) => &t.name,
            Self::Group(t) => &t.name,
        }
    }
}

fn check_not_protected(name: &TableName) -> Result<()> {
    if name.in_information_schema() {
        return Err(CatalogError::ProtectedTableDDL(name.clone()).into());
    }
    Ok(())
}

/// DDL entry points. Catalog changes go through the schema manager, data
/// changes through the store.
#[derive(Debug)]
pub struct DdlFunctions<S: SchemaManager, T: Store> {
    schema: Arc<S>,
    store: Arc<T>,
}

impl<S: SchemaManager, T: Store> DdlFunctions<S, T> {
    pub fn new(schema: Arc<S>, store: Arc<T>) -> Self {
        DdlFunctions { schema, store }
    }

    pub fn schema_manager(&self) -> &Arc<S> {
        &self.schema
    }

    pub fn store(&self) -> &Arc<T> {
        &self.store
    }

    pub fn create_table(&self, session: &Session, table: &TableDefinition) -> Result<TableName> {
        trace!(table = %table.name, "creating table");
        check_not_protected(&table.name)?;
        let name = self.schema.create_table_definition(table)?;
        self.mark_modified_by_name(session, &name);
        Ok(name)
    }

    pub fn create_table_from_ddl(
        &self,
        session: &Session,
        default_schema: &str,
        ddl: &str,
    ) -> Result<TableName> {
        trace!(schema = %default_schema, "creating table from ddl");
        if arbor_catalog::name::is_information_schema(default_schema) {
            return Err(CatalogError::ProtectedTableDDL(TableName::new(default_schema, "")).into());
        }
        let name = self.schema.create_table_definition_from_ddl(default_schema, ddl)?;
        self.mark_modified_by_name(session, &name);
        Ok(name)
    }

    pub fn rename_table(&self, session: &Session, current: &TableName, new_name: &TableName) -> Result<()> {
        trace!(current = %current, new_name = %new_name, "renaming table");
        check_not_protected(current)?;
        check_not_protected(new_name)?;
        self.schema.rename_table(current, new_name)?;
        self.mark_modified_by_name(session, new_name);
        Ok(())
    }

    /// Drop a leaf table. Dropping a missing table does nothing.
    pub fn drop_table(&self, session: &Session, name: &TableName) -> Result<()> {
        trace!(table = %name, "dropping table");
        check_not_protected(name)?;
        let catalog = self.schema.get_catalog();

        if catalog.view(name).is_some() {
            return self.schema.delete_table_definition(name);
        }
        if catalog.group_table(name).is_some() {
            return Err(CatalogError::UnsupportedDrop(name.clone()).into());
        }
        let Some(table) = catalog.user_table(name) else {
            return Ok(());
        };
        if !catalog.child_tables(table.id).is_empty() {
            return Err(CatalogError::UnsupportedDrop(name.clone()).into());
        }

        let group = table_group(&catalog, table)?;
        if table.is_root() {
            self.store.remove_trees(&catalog, group, table)?;
        } else {
            self.store.truncate_table(&catalog, group, table.id)?;
            let mut indexes: Vec<Index> = table.indexes.values().cloned().collect();
            indexes.extend(
                group
                    .indexes
                    .values()
                    .filter(|idx| idx.columns().iter().any(|c| c.table == table.id))
                    .cloned(),
            );
            self.store.delete_indexes(&indexes)?;
        }
        self.schema.delete_table_definition(name)?;
        session.scans().mark_ddl_modified(table.id, group.group_table);
        Ok(())
    }

    /// Drop every table and view in a schema.
    ///
    /// Groups entirely inside the schema are dropped whole. Tables of groups
    /// rooted in another schema are dropped one at a time, children first.
    pub fn drop_schema(&self, session: &Session, schema: &str) -> Result<()> {
        trace!(schema = %schema, "dropping schema");
        let catalog = self.schema.get_catalog();

        let mut groups_to_drop = BTreeSet::new();
        let mut mixed_groups = BTreeSet::new();
        let mut schema_tables = Vec::new();

        for table in catalog.user_tables() {
            if table.name.schema() != schema {
                continue;
            }
            check_not_protected(&table.name)?;
            for child in catalog.child_tables(table.id) {
                if child.name.schema() != schema {
                    return Err(CatalogError::ForeignConstraintDDL {
                        parent: table.name.clone(),
                        child: child.name.clone(),
                    }
                    .into());
                }
            }
            let group = table_group(&catalog, table)?;
            groups_to_drop.insert(group.name.clone());
            if catalog
                .parent_table(table)
                .is_some_and(|p| p.name.schema() != schema)
            {
                mixed_groups.insert(group.name.clone());
            }
            schema_tables.push(table);
        }

        let mut tables_to_drop: Vec<_> = schema_tables
            .into_iter()
            .filter(|t| t.group.as_ref().is_some_and(|g| mixed_groups.contains(g)))
            .collect();
        // Children have higher ids than their parents.
        tables_to_drop.sort_by(|a, b| b.id.cmp(&a.id));

        for table in tables_to_drop {
            self.drop_table(session, &table.name)?;
        }
        for group in groups_to_drop.difference(&mixed_groups) {
            self.drop_group(session, group)?;
        }
        for view in catalog.views().filter(|v| v.name.schema() == schema) {
            self.schema.delete_table_definition(&view.name)?;
        }
        Ok(())
    }

    /// Drop a group and all of its tables. Dropping a missing group does
    /// nothing.
    pub fn drop_group(&self, session: &Session, group: &str) -> Result<()> {
        trace!(group = %group, "dropping group");
        let catalog = self.schema.get_catalog();
        let Some(group) = catalog.group(group) else {
            return Ok(());
        };
        let group_table = catalog
            .group_table_by_id(group.group_table)
            .ok_or_else(|| internal!("group {} has no group table", group.name))?;
        check_not_protected(&group_table.name)?;

        self.store.truncate_group(&catalog, group)?;
        let indexes: Vec<Index> = catalog
            .group_members(&group.name)
            .flat_map(|t| t.indexes.values().cloned())
            .chain(group.indexes.values().cloned())
            .collect();
        self.store.delete_indexes(&indexes)?;
        self.schema.delete_table_definition(&group_table.name)?;
        session
            .scans()
            .mark_ddl_modified(group_table.id, group_table.id);
        Ok(())
    }

    pub fn get_catalog(&self) -> Arc<Catalog> {
        self.schema.get_catalog()
    }

    pub fn get_table_id(&self, name: &TableName) -> Result<TableId> {
        let catalog = self.schema.get_catalog();
        catalog
            .user_table(name)
            .map(|t| t.id)
            .or_else(|| catalog.group_table(name).map(|t| t.id))
            .ok_or_else(|| CatalogError::NoSuchTable(name.clone()).into())
    }

    pub fn get_table_by_id(&self, id: TableId) -> Result<Table> {
        let catalog = self.schema.get_catalog();
        if let Some(table) = catalog.user_table_by_id(id) {
            return Ok(Table::User(table.clone()));
        }
        if let Some(table) = catalog.group_table_by_id(id) {
            return Ok(Table::Group(table.clone()));
        }
        Err(CatalogError::NoSuchTableId(id).into())
    }

    pub fn get_table(&self, name: &TableName) -> Result<Table> {
        let catalog = self.schema.get_catalog();
        if let Some(table) = catalog.user_table(name) {
            return Ok(Table::User(table.clone()));
        }
        if let Some(table) = catalog.group_table(name) {
            return Ok(Table::Group(table.clone()));
        }
        Err(CatalogError::NoSuchTable(name.clone()).into())
    }

    pub fn get_user_table(&self, name: &TableName) -> Result<UserTable> {
        self.schema
            .get_catalog()
            .user_table(name)
            .cloned()
            .ok_or_else(|| CatalogError::NoSuchTable(name.clone()).into())
    }

    pub fn get_table_name(&self, id: TableId) -> Result<TableName> {
        self.schema
            .get_catalog()
            .table_name_by_id(id)
            .cloned()
            .ok_or_else(|| CatalogError::NoSuchTableId(id).into())
    }

    pub fn get_ddls(&self) -> Vec<String> {
        self.schema.schema_strings()
    }

    pub fn get_generation(&self) -> u64 {
        self.schema.schema_generation()
    }

    pub fn force_generation_update(&self) {
        self.schema.force_new_timestamp();
    }

    /// Create indexes and build them in the store. If building fails the
    /// indexes are removed again before the error is returned.
    pub fn create_indexes(&self, session: &Session, indexes: &[NewIndex]) -> Result<Vec<Index>> {
        trace!(count = indexes.len(), "creating indexes");
        if indexes.is_empty() {
            return Ok(Vec::new());
        }
        for index in indexes {
            if let IndexTargetDefinition::Table(name) = &index.target {
                check_not_protected(name)?;
            }
        }

        let created = self.schema.create_indexes(indexes)?;
        let catalog = self.schema.get_catalog();
        for index in &created {
            mark_modified_by_index(session, &catalog, index);
        }

        if let Err(e) = self.store.build_indexes(&catalog, &created, false) {
            let rollback = self
                .store
                .delete_indexes(&created)
                .and_then(|_| self.schema.drop_indexes(&created));
            if let Err(rollback_err) = rollback {
                error!(%rollback_err, "failed to roll back index creation");
            }
            return Err(e);
        }
        Ok(created)
    }

    pub fn drop_table_indexes(&self, session: &Session, table: &TableName, names: &[&str]) -> Result<()> {
        trace!(table = %table, ?names, "dropping table indexes");
        if names.is_empty() {
            return Ok(());
        }
        check_not_protected(table)?;
        let catalog = self.schema.get_catalog();
        let user_table = catalog
            .user_table(table)
            .ok_or_else(|| CatalogError::NoSuchTable(table.clone()))?;

        let mut indexes = Vec::with_capacity(names.len());
        for name in names {
            let index = user_table
                .indexes
                .get(*name)
                .ok_or_else(|| CatalogError::NoSuchIndex(name.to_string()))?;
            if index.is_primary_key() {
                return Err(CatalogError::DropIndexNotAllowed {
                    index: "PRIMARY".to_string(),
                    table: table.clone(),
                }
                .into());
            }
            indexes.push(index.clone());
        }

        self.store.delete_indexes(&indexes)?;
        self.schema.drop_indexes(&indexes)?;
        let group = table_group(&catalog, user_table)?;
        session
            .scans()
            .mark_ddl_modified(user_table.id, group.group_table);
        Ok(())
    }

    pub fn drop_group_indexes(&self, _session: &Session, group: &str, names: &[&str]) -> Result<()> {
        trace!(group = %group, ?names, "dropping group indexes");
        if names.is_empty() {
            return Ok(());
        }
        let catalog = self.schema.get_catalog();
        let group_ent = catalog
            .group(group)
            .ok_or_else(|| CatalogError::NoSuchGroup(group.to_string()))?;

        let mut indexes = Vec::with_capacity(names.len());
        for name in names {
            let index = group_ent
                .indexes
                .get(*name)
                .ok_or_else(|| CatalogError::NoSuchIndex(name.to_string()))?;
            indexes.push(index.clone());
        }

        self.store.delete_indexes(&indexes)?;
        self.schema.drop_indexes(&indexes)?;
        Ok(())
    }

    fn mark_modified_by_name(&self, session: &Session, name: &TableName) {
        let catalog = self.schema.get_catalog();
        if let Some(table) = catalog.user_table(name) {
            let group_table = table
                .group
                .as_deref()
                .and_then(|g| catalog.group(g))
                .map(|g| g.group_table)
                .unwrap_or(table.id);
            session.scans().mark_ddl_modified(table.id, group_table);
        }
    }
}

fn table_group<'a>(
    catalog: &'a Catalog,
    table: &UserTable,
) -> Result<&'a arbor_catalog::model::group::Group> {
    table
        .group
        .as_deref()
        .and_then(|g| catalog.group(g))
        .ok_or_else(|| internal!("table {} has no group", table.name))
}

fn mark_modified_by_index(session: &Session, catalog: &Catalog, index: &Index) {
    let depth = |id: TableId| {
        catalog
            .user_table_by_id(id)
            .and_then(|t| t.depth)
            .unwrap_or(0)
    };
    let Some(table) = index
        .leaf_most_table(depth)
        .and_then(|id| catalog.user_table_by_id(id))
    else {
        return;
    };
    let group_table = match &index.target {
        IndexTarget::Group(g) => catalog.group(g).map(|g| g.group_table),
        IndexTarget::Table(_) => table
            .group
            .as_deref()
            .and_then(|g| catalog.group(g))
            .map(|g| g.group_table),
    }
    .unwrap_or(table.id);
    session.scans().mark_ddl_modified(table.id, group_table);
}

#[cfg(test)]
mod tests {
    use arbor_catalog::definition::{ColumnDefinition, IndexColumnDefinition, IndexDefinition};
    use arbor_catalog::model::index::IndexConstraint;
    use arbor_types::{DataType, ScalarValue};

    use super::*;
    use crate::ddl::MemorySchemaManager;
    use crate::errors::ExecutionError;
    use crate::hkey::HKey;
    use crate::row::{Row, RowType, TableRowType};
    use crate::store::memory::MemoryStore;

    fn parent_def() -> TableDefinition {
        TableDefinition::new(TableName::new("test", "parent"))
            .with_column(ColumnDefinition::new("id", DataType::Int32, false))
            .with_column(ColumnDefinition::new("name", DataType::Utf8, true).with_max_length(32))
            .with_primary_key(["id"])
    }

    fn child_def(schema: &str) -> TableDefinition {
        TableDefinition::new(TableName::new(schema, "child"))
            .with_column(ColumnDefinition::new("cid", DataType::Int32, false))
            .with_column(ColumnDefinition::new("pid", DataType::Int32, true))
            .with_primary_key(["cid"])
            .with_parent_join(TableName::new("test", "parent"), [("id", "pid")])
    }

    fn setup() -> (DdlFunctions<MemorySchemaManager, MemoryStore>, Session) {
        let ddl = DdlFunctions::new(
            Arc::new(MemorySchemaManager::new()),
            Arc::new(MemoryStore::new()),
        );
        let session = Session::default();
        ddl.create_table(&session, &parent_def()).unwrap();
        ddl.create_table(&session, &child_def("test")).unwrap();
        (ddl, session)
    }

    fn write_parent(ddl: &DdlFunctions<MemorySchemaManager, MemoryStore>, id: i32, name: &str) {
        let catalog = ddl.get_catalog();
        let table = catalog.user_table(&TableName::new("test", "parent")).unwrap();
        let group = catalog.group("parent").unwrap();
        let row = Row::new(
            RowType::Table(TableRowType::for_table(table)),
            [ScalarValue::Int32(id), ScalarValue::Utf8(name.to_string())],
            HKey::root(1, [ScalarValue::Int32(id)]),
        );
        ddl.store().write_row(group, row).unwrap();
    }

    fn name_index(unique: bool) -> NewIndex {
        let constraint = if unique {
            IndexConstraint::Unique
        } else {
            IndexConstraint::Key
        };
        NewIndex {
            target: IndexTargetDefinition::Table(TableName::new("test", "parent")),
            definition: IndexDefinition::new(
                "name_idx",
                constraint,
                [IndexColumnDefinition::new("name")],
            ),
        }
    }

    #[test]
    fn information_schema_is_protected() {
        let (ddl, session) = setup();
        let def = TableDefinition::new(TableName::new("information_schema", "t"))
            .with_column(ColumnDefinition::new("id", DataType::Int32, false));
        let err = ddl.create_table(&session, &def).unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Catalog(CatalogError::ProtectedTableDDL(_))
        ));

        let err = ddl
            .drop_table(&session, &TableName::new("INFORMATION_SCHEMA", "tables"))
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Catalog(CatalogError::ProtectedTableDDL(_))
        ));
    }

    #[test]
    fn drop_missing_table_is_noop() {
        let (ddl, session) = setup();
        let generation = ddl.get_generation();
        ddl.drop_table(&session, &TableName::new("test", "ghost"))
            .unwrap();
        ddl.drop_group(&session, "ghost").unwrap();
        assert_eq!(generation, ddl.get_generation());
    }

    #[test]
    fn drop_non_leaf_and_group_table_rejected() {
        let (ddl, session) = setup();
        let err = ddl
            .drop_table(&session, &TableName::new("test", "parent"))
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Catalog(CatalogError::UnsupportedDrop(_))
        ));

        let err = ddl
            .drop_table(&session, &TableName::new("test", "_group_parent"))
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Catalog(CatalogError::UnsupportedDrop(_))
        ));
    }

    #[test]
    fn drop_leaf_then_root() {
        let (ddl, session) = setup();
        write_parent(&ddl, 1, "a");

        ddl.drop_table(&session, &TableName::new("test", "child"))
            .unwrap();
        assert!(ddl.get_user_table(&TableName::new("test", "child")).is_err());
        assert!(ddl.store().has_tree("test.parent"));

        ddl.drop_table(&session, &TableName::new("test", "parent"))
            .unwrap();
        let catalog = ddl.get_catalog();
        assert!(catalog.group("parent").is_none());
        assert!(!ddl.store().has_tree("test.parent"));
    }

    #[test]
    fn lookups_by_name_and_id() {
        let (ddl, _session) = setup();
        let parent = TableName::new("test", "parent");
        assert_eq!(1, ddl.get_table_id(&parent).unwrap());
        assert_eq!(parent, ddl.get_table_name(1).unwrap());

        let group_table = ddl.get_table_by_id(2).unwrap();
        assert!(matches!(group_table, Table::Group(_)));
        assert_eq!(&TableName::new("test", "_group_parent"), group_table.name());

        let err = ddl.get_table_by_id(99).unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Catalog(CatalogError::NoSuchTableId(99))
        ));
    }

    #[test]
    fn create_and_drop_table_index() {
        let (ddl, session) = setup();
        write_parent(&ddl, 1, "b");
        write_parent(&ddl, 2, "a");

        let created = ddl.create_indexes(&session, &[name_index(false)]).unwrap();
        assert_eq!(1, created.len());
        assert_eq!(
            Some(vec![
                vec![ScalarValue::Utf8("a".to_string())],
                vec![ScalarValue::Utf8("b".to_string())],
            ]),
            ddl.store().index_keys(&created[0])
        );

        let parent = TableName::new("test", "parent");
        ddl.drop_table_indexes(&session, &parent, &["name_idx"])
            .unwrap();
        assert!(ddl.store().index_keys(&created[0]).is_none());
        assert!(
            !ddl.get_user_table(&parent)
                .unwrap()
                .indexes
                .contains_key("name_idx")
        );
    }

    #[test]
    fn failed_index_build_rolls_back() {
        let (ddl, session) = setup();
        write_parent(&ddl, 1, "same");
        write_parent(&ddl, 2, "same");

        let err = ddl.create_indexes(&session, &[name_index(true)]).unwrap_err();
        assert!(matches!(err, ExecutionError::Store(_)));
        assert!(
            !ddl.get_user_table(&TableName::new("test", "parent"))
                .unwrap()
                .indexes
                .contains_key("name_idx")
        );
        assert!(!ddl.store().has_tree("test.parent.name_idx"));
    }

    #[test]
    fn primary_key_cannot_be_dropped() {
        let (ddl, session) = setup();
        let parent = TableName::new("test", "parent");

        let err = ddl
            .drop_table_indexes(&session, &parent, &["PRIMARY"])
            .unwrap_err();
        assert_eq!(
            ExecutionError::Catalog(CatalogError::DropIndexNotAllowed {
                index: "PRIMARY".to_string(),
                table: parent.clone(),
            })
            .to_string(),
            err.to_string()
        );

        let err = ddl
            .drop_table_indexes(&session, &parent, &["missing"])
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Catalog(CatalogError::NoSuchIndex(_))
        ));

        let err = ddl
            .drop_group_indexes(&session, "ghost", &["x"])
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Catalog(CatalogError::NoSuchGroup(_))
        ));

        ddl.drop_table_indexes(&session, &parent, &[]).unwrap();
    }

    #[test]
    fn drop_schema_with_foreign_child_rejected() {
        let ddl = DdlFunctions::new(
            Arc::new(MemorySchemaManager::new()),
            Arc::new(MemoryStore::new()),
        );
        let session = Session::default();
        ddl.create_table(&session, &parent_def()).unwrap();
        ddl.create_table(&session, &child_def("other")).unwrap();

        let err = ddl.drop_schema(&session, "test").unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Catalog(CatalogError::ForeignConstraintDDL { .. })
        ));

        // Dropping the child's schema drops just the child.
        ddl.drop_schema(&session, "other").unwrap();
        let catalog = ddl.get_catalog();
        assert!(catalog.user_table(&TableName::new("other", "child")).is_none());
        assert!(catalog.user_table(&TableName::new("test", "parent")).is_some());

        ddl.drop_schema(&session, "test").unwrap();
        assert_eq!(0, ddl.get_catalog().user_tables().count());
    }

    #[test]
    fn ddls_and_generation() {
        let (ddl, _session) = setup();
        let generation = ddl.get_generation();
        ddl.force_generation_update();
        assert_eq!(generation + 1, ddl.get_generation());

        let ddls = ddl.get_ddls();
        assert_eq!("CREATE SCHEMA IF NOT EXISTS `test`", ddls[0]);
        assert_eq!(3, ddls.len());
    }
}
