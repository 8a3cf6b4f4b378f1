use arbor_types::DataType;
use indexmap::IndexMap;

use crate::definition::{ColumnDefinition, IdentityDefinition};
use crate::errors::{CatalogError, Result, internal};
use crate::model::catalog::Catalog;
use crate::model::column::{CharsetAndCollation, Column, IdentityRef};
use crate::model::group::{Group, GroupTable};
use crate::model::index::{
    Index,
    IndexColumn,
    IndexConstraint,
    IndexTarget,
    MAX_INDEX_KEY_SIZE,
};
use crate::model::join::{Join, JoinColumn};
use crate::model::sequence::Sequence;
use crate::model::table::UserTable;
use crate::name::{TableName, validate_object_name};
use crate::name_generator::NameGenerator;
use crate::{IndexId, TableId};

/// Low level construction of catalog entities.
///
/// Table ids are taken from the table id offset and index ids from the index
/// id offset, each incremented after use. Callers set the offsets before
/// adding to the catalog.
#[derive(Debug)]
pub struct CatalogBuilder {
    catalog: Catalog,
    names: NameGenerator,
    table_id_offset: TableId,
    index_id_offset: IndexId,
}

impl CatalogBuilder {
    pub fn new(catalog: Catalog, names: NameGenerator) -> Self {
        CatalogBuilder {
            catalog,
            names,
            table_id_offset: 1,
            index_id_offset: 1,
        }
    }

    pub fn set_table_id_offset(&mut self, offset: TableId) {
        self.table_id_offset = offset;
    }

    pub fn set_index_id_offset(&mut self, offset: IndexId) {
        self.index_id_offset = offset;
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn names_mut(&mut self) -> &mut NameGenerator {
        &mut self.names
    }

    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }

    fn take_table_id(&mut self) -> TableId {
        let id = self.table_id_offset;
        self.table_id_offset += 1;
        id
    }

    fn take_index_id(&mut self) -> IndexId {
        let id = self.index_id_offset;
        self.index_id_offset += 1;
        id
    }

    fn table(&self, id: TableId) -> Result<&UserTable> {
        self.catalog
            .user_table_by_id(id)
            .ok_or(CatalogError::NoSuchTableId(id))
    }

    pub fn user_table(&mut self, name: &TableName) -> Result<TableId> {
        validate_object_name(name.schema())?;
        validate_object_name(name.table())?;
        let id = self.take_table_id();
        self.catalog
            .add_user_table(UserTable::new(id, name.clone()))?;
        Ok(id)
    }

    pub fn table_properties(
        &mut self,
        table: TableId,
        engine: &str,
        charset: Option<CharsetAndCollation>,
    ) -> Result<()> {
        let table_ent = self.catalog.user_table_mut(table)?;
        table_ent.engine = engine.to_string();
        table_ent.charset = charset;
        Ok(())
    }

    pub fn column(&mut self, table: TableId, def: &ColumnDefinition) -> Result<()> {
        validate_object_name(&def.name)?;
        let table_ent = self.catalog.user_table_mut(table)?;
        if table_ent.column(&def.name).is_some() {
            return Err(CatalogError::DuplicateColumnName {
                table: table_ent.name.clone(),
                column: def.name.clone(),
            });
        }
        if let Some(charset) = &def.charset {
            charset.check_supported(&format!("{}.{}", table_ent.name, def.name))?;
        }

        let mut column = Column::new(
            def.name.clone(),
            def.position,
            def.datatype,
            def.type_param1,
            def.type_param2,
            def.nullable,
        );
        column.charset = def.charset.clone();
        column.initial_auto_increment = def.initial_auto_increment;
        table_ent.insert_column(column);
        Ok(())
    }

    pub fn sequence(&mut self, name: TableName, identity: &IdentityDefinition) -> Result<()> {
        let tree_name = self
            .names
            .tree_name_for_sequence(name.schema(), name.table());
        self.catalog.add_sequence(Sequence {
            name,
            start: identity.start,
            increment: identity.increment,
            min: identity.min,
            max: identity.max,
            cycle: identity.cycle,
            tree_name: Some(tree_name),
        })
    }

    pub fn column_as_identity(
        &mut self,
        table: TableId,
        column: &str,
        sequence: TableName,
        default_identity: bool,
    ) -> Result<()> {
        if self.catalog.sequence(&sequence).is_none() {
            return Err(internal!("missing sequence {sequence}"));
        }
        let table_ent = self.catalog.user_table_mut(table)?;
        let table_name = table_ent.name.clone();
        let col = table_ent
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| CatalogError::NoSuchColumn {
                table: table_name,
                column: column.to_string(),
            })?;
        col.identity = Some(IdentityRef {
            sequence,
            default_identity,
        });
        Ok(())
    }

    /// Add an index to a table.
    pub fn index(
        &mut self,
        table: TableId,
        name: &str,
        unique: bool,
        constraint: IndexConstraint,
    ) -> Result<IndexId> {
        validate_object_name(name)?;
        let table_name = self.table(table)?.name.clone();
        if self.table(table)?.indexes.contains_key(name) {
            return Err(CatalogError::DuplicateKey {
                target: table_name.to_string(),
                index: name.to_string(),
            });
        }

        let id = self.take_index_id();
        let tree_name =
            self.names
                .tree_name_for_index(table_name.schema(), table_name.table(), name);
        let index = Index::new(
            name,
            IndexTarget::Table(table),
            id,
            unique,
            constraint,
            tree_name,
        );
        self.catalog
            .user_table_mut(table)?
            .indexes
            .insert(name.to_string(), index);
        Ok(id)
    }

    /// Add a column to a table index.
    pub fn index_column(
        &mut self,
        table: TableId,
        index: &str,
        column: &str,
        position: usize,
        ascending: bool,
        indexed_length: Option<u64>,
    ) -> Result<()> {
        let index_column =
            self.make_index_column(table, index, column, position, ascending, indexed_length)?;
        let existing = self
            .table(table)?
            .indexes
            .get(index)
            .ok_or_else(|| CatalogError::NoSuchIndex(index.to_string()))?;
        check_key_size(index, key_size(&self.catalog, existing.columns(), &index_column))?;

        self.catalog
            .user_table_mut(table)?
            .indexes
            .get_mut(index)
            .ok_or_else(|| CatalogError::NoSuchIndex(index.to_string()))?
            .add_column(index_column);
        Ok(())
    }

    /// Add an index to a group.
    pub fn group_index(
        &mut self,
        group: &str,
        name: &str,
        unique: bool,
        constraint: IndexConstraint,
    ) -> Result<IndexId> {
        validate_object_name(name)?;
        let group_ent = self
            .catalog
            .group(group)
            .ok_or_else(|| CatalogError::NoSuchGroup(group.to_string()))?;
        if group_ent.indexes.contains_key(name) {
            return Err(CatalogError::DuplicateKey {
                target: group.to_string(),
                index: name.to_string(),
            });
        }
        let schema = self
            .catalog
            .group_table_by_id(group_ent.group_table)
            .map(|t| t.name.schema().to_string())
            .ok_or_else(|| internal!("group {group} missing group table"))?;

        let id = self.take_index_id();
        let tree_name = self.names.tree_name_for_index(&schema, group, name);
        let index = Index::new(
            name,
            IndexTarget::Group(group.to_string()),
            id,
            unique,
            constraint,
            tree_name,
        );
        self.catalog
            .group_mut(group)?
            .indexes
            .insert(name.to_string(), index);
        Ok(id)
    }

    /// Add a column of one of the group's tables to a group index.
    #[allow(clippy::too_many_arguments)]
    pub fn group_index_column(
        &mut self,
        group: &str,
        index: &str,
        table: TableId,
        column: &str,
        position: usize,
        ascending: bool,
        indexed_length: Option<u64>,
    ) -> Result<()> {
        let table_ent = self.table(table)?;
        if table_ent.group.as_deref() != Some(group) {
            return Err(internal!(
                "table {} is not part of group {group}",
                table_ent.name
            ));
        }
        let index_column =
            self.make_index_column(table, index, column, position, ascending, indexed_length)?;
        let existing = self
            .catalog
            .group(group)
            .ok_or_else(|| CatalogError::NoSuchGroup(group.to_string()))?
            .indexes
            .get(index)
            .ok_or_else(|| CatalogError::NoSuchIndex(index.to_string()))?;
        check_key_size(index, key_size(&self.catalog, existing.columns(), &index_column))?;

        self.catalog
            .group_mut(group)?
            .indexes
            .get_mut(index)
            .ok_or_else(|| CatalogError::NoSuchIndex(index.to_string()))?
            .add_column(index_column);
        Ok(())
    }

    fn make_index_column(
        &self,
        table: TableId,
        index: &str,
        column: &str,
        position: usize,
        ascending: bool,
        indexed_length: Option<u64>,
    ) -> Result<IndexColumn> {
        let table_ent = self.table(table)?;
        let col = table_ent
            .column(column)
            .ok_or_else(|| CatalogError::NoSuchColumn {
                table: table_ent.name.clone(),
                column: column.to_string(),
            })?;
        if !col.datatype.is_indexable() {
            return Err(CatalogError::UnsupportedIndexDataType {
                index: index.to_string(),
                column: column.to_string(),
                type_name: col.datatype.to_string(),
            });
        }

        Ok(IndexColumn {
            table,
            column: column.to_string(),
            column_position: col.position,
            position,
            ascending,
            indexed_length,
        })
    }

    pub fn join_tables(&mut self, join_name: &str, parent: TableId, child: TableId) -> Result<()> {
        self.table(parent)?;
        self.table(child)?;
        self.catalog.add_join(Join {
            name: join_name.to_string(),
            parent,
            child,
            columns: Vec::new(),
            group: None,
        })?;
        self.catalog
            .user_table_mut(child)?
            .candidate_parent_joins
            .push(join_name.to_string());
        self.catalog
            .user_table_mut(parent)?
            .child_joins
            .push(join_name.to_string());
        Ok(())
    }

    /// Errors with `NoSuchColumn` if either column doesn't exist.
    pub fn join_columns(
        &mut self,
        join_name: &str,
        parent_column: &str,
        child_column: &str,
    ) -> Result<()> {
        let join = self
            .catalog
            .join(join_name)
            .ok_or_else(|| internal!("missing join {join_name}"))?;
        for (table, column) in [(join.parent, parent_column), (join.child, child_column)] {
            let table_ent = self.table(table)?;
            if table_ent.column(column).is_none() {
                return Err(CatalogError::NoSuchColumn {
                    table: table_ent.name.clone(),
                    column: column.to_string(),
                });
            }
        }
        self.catalog
            .join_mut(join_name)?
            .columns
            .push(JoinColumn::new(parent_column, child_column));
        Ok(())
    }

    /// Create an empty group. The group table takes the next table id.
    pub fn create_group(
        &mut self,
        group_name: &str,
        schema: &str,
        group_table_name: &str,
    ) -> Result<TableId> {
        let id = self.take_table_id();
        let tree_name = self.names.tree_name_for_group(schema, group_name);
        self.catalog.add_group(
            Group {
                name: group_name.to_string(),
                root: None,
                group_table: id,
                tree_name,
                indexes: IndexMap::new(),
            },
            GroupTable {
                id,
                name: TableName::new(schema, group_table_name),
                group: group_name.to_string(),
            },
        )?;
        Ok(id)
    }

    /// Add a table to a group as its root.
    pub fn add_table_to_group(&mut self, group: &str, table: TableId) -> Result<()> {
        let tree_name = self.catalog.group_mut(group)?.tree_name.clone();
        let table_ent = self.catalog.user_table_mut(table)?;
        if let Some(existing) = &table_ent.group {
            if existing != group {
                return Err(CatalogError::JoinToMultipleParents(table_ent.name.clone()));
            }
        }
        table_ent.group = Some(group.to_string());
        table_ent.depth = Some(0);
        table_ent.ordinal = Some(1);
        table_ent.tree_name = Some(tree_name);
        self.catalog.group_mut(group)?.root = Some(table);
        Ok(())
    }

    /// Place a join, and its child table, into the parent's group.
    pub fn add_join_to_group(&mut self, group: &str, join_name: &str) -> Result<()> {
        let join = self
            .catalog
            .join(join_name)
            .cloned()
            .ok_or_else(|| internal!("missing join {join_name}"))?;
        self.catalog.group_mut(group)?;

        let parent = self.table(join.parent)?;
        if parent.group.as_deref() != Some(group) {
            return Err(internal!("parent {} not in group {group}", parent.name));
        }
        let parent_depth = parent.depth.unwrap_or(0);

        let child = self.table(join.child)?;
        if let Some(existing) = &child.group {
            if existing != group {
                return Err(CatalogError::JoinToMultipleParents(child.name.clone()));
            }
        }
        let next_ordinal = self
            .catalog
            .group_members(group)
            .filter_map(|t| t.ordinal)
            .max()
            .unwrap_or(0)
            + 1;

        self.catalog.join_mut(join_name)?.group = Some(group.to_string());

        let child = self.catalog.user_table_mut(join.child)?;
        child.group = Some(group.to_string());
        if child.parent_join.is_none() {
            child.parent_join = Some(join_name.to_string());
            child.depth = Some(parent_depth + 1);
        }
        if child.ordinal.is_none() {
            child.ordinal = Some(next_ordinal);
        }
        Ok(())
    }

    /// Recompute depths of all grouped tables from their parent joins.
    ///
    /// Tables caught in a join cycle keep whatever depth they had, validation
    /// reports the cycle.
    pub fn grouping_is_complete(&mut self) -> Result<()> {
        let limit = self.catalog.user_tables().count();
        let mut depths = Vec::new();
        for table in self.catalog.user_tables() {
            if table.group.is_none() {
                continue;
            }
            let mut depth = 0;
            let mut current = table;
            while let Some(parent) = self.catalog.parent_table(current) {
                depth += 1;
                if depth as usize > limit {
                    break;
                }
                current = parent;
            }
            if depth as usize <= limit {
                depths.push((table.id, depth));
            }
        }
        for (id, depth) in depths {
            self.catalog.user_table_mut(id)?.depth = Some(depth);
        }
        Ok(())
    }
}

/// Key size of an index after adding `new_column`.
fn key_size(catalog: &Catalog, existing: &[IndexColumn], new_column: &IndexColumn) -> u64 {
    existing
        .iter()
        .chain(std::iter::once(new_column))
        .map(|ic| {
            let col = catalog
                .user_table_by_id(ic.table)
                .and_then(|t| t.column(&ic.column));
            match (col, ic.indexed_length) {
                (Some(col), Some(len)) if col.datatype == DataType::Utf8 => {
                    DataType::Utf8.max_storage_size(Some(len))
                }
                (Some(col), _) => col.max_storage_size(),
                (None, _) => 0,
            }
        })
        .sum()
}

fn check_key_size(index: &str, size: u64) -> Result<()> {
    if size > MAX_INDEX_KEY_SIZE {
        return Err(CatalogError::UnsupportedIndexSize {
            index: index.to_string(),
            size,
            max: MAX_INDEX_KEY_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_with_table() -> (CatalogBuilder, TableId) {
        let mut builder = CatalogBuilder::new(Catalog::new(), NameGenerator::new());
        let id = builder.user_table(&TableName::new("test", "t")).unwrap();
        builder
            .column(id, &ColumnDefinition::new("id", DataType::Int32, false))
            .unwrap();
        (builder, id)
    }

    #[test]
    fn duplicate_column() {
        let (mut builder, id) = builder_with_table();
        let err = builder
            .column(id, &ColumnDefinition::new("id", DataType::Int64, true))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateColumnName { .. }));
    }

    #[test]
    fn duplicate_index() {
        let (mut builder, id) = builder_with_table();
        builder
            .index(id, "PRIMARY", true, IndexConstraint::Primary)
            .unwrap();
        let err = builder
            .index(id, "PRIMARY", true, IndexConstraint::Primary)
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey { .. }));
    }

    #[test]
    fn blob_not_indexable() {
        let (mut builder, id) = builder_with_table();
        let mut blob = ColumnDefinition::new("b", DataType::Blob, true);
        blob.position = 1;
        builder.column(id, &blob).unwrap();
        builder.index(id, "b_idx", false, IndexConstraint::Key).unwrap();
        let err = builder
            .index_column(id, "b_idx", "b", 0, true, None)
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedIndexDataType { .. }));
    }

    #[test]
    fn oversized_index_key() {
        let (mut builder, id) = builder_with_table();
        let wide = ColumnDefinition {
            position: 1,
            ..ColumnDefinition::new("w", DataType::Utf8, true).with_max_length(1000)
        };
        builder.column(id, &wide).unwrap();
        builder.index(id, "w_idx", false, IndexConstraint::Key).unwrap();
        let err = builder
            .index_column(id, "w_idx", "w", 0, true, None)
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedIndexSize { .. }));

        // Prefix index fits.
        builder
            .index_column(id, "w_idx", "w", 0, true, Some(100))
            .unwrap();
    }

    #[test]
    fn group_table_takes_next_id() {
        let (mut builder, id) = builder_with_table();
        let group_table = builder.create_group("t", "test", "_group_t").unwrap();
        builder.add_table_to_group("t", id).unwrap();

        assert_eq!(1, id);
        assert_eq!(2, group_table);
        let table = builder.catalog().user_table_by_id(id).unwrap();
        assert_eq!(Some(0), table.depth);
        assert_eq!(Some(1), table.ordinal);
        assert_eq!(Some("test.t"), table.tree_name.as_deref());
    }
}
