//! Merging new tables and views into a catalog.
//!
//! A merge never touches the catalog it's given. It works on an unfrozen
//! copy, validates the result, and returns it frozen.

use tracing::{debug, info};

use crate::TableId;
use crate::builder::CatalogBuilder;
use crate::definition::{JoinDefinition, TableDefinition, ViewDefinition};
use crate::errors::{CatalogError, Result, internal};
use crate::id_allocator::{TableIdAllocator, index_id_offset};
use crate::model::catalog::Catalog;
use crate::model::column::Column;
use crate::model::table::UserTable;
use crate::model::view::View;
use crate::name::TableName;
use crate::name_generator::NameGenerator;
use crate::validation::{LIVE_VALIDATIONS, validate};

/// Merge a single table definition into a copy of `old`.
pub fn merge_table(old: &Catalog, table: &TableDefinition) -> Result<Catalog> {
    info!(table = %table.name, "merging table into catalog");

    let target = old.clone_unfrozen();
    let names = NameGenerator::from_catalog(&target);
    let mut ids = TableIdAllocator::from_catalog(&target);

    let is_system = table.name.in_information_schema();
    let table_id_offset = ids.next_id(is_system)?;

    let mut builder = CatalogBuilder::new(target, names);
    builder.set_table_id_offset(table_id_offset);

    if let Some(join) = table.parent_join() {
        let parent = resolve_parent(builder.catalog(), &table.name, join)?;
        let group = parent
            .group
            .clone()
            .ok_or_else(|| internal!("parent {} has no group", parent.name))?;
        let offset = index_id_offset(builder.catalog(), &group);
        builder.set_index_id_offset(offset);
    }

    let table_id = add_table(&mut builder, table)?;

    if table.parent_joins.is_empty() {
        debug!(table = %table.name, "table is root or lone table");
        let group_name = builder.names_mut().group_name(&table.name);
        let group_table_name = builder.names_mut().group_table_name(&group_name);
        builder.create_group(&group_name, table.name.schema(), &group_table_name)?;
        builder.add_table_to_group(&group_name, table_id)?;
    } else {
        // Every candidate is recorded. More than one is rejected during
        // validation.
        for join in &table.parent_joins {
            add_join(&mut builder, table, table_id, join)?;
        }
    }
    builder.grouping_is_complete()?;

    let mut catalog = builder.into_catalog();
    validate(&catalog, LIVE_VALIDATIONS).into_result()?;
    catalog.freeze();

    Ok(catalog)
}

fn resolve_parent<'a>(
    catalog: &'a Catalog,
    child: &TableName,
    join: &JoinDefinition,
) -> Result<&'a UserTable> {
    catalog
        .user_table(&join.parent)
        .ok_or_else(|| CatalogError::JoinToUnknownTable {
            child: child.clone(),
            parent: join.parent.clone(),
        })
}

fn add_table(builder: &mut CatalogBuilder, table: &TableDefinition) -> Result<TableId> {
    if let Some(charset) = &table.charset {
        charset.check_supported(&table.name.to_string())?;
    }

    let table_id = builder.user_table(&table.name)?;
    builder.table_properties(table_id, &table.engine, table.charset.clone())?;

    let mut columns: Vec<_> = table.columns.iter().collect();
    columns.sort_by_key(|c| c.position);

    for column in columns {
        builder.column(table_id, column)?;
        if let Some(identity) = &column.identity {
            let sequence_name = builder.names_mut().identity_sequence_name(&table.name);
            let sequence = TableName::new(table.name.schema(), sequence_name);
            builder.sequence(sequence.clone(), identity)?;
            builder.column_as_identity(
                table_id,
                &column.name,
                sequence.clone(),
                identity.default_identity,
            )?;
            debug!(sequence = %sequence, column = %column.name, "generated identity sequence");
        }
    }

    for index in &table.indexes {
        builder.index(table_id, &index.name, index.unique, index.constraint)?;
        for (position, col) in index.columns.iter().enumerate() {
            builder.index_column(
                table_id,
                &index.name,
                &col.column,
                position,
                col.ascending,
                col.indexed_length,
            )?;
        }
    }

    Ok(table_id)
}

fn add_join(
    builder: &mut CatalogBuilder,
    table: &TableDefinition,
    table_id: TableId,
    join: &JoinDefinition,
) -> Result<()> {
    let parent = resolve_parent(builder.catalog(), &table.name, join)?;
    let parent_id = parent.id;
    let parent_name = parent.name.clone();
    let group = parent
        .group
        .clone()
        .ok_or_else(|| internal!("parent {parent_name} has no group"))?;
    debug!(child = %table.name, parent = %parent_name, "table is child of table");

    let join_name = builder
        .names_mut()
        .join_name(&parent_name, &table.name, &join.columns);
    builder.join_tables(&join_name, parent_id, table_id)?;

    for jc in &join.columns {
        builder
            .join_columns(&join_name, &jc.parent, &jc.child)
            .map_err(|e| match e {
                CatalogError::NoSuchColumn { .. } => CatalogError::JoinToWrongColumns {
                    child: table.name.clone(),
                    child_column: jc.child.clone(),
                    parent: parent_name.clone(),
                    parent_column: jc.parent.clone(),
                },
                other => other,
            })?;
    }

    builder.add_join_to_group(&group, &join_name)
}

/// Merge a view definition into a copy of `old`.
pub fn merge_view(old: &Catalog, view: &ViewDefinition) -> Result<Catalog> {
    info!(view = %view.name, "merging view into catalog");

    let mut catalog = old.clone_unfrozen();
    let mut columns: Vec<_> = view
        .columns
        .iter()
        .map(|def| {
            let mut col = Column::new(
                def.name.clone(),
                def.position,
                def.datatype,
                def.type_param1,
                def.type_param2,
                def.nullable,
            );
            col.charset = def.charset.clone();
            col.initial_auto_increment = def.initial_auto_increment;
            col
        })
        .collect();
    columns.sort_by_key(|c| c.position);

    catalog.add_view(View {
        name: view.name.clone(),
        definition: view.definition.clone(),
        definition_properties: view.definition_properties.clone(),
        table_column_references: view.table_column_references.clone(),
        columns,
    })?;

    validate(&catalog, LIVE_VALIDATIONS).into_result()?;
    catalog.freeze();
    Ok(catalog)
}
