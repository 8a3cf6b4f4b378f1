//! Catalog changes other than adding tables and views.
//!
//! Like merges, each function works on an unfrozen copy and returns a
//! validated, frozen catalog.

use std::collections::HashSet;

use tracing::debug;

use crate::TableId;
use crate::builder::CatalogBuilder;
use crate::definition::{IndexTargetDefinition, NewIndex};
use crate::errors::{CatalogError, Result, internal};
use crate::id_allocator::index_id_offset;
use crate::model::catalog::Catalog;
use crate::model::index::{Index, IndexTarget};
use crate::name::TableName;
use crate::name_generator::NameGenerator;
use crate::validation::{LIVE_VALIDATIONS, validate};

fn finish(mut catalog: Catalog) -> Result<Catalog> {
    validate(&catalog, LIVE_VALIDATIONS).into_result()?;
    catalog.freeze();
    Ok(catalog)
}

/// Add indexes to tables and groups. Returns the new catalog along with the
/// indexes as they were created.
pub fn add_indexes(old: &Catalog, indexes: &[NewIndex]) -> Result<(Catalog, Vec<Index>)> {
    let target = old.clone_unfrozen();
    let names = NameGenerator::from_catalog(&target);
    let mut builder = CatalogBuilder::new(target, names);
    let mut created = Vec::with_capacity(indexes.len());

    for new_index in indexes {
        let def = &new_index.definition;
        match &new_index.target {
            IndexTargetDefinition::Table(name) => {
                let table = builder
                    .catalog()
                    .user_table(name)
                    .ok_or_else(|| CatalogError::NoSuchTable(name.clone()))?;
                let table_id = table.id;
                let group = table
                    .group
                    .clone()
                    .ok_or_else(|| internal!("table {name} has no group"))?;
                let offset = index_id_offset(builder.catalog(), &group);
                builder.set_index_id_offset(offset);

                builder.index(table_id, &def.name, def.unique, def.constraint)?;
                for (position, col) in def.columns.iter().enumerate() {
                    builder.index_column(
                        table_id,
                        &def.name,
                        &col.column,
                        position,
                        col.ascending,
                        col.indexed_length,
                    )?;
                }
                let index = builder
                    .catalog()
                    .user_table_by_id(table_id)
                    .and_then(|t| t.indexes.get(&def.name))
                    .cloned()
                    .ok_or_else(|| internal!("index {} missing after create", def.name))?;
                created.push(index);
            }
            IndexTargetDefinition::Group(group) => {
                let root = builder
                    .catalog()
                    .group(group)
                    .ok_or_else(|| CatalogError::NoSuchGroup(group.clone()))?
                    .root;
                let offset = index_id_offset(builder.catalog(), group);
                builder.set_index_id_offset(offset);

                builder.group_index(group, &def.name, def.unique, def.constraint)?;
                for (position, col) in def.columns.iter().enumerate() {
                    let table_id = match &col.table {
                        Some(name) => {
                            builder
                                .catalog()
                                .user_table(name)
                                .ok_or_else(|| CatalogError::NoSuchTable(name.clone()))?
                                .id
                        }
                        None => root.ok_or_else(|| internal!("group {group} has no root"))?,
                    };
                    builder.group_index_column(
                        group,
                        &def.name,
                        table_id,
                        &col.column,
                        position,
                        col.ascending,
                        col.indexed_length,
                    )?;
                }
                let index = builder
                    .catalog()
                    .group(group)
                    .and_then(|g| g.indexes.get(&def.name))
                    .cloned()
                    .ok_or_else(|| internal!("index {} missing after create", def.name))?;
                created.push(index);
            }
        }
        debug!(index = %def.name, "added index");
    }

    let catalog = finish(builder.into_catalog())?;
    Ok((catalog, created))
}

/// Remove indexes. Each index is identified by its target and name.
pub fn drop_indexes(old: &Catalog, indexes: &[Index]) -> Result<Catalog> {
    let mut catalog = old.clone_unfrozen();
    for index in indexes {
        let removed = match &index.target {
            IndexTarget::Table(id) => catalog
                .user_table_mut(*id)?
                .indexes
                .shift_remove(&index.name),
            IndexTarget::Group(group) => catalog
                .group_mut(group)?
                .indexes
                .shift_remove(&index.name),
        };
        if removed.is_none() {
            return Err(CatalogError::NoSuchIndex(index.name.clone()));
        }
    }
    finish(catalog)
}

pub fn rename_table(old: &Catalog, current: &TableName, new_name: &TableName) -> Result<Catalog> {
    let mut catalog = old.clone_unfrozen();
    let id = catalog
        .user_table(current)
        .ok_or_else(|| CatalogError::NoSuchTable(current.clone()))?
        .id;
    catalog.rename_user_table(id, new_name.clone())?;
    finish(catalog)
}

/// Drop a user table, a view, or a whole group given its group table name.
///
/// User tables must be leaves. Dropping a root table without children drops
/// its group.
pub fn drop_table(old: &Catalog, name: &TableName) -> Result<Catalog> {
    let mut catalog = old.clone_unfrozen();

    if catalog.view(name).is_some() {
        catalog.remove_view(name)?;
        return finish(catalog);
    }
    if let Some(group_table) = catalog.group_table(name) {
        let group = group_table.group.clone();
        remove_group(&mut catalog, &group)?;
        return finish(catalog);
    }

    let table = catalog
        .user_table(name)
        .ok_or_else(|| CatalogError::NoSuchTable(name.clone()))?;
    if !catalog.child_tables(table.id).is_empty() {
        return Err(CatalogError::UnsupportedDrop(name.clone()));
    }
    let id = table.id;
    let lone_root = table.is_root();
    let group = table.group.clone();

    remove_table(&mut catalog, id)?;
    if lone_root {
        if let Some(group) = group {
            catalog.remove_group(&group)?;
        }
    }
    finish(catalog)
}

/// Drop a group and every table in it.
pub fn drop_group(old: &Catalog, group: &str) -> Result<Catalog> {
    let mut catalog = old.clone_unfrozen();
    remove_group(&mut catalog, group)?;
    finish(catalog)
}

fn remove_group(catalog: &mut Catalog, group: &str) -> Result<()> {
    let members: Vec<TableId> = catalog.group_members(group).map(|t| t.id).collect();
    // Children go first so parents are always leaves at removal.
    let mut members: Vec<_> = members
        .into_iter()
        .map(|id| {
            let depth = catalog
                .user_table_by_id(id)
                .and_then(|t| t.depth)
                .unwrap_or(0);
            (depth, id)
        })
        .collect();
    members.sort_by(|a, b| b.cmp(a));
    for (_, id) in members {
        remove_table(catalog, id)?;
    }
    catalog.remove_group(group)?;
    Ok(())
}

/// Remove a table along with its joins, identity sequences and any group
/// indexes using its columns.
fn remove_table(catalog: &mut Catalog, id: TableId) -> Result<()> {
    let table = catalog.remove_user_table(id)?;

    for join_name in table
        .candidate_parent_joins
        .iter()
        .chain(table.child_joins.iter())
    {
        if let Some(join) = catalog.remove_join(join_name)? {
            let other = if join.child == id {
                join.parent
            } else {
                join.child
            };
            if let Ok(other) = catalog.user_table_mut(other) {
                other.child_joins.retain(|j| j != join_name);
                other.candidate_parent_joins.retain(|j| j != join_name);
                if other.parent_join.as_deref() == Some(join_name.as_str()) {
                    other.parent_join = None;
                }
            }
        }
    }

    let sequences: HashSet<_> = table
        .columns
        .iter()
        .filter_map(|c| c.identity.as_ref().map(|i| i.sequence.clone()))
        .collect();
    for seq in &sequences {
        catalog.remove_sequence(seq)?;
    }

    if let Some(group) = &table.group {
        if catalog.group(group).is_some() {
            let group_ent = catalog.group_mut(group)?;
            group_ent
                .indexes
                .retain(|_, idx| idx.columns().iter().all(|c| c.table != id));
            if group_ent.root == Some(id) {
                group_ent.root = None;
            }
        }
    }

    Ok(())
}
