//! Row-flow operators over group storage.

pub mod branch_lookup;
pub mod group_scan;

use std::fmt::Debug;

use arbor_catalog::model::table::UserTable;
use arbor_catalog::{Catalog, CatalogError, TableId};

use crate::context::QueryContext;
use crate::cursor::Cursor;
use crate::errors::{ExecutionError, Result};
use crate::explain::Explainable;

pub trait Operator: Debug + Explainable + Send + Sync {
    fn name(&self) -> &'static str;

    /// Create a cursor for one execution of this operator.
    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>>;
}

/// Look up a user table that must belong to `group`.
pub(crate) fn table_in_group<'a>(catalog: &'a Catalog, id: TableId, group: &str) -> Result<&'a UserTable> {
    let table = catalog
        .user_table_by_id(id)
        .ok_or(CatalogError::NoSuchTableId(id))?;
    if table.group.as_deref() != Some(group) {
        return Err(ExecutionError::InvalidArgument(format!(
            "table {} does not belong to group {group}",
            table.name
        )));
    }
    Ok(table)
}

pub(crate) fn table_depth(table: &UserTable) -> Result<u32> {
    table
        .depth
        .ok_or_else(|| ExecutionError::InvalidArgument(format!("table {} is not grouped", table.name)))
}

pub(crate) fn table_ordinal(table: &UserTable) -> Result<u32> {
    table
        .ordinal
        .ok_or_else(|| ExecutionError::InvalidArgument(format!("table {} has no ordinal", table.name)))
}
