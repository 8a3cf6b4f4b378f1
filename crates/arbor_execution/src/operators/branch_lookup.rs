//! Lookup of the branch related to a bound row.
//!
//! Given a row of `input_type` bound at `binding_position`, the cursor
//! returns the row of `output_type` sharing the input's common ancestor along
//! with all of its descendants, in hkey order. Orphans under the branch root
//! are returned even when the branch root row itself is missing.
//!
//! With `KeepInput` the input row is emitted too, either before or after the
//! whole branch. It comes after when the output table is an ancestor of the
//! input table. Otherwise it comes before when the input's branch under the
//! common ancestor has a lower ordinal than the output's.

use std::sync::Arc;

use arbor_catalog::model::group::Group;
use arbor_catalog::model::table::UserTable;
use arbor_catalog::{Catalog, CatalogError};
use tracing::trace;

use super::{Operator, table_depth, table_in_group, table_ordinal};
use crate::bindings::QueryBindings;
use crate::context::QueryContext;
use crate::cursor::{Cursor, CursorLifecycle, CursorState};
use crate::errors::{ExecutionError, Result};
use crate::explain::{ExplainEntry, Explainable};
use crate::row::{RowRef, RowType, TableRowType};
use crate::session::ScanHandle;
use crate::store::GroupCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPreservation {
    KeepInput,
    DiscardInput,
}

#[derive(Debug, Clone)]
pub struct BranchLookupNested {
    group: Group,
    input_type: RowType,
    output_type: TableRowType,
    common_ancestor: TableRowType,
    common_ancestor_depth: u32,
    /// Ordinal of the output table when it is a child of the common ancestor.
    /// None when the output table is the common ancestor.
    branch_root_ordinal: Option<u32>,
    keep_input: bool,
    input_precedes_branch: bool,
    binding_position: usize,
}

impl BranchLookupNested {
    pub fn new(
        catalog: &Catalog,
        group: &str,
        input_type: RowType,
        ancestor_type: Option<TableRowType>,
        output_type: TableRowType,
        preservation: InputPreservation,
        binding_position: usize,
    ) -> Result<Self> {
        let group = catalog
            .group(group)
            .ok_or_else(|| CatalogError::NoSuchGroup(group.to_string()))?
            .clone();
        let keep_input = preservation == InputPreservation::KeepInput;
        if keep_input && !input_type.is_table() {
            return Err(ExecutionError::InvalidArgument(format!(
                "input rows of type {input_type} cannot be kept"
            )));
        }

        let input_table = table_in_group(catalog, input_type.table_id(), &group.name)?;
        let output_table = table_in_group(catalog, output_type.table, &group.name)?;

        let common = match &ancestor_type {
            Some(ancestor) => {
                let ancestor = table_in_group(catalog, ancestor.table, &group.name)?;
                if !catalog.is_ancestor_of(ancestor, input_table) {
                    return Err(ExecutionError::InvalidArgument(format!(
                        "{} is not an ancestor of {}",
                        ancestor.name, input_table.name
                    )));
                }
                if !catalog.is_ancestor_of(ancestor, output_table) {
                    return Err(ExecutionError::InvalidArgument(format!(
                        "{} is not an ancestor of {}",
                        ancestor.name, output_table.name
                    )));
                }
                ancestor
            }
            None => common_ancestor(catalog, input_table, output_table)?,
        };

        let common_depth = table_depth(common)?;
        let branch_root_ordinal = match table_depth(output_table)?.checked_sub(common_depth) {
            Some(0) => None,
            Some(1) => Some(table_ordinal(output_table)?),
            _ => {
                return Err(ExecutionError::InvalidArgument(format!(
                    "{} must be {} or one of its children",
                    output_table.name, common.name
                )));
            }
        };

        let input_precedes_branch = match branch_root_ordinal {
            None => false,
            Some(_) if input_table.id == common.id => true,
            Some(branch_ordinal) => {
                let input_branch = catalog
                    .ancestor_at_depth(input_table, common_depth + 1)
                    .ok_or_else(|| {
                        ExecutionError::InvalidArgument(format!(
                            "{} has no ancestor under {}",
                            input_table.name, common.name
                        ))
                    })?;
                table_ordinal(input_branch)? < branch_ordinal
            }
        };

        Ok(BranchLookupNested {
            group,
            input_type,
            output_type,
            common_ancestor: TableRowType::for_table(common),
            common_ancestor_depth: common_depth,
            branch_root_ordinal,
            keep_input,
            input_precedes_branch,
            binding_position,
        })
    }

    pub fn common_ancestor(&self) -> &TableRowType {
        &self.common_ancestor
    }

    pub fn input_precedes_branch(&self) -> bool {
        self.input_precedes_branch
    }

    pub fn branch_root_ordinal(&self) -> Option<u32> {
        self.branch_root_ordinal
    }
}

/// Walk both tables up to the same depth, then up in lockstep until they
/// meet.
fn common_ancestor<'a>(
    catalog: &'a Catalog,
    input: &'a UserTable,
    output: &'a UserTable,
) -> Result<&'a UserTable> {
    let depth = table_depth(input)?.min(table_depth(output)?);
    let unreachable = |t: &UserTable| {
        ExecutionError::InvalidArgument(format!("{} has no ancestor at depth {depth}", t.name))
    };
    let mut a = catalog
        .ancestor_at_depth(input, depth)
        .ok_or_else(|| unreachable(input))?;
    let mut b = catalog
        .ancestor_at_depth(output, depth)
        .ok_or_else(|| unreachable(output))?;

    while a.id != b.id {
        match (catalog.parent_table(a), catalog.parent_table(b)) {
            (Some(pa), Some(pb)) => {
                a = pa;
                b = pb;
            }
            _ => {
                return Err(ExecutionError::InvalidArgument(format!(
                    "{} and {} have no common ancestor",
                    input.name, output.name
                )));
            }
        }
    }
    Ok(a)
}

impl Operator for BranchLookupNested {
    fn name(&self) -> &'static str {
        "BranchLookup_Nested"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        let config = ctx.config();
        let inner = ctx
            .store()
            .new_group_cursor(&self.group, config.scan_batch_hint as usize)?;
        Ok(Box::new(BranchLookupCursor {
            lookup: self.clone(),
            ctx: ctx.clone(),
            inner,
            lifecycle: CursorLifecycle::new("BranchLookup_Nested", config.cursor_lifecycle_checks),
            held: None,
            branch_done: false,
            handle: None,
        }))
    }
}

impl Explainable for BranchLookupNested {
    fn explain_entry(&self) -> ExplainEntry {
        let mut ent = ExplainEntry::new(self.name())
            .with_value("binding_position", self.binding_position)
            .with_value("input_type", &self.input_type)
            .with_value("output_type", &self.output_type);
        let ancestor = RowType::Table(self.common_ancestor.clone());
        if ancestor != self.input_type && self.common_ancestor != self.output_type {
            ent = ent.with_value("ancestor_type", &self.common_ancestor);
        }
        ent
    }
}

#[derive(Debug)]
struct BranchLookupCursor {
    lookup: BranchLookupNested,
    ctx: QueryContext,
    inner: Box<dyn GroupCursor>,
    lifecycle: CursorLifecycle,
    /// Input row, held until emitted or the cursor closes.
    held: Option<RowRef>,
    branch_done: bool,
    /// Registered against the group table, so DDL on any table of the group
    /// marks it.
    handle: Option<Arc<ScanHandle>>,
}

impl Cursor for BranchLookupCursor {
    fn open(&mut self, bindings: &QueryBindings) -> Result<()> {
        self.lifecycle.check_open()?;
        let row = bindings.get_row(self.lookup.binding_position)?.clone();
        if self.ctx.config().log_execution {
            trace!(row = %row, "BranchLookup_Nested: open");
        }
        if row.row_type() != &self.lookup.input_type {
            return Err(ExecutionError::UnexpectedRowType {
                expected: self.lookup.input_type.to_string(),
                got: row.row_type().to_string(),
            });
        }

        let mut hkey = row.hkey().ancestor(self.lookup.common_ancestor_depth)?;
        if let Some(ordinal) = self.lookup.branch_root_ordinal {
            hkey.extend_with_ordinal(ordinal);
        }
        self.inner.rebind(hkey, true)?;
        self.inner.open()?;

        self.held = Some(row);
        self.branch_done = false;
        self.handle = self
            .ctx
            .session()
            .map(|s| s.scans().register(self.lookup.group.group_table));
        self.lifecycle.set_active();
        Ok(())
    }

    fn next(&mut self) -> Result<Option<RowRef>> {
        self.lifecycle.check_next()?;
        self.ctx.check_canceled()?;
        if self.lifecycle.state() == CursorState::Idle {
            return Ok(None);
        }
        if self.handle.as_ref().is_some_and(|h| h.is_ddl_modified()) {
            return Err(ExecutionError::DdlModified(self.lookup.group.group_table));
        }

        let lookup = &self.lookup;
        let row = if lookup.keep_input && lookup.input_precedes_branch && self.held.is_some() {
            self.held.take()
        } else if self.branch_done {
            None
        } else {
            match self.inner.next()? {
                Some(row) => Some(row),
                None => {
                    self.branch_done = true;
                    if lookup.keep_input && !lookup.input_precedes_branch {
                        self.held.take()
                    } else {
                        None
                    }
                }
            }
        };

        if self.ctx.config().log_execution {
            match &row {
                Some(row) => trace!(row = %row, "BranchLookup_Nested: yield"),
                None => trace!("BranchLookup_Nested: yield end"),
            }
        }
        if row.is_none() {
            self.close()?;
        }
        Ok(row)
    }

    fn close(&mut self) -> Result<()> {
        self.lifecycle.check_close()?;
        if self.lifecycle.state() == CursorState::Idle {
            return Ok(());
        }
        self.inner.close()?;
        self.held = None;
        if let Some(handle) = self.handle.take() {
            handle.set_closed();
        }
        self.lifecycle.set_idle();
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        self.lifecycle.check_destroy()?;
        self.close()?;
        self.inner.destroy()?;
        self.lifecycle.set_destroyed();
        Ok(())
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }
}
