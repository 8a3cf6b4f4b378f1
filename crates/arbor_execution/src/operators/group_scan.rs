use std::sync::Arc;

use arbor_catalog::model::group::Group;
use arbor_catalog::{Catalog, CatalogError, TableId};
use tracing::trace;

use super::{Operator, table_in_group};
use crate::bindings::QueryBindings;
use crate::context::QueryContext;
use crate::cursor::{Cursor, CursorLifecycle, CursorState};
use crate::errors::{ExecutionError, Result};
use crate::explain::{ExplainEntry, Explainable};
use crate::row::{RowRef, TableRowType};
use crate::session::ScanHandle;
use crate::store::GroupCursor;

/// Scan every row of a group in hkey order, or only the rows of one of its
/// tables.
#[derive(Debug, Clone)]
pub struct GroupScan {
    group: Group,
    table: Option<TableRowType>,
}

impl GroupScan {
    pub fn new(catalog: &Catalog, group: &str, table: Option<TableRowType>) -> Result<Self> {
        let group = catalog
            .group(group)
            .ok_or_else(|| CatalogError::NoSuchGroup(group.to_string()))?
            .clone();
        if let Some(table) = &table {
            table_in_group(catalog, table.table, &group.name)?;
        }
        Ok(GroupScan { group, table })
    }

    /// Table the scan registers against for DDL tracking.
    fn scan_table(&self) -> TableId {
        match &self.table {
            Some(t) => t.table,
            None => self.group.group_table,
        }
    }
}

impl Operator for GroupScan {
    fn name(&self) -> &'static str {
        "GroupScan"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        let config = ctx.config();
        let inner = ctx
            .store()
            .new_group_cursor(&self.group, config.scan_batch_hint as usize)?;
        Ok(Box::new(GroupScanCursor {
            scan: self.clone(),
            ctx: ctx.clone(),
            inner,
            lifecycle: CursorLifecycle::new("GroupScan", config.cursor_lifecycle_checks),
            handle: None,
        }))
    }
}

impl Explainable for GroupScan {
    fn explain_entry(&self) -> ExplainEntry {
        let ent = ExplainEntry::new(self.name()).with_value("group", &self.group.name);
        match &self.table {
            Some(table) => ent.with_value("table", table),
            None => ent,
        }
    }
}

#[derive(Debug)]
struct GroupScanCursor {
    scan: GroupScan,
    ctx: QueryContext,
    inner: Box<dyn GroupCursor>,
    lifecycle: CursorLifecycle,
    handle: Option<Arc<ScanHandle>>,
}

impl GroupScanCursor {
    fn release_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.set_closed();
        }
    }
}

impl Cursor for GroupScanCursor {
    fn open(&mut self, _bindings: &QueryBindings) -> Result<()> {
        self.lifecycle.check_open()?;
        self.inner.open()?;
        self.handle = self
            .ctx
            .session()
            .map(|s| s.scans().register(self.scan.scan_table()));
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
            return Err(ExecutionError::DdlModified(self.scan.scan_table()));
        }

        loop {
            let Some(row) = self.inner.next()? else {
                self.close()?;
                return Ok(None);
            };
            let wanted = match &self.scan.table {
                Some(table) => row.row_type().table_id() == table.table,
                None => true,
            };
            if wanted {
                if self.ctx.config().log_execution {
                    trace!(row = %row, "GroupScan: yield");
                }
                return Ok(Some(row));
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.lifecycle.check_close()?;
        if self.lifecycle.state() == CursorState::Idle {
            return Ok(());
        }
        self.inner.close()?;
        self.release_handle();
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
