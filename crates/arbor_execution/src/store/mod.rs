//! Storage seen by operators and DDL.
//!
//! A store keeps one ordered tree of rows per group, keyed by hkey and named
//! by the group's tree name, plus one tree per index.

pub mod memory;

use std::fmt::Debug;

use arbor_catalog::model::group::Group;
use arbor_catalog::model::index::Index;
use arbor_catalog::model::table::UserTable;
use arbor_catalog::{Catalog, TableId};

use crate::cursor::CursorState;
use crate::errors::Result;
use crate::hkey::HKey;
use crate::row::RowRef;

pub trait Store: Debug + Send + Sync {
    /// Remove the group tree and every index tree of `table`'s group. Used when
    /// dropping a root table without children.
    fn remove_trees(&self, catalog: &Catalog, group: &Group, table: &UserTable) -> Result<()>;

    /// Remove all rows in the group and all entries of its indexes.
    fn truncate_group(&self, catalog: &Catalog, group: &Group) -> Result<()>;

    /// Remove the rows of one table along with their index entries.
    fn truncate_table(&self, catalog: &Catalog, group: &Group, table: TableId) -> Result<()>;

    /// Create and populate index trees. Deferred indexes are created empty.
    fn build_indexes(&self, catalog: &Catalog, indexes: &[Index], defer: bool) -> Result<()>;

    fn delete_indexes(&self, indexes: &[Index]) -> Result<()>;

    /// Cursor over a group's rows in hkey order. `batch_hint` is how many rows
    /// the cursor may fetch from storage at once.
    fn new_group_cursor(&self, group: &Group, batch_hint: usize) -> Result<Box<dyn GroupCursor>>;
}

/// Cursor over the rows of a group.
///
/// An unbound cursor returns every row in the group. After `rebind(hkey,
/// false)` it returns only the row at `hkey`; after `rebind(hkey, true)` it
/// returns that row and every row under it.
pub trait GroupCursor: Debug + Send {
    /// Position the cursor. Only allowed while idle.
    fn rebind(&mut self, hkey: HKey, deep: bool) -> Result<()>;

    fn open(&mut self) -> Result<()>;

    fn next(&mut self) -> Result<Option<RowRef>>;

    fn close(&mut self) -> Result<()>;

    fn destroy(&mut self) -> Result<()>;

    fn state(&self) -> CursorState;

    fn is_destroyed(&self) -> bool {
        self.state() == CursorState::Destroyed
    }
}
