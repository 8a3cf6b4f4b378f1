use std::collections::BTreeSet;

use tracing::warn;

use crate::errors::{Result, internal};
use crate::model::catalog::Catalog;
use crate::name::is_information_schema;
use crate::{IndexId, TableId};

/// First id handed out to user tables. 0 is reserved as a marker value.
pub const USER_TABLE_ID_OFFSET: TableId = 1;

/// First id handed out to information schema tables.
pub const IS_TABLE_ID_OFFSET: TableId = 1_000_000_000;

/// Allocates table ids from the user and information schema ranges.
///
/// Ids handed out are unique across both ranges.
#[derive(Debug, Clone)]
pub struct TableIdAllocator {
    user: BTreeSet<TableId>,
    system: BTreeSet<TableId>,
}

impl Default for TableIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl TableIdAllocator {
    pub fn new() -> Self {
        TableIdAllocator {
            user: [USER_TABLE_ID_OFFSET - 1].into(),
            system: [IS_TABLE_ID_OFFSET - 1].into(),
        }
    }

    /// Seed with every user table id and group table id in the catalog.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut alloc = Self::new();
        for table in catalog.user_tables() {
            let is_system = is_information_schema(table.name.schema());
            alloc.insert(table.id, is_system);
            let group_table = table
                .group
                .as_deref()
                .and_then(|g| catalog.group(g))
                .map(|g| g.group_table);
            if let Some(id) = group_table {
                alloc.insert(id, is_system);
            }
        }
        alloc
    }

    pub fn insert(&mut self, id: TableId, is_system: bool) {
        if is_system {
            self.system.insert(id);
        } else {
            self.user.insert(id);
        }
    }

    /// Get the next id from the requested range, skipping anything in use in
    /// either range.
    pub fn next_id(&mut self, is_system: bool) -> Result<TableId> {
        let set = if is_system { &self.system } else { &self.user };
        // Sets always hold their sentinel.
        let last = set.last().copied().unwrap_or(if is_system {
            IS_TABLE_ID_OFFSET - 1
        } else {
            USER_TABLE_ID_OFFSET - 1
        });

        let mut next = last
            .checked_add(1)
            .ok_or_else(|| internal!("table id space exhausted"))?;
        while self.user.contains(&next) || self.system.contains(&next) {
            next = next
                .checked_add(1)
                .ok_or_else(|| internal!("table id space exhausted"))?;
        }

        if is_system {
            if next < IS_TABLE_ID_OFFSET {
                return Err(internal!("id {next} too small for information schema table"));
            }
        } else if next >= IS_TABLE_ID_OFFSET {
            warn!(id = next, "user table id unexpectedly large");
        }

        self.insert(next, is_system);
        Ok(next)
    }
}

/// First index id to use for new indexes in a group: one past the largest
/// index id of any table index or group index in the group. 1 if the group
/// doesn't exist.
pub fn index_id_offset(catalog: &Catalog, group: &str) -> IndexId {
    let Some(group_ent) = catalog.group(group) else {
        return 1;
    };

    let table_ids = catalog
        .group_members(group)
        .flat_map(|t| t.indexes.values().map(|idx| idx.id));
    let group_ids = group_ent.indexes.values().map(|idx| idx.id);

    table_ids
        .chain(group_ids)
        .map(|id| id + 1)
        .fold(1, IndexId::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_and_system_ranges_skip_each_other() {
        let mut alloc = TableIdAllocator::new();
        for id in [1, 2, 3] {
            alloc.insert(id, false);
        }
        alloc.insert(IS_TABLE_ID_OFFSET, true);

        assert_eq!(4, alloc.next_id(false).unwrap());
        assert_eq!(IS_TABLE_ID_OFFSET + 1, alloc.next_id(true).unwrap());
    }

    #[test]
    fn first_ids() {
        let mut alloc = TableIdAllocator::new();
        assert_eq!(USER_TABLE_ID_OFFSET, alloc.next_id(false).unwrap());
        assert_eq!(IS_TABLE_ID_OFFSET, alloc.next_id(true).unwrap());
    }

    #[test]
    fn strictly_increasing() {
        let mut alloc = TableIdAllocator::new();
        let mut prev = 0;
        for _ in 0..50 {
            let id = alloc.next_id(false).unwrap();
            assert!(id > prev);
            prev = id;
        }
    }

    #[test]
    fn user_id_in_system_set_is_skipped() {
        // A system id sitting in the user range is never handed out again.
        let mut alloc = TableIdAllocator::new();
        alloc.insert(1, false);
        alloc.insert(2, true);
        assert_eq!(3, alloc.next_id(false).unwrap());
    }

    #[test]
    fn index_offset_for_missing_group() {
        assert_eq!(1, index_id_offset(&Catalog::new(), "nope"));
    }
}
