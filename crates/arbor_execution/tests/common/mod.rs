//! Shared fixture: group `parent` with children `child_a` and `child_b`, and
//! `grand` under `child_a`.

use std::sync::Arc;

use arbor_catalog::definition::{ColumnDefinition, TableDefinition};
use arbor_catalog::model::table::UserTable;
use arbor_catalog::{Catalog, TableName};
use arbor_execution::ddl::{DdlFunctions, MemorySchemaManager};
use arbor_execution::hkey::HKey;
use arbor_execution::row::{Row, RowRef, RowType, TableRowType};
use arbor_execution::session::Session;
use arbor_execution::store::memory::MemoryStore;
use arbor_types::{DataType, ScalarValue};

pub type Ddl = DdlFunctions<MemorySchemaManager, MemoryStore>;

pub fn name(table: &str) -> TableName {
    TableName::new("test", table)
}

fn child(table: &str, key: &str, parent: &str, parent_key: &str) -> TableDefinition {
    TableDefinition::new(name(table))
        .with_column(ColumnDefinition::new(key, DataType::Int32, false))
        .with_column(ColumnDefinition::new(parent_key, DataType::Int32, true))
        .with_primary_key([key])
        .with_parent_join(name(parent), [(parent_key, parent_key)])
}

pub fn setup() -> (Ddl, Arc<Session>) {
    let ddl = DdlFunctions::new(
        Arc::new(MemorySchemaManager::new()),
        Arc::new(MemoryStore::new()),
    );
    let session = Arc::new(Session::default());
    let parent = TableDefinition::new(name("parent"))
        .with_column(ColumnDefinition::new("pid", DataType::Int32, false))
        .with_primary_key(["pid"]);
    ddl.create_table(&session, &parent).unwrap();
    ddl.create_table(&session, &child("child_a", "aid", "parent", "pid"))
        .unwrap();
    ddl.create_table(&session, &child("child_b", "bid", "parent", "pid"))
        .unwrap();
    ddl.create_table(&session, &child("grand", "gid", "child_a", "aid"))
        .unwrap();
    (ddl, session)
}

pub fn table<'a>(catalog: &'a Catalog, table: &str) -> &'a UserTable {
    catalog.user_table(&name(table)).unwrap()
}

pub fn row_type(catalog: &Catalog, t: &str) -> TableRowType {
    TableRowType::for_table(table(catalog, t))
}

pub fn ordinal(catalog: &Catalog, t: &str) -> u32 {
    table(catalog, t).ordinal.unwrap()
}

fn int(v: i32) -> ScalarValue {
    ScalarValue::Int32(v)
}

/// Rows written for one parent: `a` rows of child_a each with `g` grand rows,
/// and `b` rows of child_b. Returns the parent row.
pub fn write_family(ddl: &Ddl, pid: i32, a: i32, g: i32, b: i32) -> RowRef {
    let catalog = ddl.get_catalog();
    let group = catalog.group("parent").unwrap();
    let store = ddl.store();

    let write = |t: &str, values: Vec<ScalarValue>, hkey: HKey| {
        let row = Row::new(RowType::Table(row_type(&catalog, t)), values, hkey);
        store.write_row(group, row.clone()).unwrap();
        Arc::new(row)
    };

    let parent_key = HKey::root(ordinal(&catalog, "parent"), [int(pid)]);
    let parent = write("parent", vec![int(pid)], parent_key.clone());
    for aid in 0..a {
        let aid = pid * 100 + aid;
        let a_key = parent_key.child(ordinal(&catalog, "child_a"), [int(aid)]);
        write("child_a", vec![int(aid), int(pid)], a_key.clone());
        for gid in 0..g {
            let gid = aid * 100 + gid;
            let g_key = a_key.child(ordinal(&catalog, "grand"), [int(gid)]);
            write("grand", vec![int(gid), int(aid)], g_key);
        }
    }
    for bid in 0..b {
        let bid = pid * 100 + bid;
        let b_key = parent_key.child(ordinal(&catalog, "child_b"), [int(bid)]);
        write("child_b", vec![int(bid), int(pid)], b_key);
    }
    parent
}
