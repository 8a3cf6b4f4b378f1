mod common;

use std::sync::Arc;

use arbor_catalog::CatalogError;
use arbor_catalog::definition::{IndexColumnDefinition, IndexDefinition, IndexTargetDefinition, NewIndex};
use arbor_catalog::model::index::IndexConstraint;
use arbor_execution::ExecutionError;
use arbor_execution::bindings::QueryBindings;
use arbor_execution::context::QueryContext;
use arbor_execution::cursor::Cursor;
use arbor_execution::operators::Operator;
use arbor_execution::operators::branch_lookup::{BranchLookupNested, InputPreservation};
use arbor_execution::operators::group_scan::GroupScan;
use arbor_execution::row::RowType;
use arbor_execution::session::Session;
use arbor_execution::store::Store;
use common::{Ddl, name, row_type, setup, write_family};

fn scan_cursor(ddl: &Ddl, session: &Arc<Session>, table: Option<&str>) -> Box<dyn Cursor> {
    let catalog = ddl.get_catalog();
    let store: Arc<dyn Store> = ddl.store().clone();
    let ctx = QueryContext::for_session(store, session.clone());
    let scan = GroupScan::new(&catalog, "parent", table.map(|t| row_type(&catalog, t))).unwrap();
    let mut cursor = scan.cursor(&ctx).unwrap();
    cursor.open(&QueryBindings::new()).unwrap();
    cursor
}

#[test]
fn group_scan_filters_by_table() {
    let (ddl, session) = setup();
    write_family(&ddl, 1, 2, 1, 3);
    write_family(&ddl, 2, 1, 0, 1);

    let mut cursor = scan_cursor(&ddl, &session, Some("child_b"));
    let mut count = 0;
    while let Some(row) = cursor.next().unwrap() {
        assert_eq!("child_b", row.row_type().table_type().name.table());
        count += 1;
    }
    assert_eq!(4, count);
    assert_eq!(0, session.scans().open_scans());

    let mut cursor = scan_cursor(&ddl, &session, None);
    let mut count = 0;
    while cursor.next().unwrap().is_some() {
        count += 1;
    }
    // Two parents, three child_a, two grand, four child_b.
    assert_eq!(11, count);
}

#[test]
fn dropping_table_invalidates_open_scans() {
    logutil::init_test();
    let (ddl, session) = setup();
    write_family(&ddl, 1, 1, 0, 2);

    let mut table_scan = scan_cursor(&ddl, &session, Some("child_b"));
    let mut group_scan = scan_cursor(&ddl, &session, None);
    let mut other_scan = scan_cursor(&ddl, &session, Some("child_a"));
    assert!(table_scan.next().unwrap().is_some());
    assert_eq!(3, session.scans().open_scans());

    ddl.drop_table(&session, &name("child_b")).unwrap();

    let err = table_scan.next().unwrap_err();
    assert!(matches!(err, ExecutionError::DdlModified(_)));
    let err = group_scan.next().unwrap_err();
    assert!(matches!(err, ExecutionError::DdlModified(_)));
    assert!(other_scan.next().unwrap().is_some());

    // Scans opened after the change are fine.
    let mut fresh = scan_cursor(&ddl, &session, None);
    assert!(fresh.next().unwrap().is_some());
}

#[test]
fn dropping_table_invalidates_open_branch_lookups() {
    let (ddl, session) = setup();
    let parent = write_family(&ddl, 1, 2, 0, 1);

    let catalog = ddl.get_catalog();
    let lookup = BranchLookupNested::new(
        &catalog,
        "parent",
        RowType::Table(row_type(&catalog, "parent")),
        None,
        row_type(&catalog, "child_a"),
        InputPreservation::DiscardInput,
        0,
    )
    .unwrap();
    let store: Arc<dyn Store> = ddl.store().clone();
    let ctx = QueryContext::for_session(store, session.clone());
    let mut bindings = QueryBindings::new();
    bindings.set_row(0, parent);

    let mut cursor = lookup.cursor(&ctx).unwrap();
    cursor.open(&bindings).unwrap();
    assert_eq!(1, session.scans().open_scans());
    assert!(cursor.next().unwrap().is_some());

    ddl.drop_table(&session, &name("child_b")).unwrap();
    let err = cursor.next().unwrap_err();
    assert!(matches!(err, ExecutionError::DdlModified(_)));
    cursor.close().unwrap();
    assert_eq!(0, session.scans().open_scans());

    // Reopening registers a fresh handle.
    cursor.open(&bindings).unwrap();
    let mut count = 0;
    while cursor.next().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(2, count);
}

#[test]
fn closed_scans_are_not_marked() {
    let (ddl, session) = setup();
    write_family(&ddl, 1, 1, 0, 1);

    let mut cursor = scan_cursor(&ddl, &session, Some("child_a"));
    cursor.close().unwrap();
    assert_eq!(0, session.scans().open_scans());
    assert_eq!(
        0,
        session.scans().mark_ddl_modified(
            ddl.get_table_id(&name("child_a")).unwrap(),
            ddl.get_table_id(&name("_group_parent")).unwrap(),
        )
    );
}

#[test]
fn unique_group_index_build_failure_rolls_back() {
    let (ddl, session) = setup();
    write_family(&ddl, 1, 2, 0, 0);
    write_family(&ddl, 2, 2, 0, 0);

    let index = |constraint| NewIndex {
        target: IndexTargetDefinition::Group("parent".to_string()),
        definition: IndexDefinition::new(
            "pid_aid",
            constraint,
            [
                IndexColumnDefinition::new("pid").on_table(name("parent")),
                IndexColumnDefinition::new("pid").on_table(name("child_a")),
            ],
        ),
    };

    // Both child_a rows of a parent share (pid, pid).
    let err = ddl
        .create_indexes(&session, &[index(IndexConstraint::Unique)])
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Store(_)));
    let catalog = ddl.get_catalog();
    assert!(catalog.group("parent").unwrap().indexes.is_empty());

    let created = ddl
        .create_indexes(&session, &[index(IndexConstraint::Key)])
        .unwrap();
    assert_eq!(Some(4), ddl.store().index_keys(&created[0]).map(|k| k.len()));

    ddl.drop_group_indexes(&session, "parent", &["pid_aid"])
        .unwrap();
    assert!(ddl.store().index_keys(&created[0]).is_none());
    let err = ddl
        .drop_group_indexes(&session, "parent", &["pid_aid"])
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::Catalog(CatalogError::NoSuchIndex(_))
    ));
}

#[test]
fn drop_schema_drops_groups_and_rename_keeps_structure() {
    let (ddl, session) = setup();
    write_family(&ddl, 1, 1, 1, 1);

    ddl.rename_table(&session, &name("child_b"), &name("child_c"))
        .unwrap();
    let catalog = ddl.get_catalog();
    assert!(catalog.user_table(&name("child_b")).is_none());
    let child_c = catalog.user_table(&name("child_c")).unwrap();
    assert_eq!(
        "parent",
        catalog.parent_table(child_c).unwrap().name.table()
    );

    let group = catalog.group("parent").unwrap().clone();
    let generation = ddl.get_generation();
    ddl.drop_schema(&session, "test").unwrap();
    assert!(ddl.get_generation() > generation);

    let catalog = ddl.get_catalog();
    assert_eq!(0, catalog.user_tables().count());
    assert!(catalog.group("parent").is_none());
    assert!(ddl.store().rows(&group).is_empty());
    assert_eq!(Vec::<String>::new(), ddl.get_ddls());
}
