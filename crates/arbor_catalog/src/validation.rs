//! Invariant checks run on a catalog before it's frozen.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Debug;

use crate::errors::{CatalogError, Result, ValidationFailures};
use crate::id_allocator::IS_TABLE_ID_OFFSET;
use crate::model::catalog::Catalog;
use crate::model::index::Index;
use crate::model::table::UserTable;
use crate::name::{TableName, is_information_schema};
use crate::{IndexId, TableId};

/// Collects violations from a validation run.
#[derive(Debug, Default)]
pub struct ValidationOutput {
    failures: Vec<CatalogError>,
}

impl ValidationOutput {
    pub fn report(&mut self, failure: CatalogError) {
        self.failures.push(failure);
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[CatalogError] {
        &self.failures
    }

    /// Ok if nothing was reported, otherwise a composite validation error.
    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Validation(ValidationFailures(self.failures)))
        }
    }
}

pub trait CatalogValidation: Debug + Sync {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput);
}

/// Validations a catalog must pass before being published.
pub static LIVE_VALIDATIONS: &[&dyn CatalogValidation] = &[
    &TableIdsUnique,
    &TableIdsInRange,
    &ColumnPositionsContiguous,
    &ColumnNamesUnique,
    &JoinToOneParent,
    &JoinColumnsExist,
    &JoinColumnTypesMatch,
    &JoinToParentPrimaryKey,
    &GroupForest,
    &IndexIdsUniqueInGroup,
    &IndexColumnsExist,
    &PrimaryKeyUniqueNotNull,
    &TreeNamesUnique,
    &SequenceNamesUnique,
    &ReservedSchema,
];

/// Run every validation, collecting all violations.
pub fn validate(catalog: &Catalog, validations: &[&dyn CatalogValidation]) -> ValidationOutput {
    let mut output = ValidationOutput::default();
    for validation in validations {
        validation.validate(catalog, &mut output);
    }
    output
}

#[derive(Debug)]
pub struct TableIdsUnique;

impl CatalogValidation for TableIdsUnique {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        let mut seen: HashMap<TableId, &TableName> = HashMap::new();
        let all = catalog
            .user_tables()
            .map(|t| (t.id, &t.name))
            .chain(catalog.group_tables().map(|t| (t.id, &t.name)));
        for (id, name) in all {
            if let Some(first) = seen.insert(id, name) {
                output.report(CatalogError::DuplicateTableId {
                    id,
                    first: first.clone(),
                    second: name.clone(),
                });
            }
        }
    }
}

#[derive(Debug)]
pub struct TableIdsInRange;

impl CatalogValidation for TableIdsInRange {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        let all = catalog
            .user_tables()
            .map(|t| (t.id, &t.name))
            .chain(catalog.group_tables().map(|t| (t.id, &t.name)));
        for (id, name) in all {
            let in_range = if name.in_information_schema() {
                id >= IS_TABLE_ID_OFFSET
            } else {
                id > 0 && id < IS_TABLE_ID_OFFSET
            };
            if !in_range {
                output.report(CatalogError::TableIdOutOfRange {
                    table: name.clone(),
                    id,
                });
            }
        }
    }
}

#[derive(Debug)]
pub struct ColumnPositionsContiguous;

impl CatalogValidation for ColumnPositionsContiguous {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        let tables = catalog
            .user_tables()
            .map(|t| (&t.name, &t.columns))
            .chain(catalog.views().map(|v| (&v.name, &v.columns)));
        for (name, columns) in tables {
            for (expected, col) in columns.iter().enumerate() {
                if col.position != expected {
                    output.report(CatalogError::ColumnPositionGap {
                        table: name.clone(),
                        column: col.name.clone(),
                        position: col.position,
                        expected,
                    });
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct ColumnNamesUnique;

impl CatalogValidation for ColumnNamesUnique {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        let tables = catalog
            .user_tables()
            .map(|t| (&t.name, &t.columns))
            .chain(catalog.views().map(|v| (&v.name, &v.columns)));
        for (name, columns) in tables {
            let mut seen = HashSet::new();
            for col in columns {
                if !seen.insert(col.name.as_str()) {
                    output.report(CatalogError::DuplicateColumnName {
                        table: name.clone(),
                        column: col.name.clone(),
                    });
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct JoinToOneParent;

impl CatalogValidation for JoinToOneParent {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        for table in catalog.user_tables() {
            if table.candidate_parent_joins.len() > 1 {
                output.report(CatalogError::JoinToMultipleParents(table.name.clone()));
            }
        }
    }
}

#[derive(Debug)]
pub struct JoinColumnsExist;

impl CatalogValidation for JoinColumnsExist {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        for join in catalog.joins() {
            let (Some(parent), Some(child)) = (
                catalog.user_table_by_id(join.parent),
                catalog.user_table_by_id(join.child),
            ) else {
                output.report(CatalogError::Internal(format!(
                    "join {} references a missing table",
                    join.name
                )));
                continue;
            };
            for jc in &join.columns {
                if parent.column(&jc.parent).is_none() || child.column(&jc.child).is_none() {
                    output.report(CatalogError::JoinToWrongColumns {
                        child: child.name.clone(),
                        child_column: jc.child.clone(),
                        parent: parent.name.clone(),
                        parent_column: jc.parent.clone(),
                    });
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct JoinColumnTypesMatch;

impl CatalogValidation for JoinColumnTypesMatch {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        for join in catalog.joins() {
            let (Some(parent), Some(child)) = (
                catalog.user_table_by_id(join.parent),
                catalog.user_table_by_id(join.child),
            ) else {
                continue;
            };
            for jc in &join.columns {
                let (Some(pcol), Some(ccol)) = (parent.column(&jc.parent), child.column(&jc.child))
                else {
                    continue;
                };
                if !pcol.datatype.is_compatible_with(&ccol.datatype) {
                    output.report(CatalogError::JoinTypeMismatch {
                        join: join.name.clone(),
                        parent_column: pcol.name.clone(),
                        parent_type: pcol.datatype.to_string(),
                        child_column: ccol.name.clone(),
                        child_type: ccol.datatype.to_string(),
                    });
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct JoinToParentPrimaryKey;

impl CatalogValidation for JoinToParentPrimaryKey {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        for join in catalog.joins() {
            let Some(parent) = catalog.user_table_by_id(join.parent) else {
                continue;
            };
            let pk = parent.primary_key_columns();
            let join_cols: Vec<_> = join.columns.iter().map(|c| c.parent.as_str()).collect();
            if pk.is_empty() || pk != join_cols {
                output.report(CatalogError::JoinToNonPrimaryKey(join.name.clone()));
            }
        }
    }
}

#[derive(Debug)]
pub struct GroupForest;

impl GroupForest {
    fn check_table(catalog: &Catalog, table: &UserTable, output: &mut ValidationOutput) {
        let Some(group_name) = table.group.as_deref() else {
            output.report(CatalogError::InvalidGroupStructure {
                table: table.name.clone(),
                reason: "table is not in a group".to_string(),
            });
            return;
        };
        let Some(group) = catalog.group(group_name) else {
            output.report(CatalogError::InvalidGroupStructure {
                table: table.name.clone(),
                reason: format!("group {group_name} does not exist"),
            });
            return;
        };

        // Cycles are found before any depth is compared.
        let mut chain = vec![table];
        let mut visited = HashSet::from([table.id]);
        let mut current = table;
        while let Some(parent) = catalog.parent_table(current) {
            if !visited.insert(parent.id) {
                output.report(CatalogError::GroupCycle(table.name.clone()));
                return;
            }
            chain.push(parent);
            current = parent;
        }

        if let Some(stranger) = chain
            .iter()
            .find(|t| t.group.as_deref() != Some(group_name))
        {
            output.report(CatalogError::InvalidGroupStructure {
                table: table.name.clone(),
                reason: format!("ancestor {} is in another group", stranger.name),
            });
            return;
        }
        for pair in chain.windows(2) {
            let (child, parent) = (pair[0], pair[1]);
            if child.depth.is_none() || child.depth != parent.depth.map(|d| d + 1) {
                output.report(CatalogError::InvalidGroupStructure {
                    table: child.name.clone(),
                    reason: "depth inconsistent with parent".to_string(),
                });
                return;
            }
        }

        if group.root != Some(current.id) {
            output.report(CatalogError::InvalidGroupStructure {
                table: table.name.clone(),
                reason: format!("does not reach root of group {group_name}"),
            });
        } else if current.depth != Some(0) {
            output.report(CatalogError::InvalidGroupStructure {
                table: current.name.clone(),
                reason: "root depth must be 0".to_string(),
            });
        }
    }
}

impl CatalogValidation for GroupForest {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        for table in catalog.user_tables() {
            Self::check_table(catalog, table, output);
        }
    }
}

#[derive(Debug)]
pub struct IndexIdsUniqueInGroup;

impl CatalogValidation for IndexIdsUniqueInGroup {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        for group in catalog.groups() {
            let mut seen: BTreeMap<IndexId, &Index> = BTreeMap::new();
            let indexes = catalog
                .group_members(&group.name)
                .flat_map(|t| t.indexes.values())
                .chain(group.indexes.values());
            for index in indexes {
                if let Some(first) = seen.insert(index.id, index) {
                    output.report(CatalogError::DuplicateIndexId {
                        group: group.name.clone(),
                        id: index.id,
                        first: first.name.clone(),
                        second: index.name.clone(),
                    });
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct IndexColumnsExist;

impl CatalogValidation for IndexColumnsExist {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        let indexes = catalog
            .user_tables()
            .flat_map(|t| t.indexes.values())
            .chain(catalog.groups().flat_map(|g| g.indexes.values()));
        for index in indexes {
            for ic in index.columns() {
                match catalog.user_table_by_id(ic.table) {
                    Some(table) => {
                        if table.column(&ic.column).is_none() {
                            output.report(CatalogError::NoSuchColumn {
                                table: table.name.clone(),
                                column: ic.column.clone(),
                            });
                        }
                    }
                    None => output.report(CatalogError::NoSuchTableId(ic.table)),
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct PrimaryKeyUniqueNotNull;

impl CatalogValidation for PrimaryKeyUniqueNotNull {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        for table in catalog.user_tables() {
            let pks: Vec<_> = table
                .indexes
                .values()
                .filter(|idx| idx.is_primary_key())
                .collect();
            if pks.len() > 1 {
                output.report(CatalogError::MultiplePrimaryKeys(table.name.clone()));
            }
            for pk in pks {
                if !pk.unique {
                    output.report(CatalogError::PrimaryKeyNotUnique(table.name.clone()));
                }
                for ic in pk.columns() {
                    if table.column(&ic.column).is_some_and(|c| c.nullable) {
                        output.report(CatalogError::PrimaryKeyNullable {
                            table: table.name.clone(),
                            column: ic.column.clone(),
                        });
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct TreeNamesUnique;

impl CatalogValidation for TreeNamesUnique {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        // Root tables share their group's tree, so only groups are counted.
        let names = catalog
            .groups()
            .flat_map(|g| {
                std::iter::once(g.tree_name.as_str())
                    .chain(g.indexes.values().map(|idx| idx.tree_name.as_str()))
            })
            .chain(
                catalog
                    .user_tables()
                    .flat_map(|t| t.indexes.values().map(|idx| idx.tree_name.as_str())),
            )
            .chain(catalog.sequences().filter_map(|s| s.tree_name.as_deref()));

        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                output.report(CatalogError::DuplicateTreeName(name.to_string()));
            }
        }
    }
}

#[derive(Debug)]
pub struct SequenceNamesUnique;

impl CatalogValidation for SequenceNamesUnique {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        let mut seen = HashSet::new();
        for seq in catalog.sequences() {
            if !seen.insert(seq.name.table()) {
                output.report(CatalogError::DuplicateSequenceName(seq.name.to_string()));
            }
        }
    }
}

#[derive(Debug)]
pub struct ReservedSchema;

impl CatalogValidation for ReservedSchema {
    fn validate(&self, catalog: &Catalog, output: &mut ValidationOutput) {
        for group in catalog.groups() {
            let mut kinds = catalog
                .group_members(&group.name)
                .map(|t| is_information_schema(t.name.schema()));
            if let Some(first) = kinds.next() {
                if kinds.any(|k| k != first) {
                    output.report(CatalogError::ReservedSchemaViolation(group.name.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CatalogBuilder;
    use crate::definition::{ColumnDefinition, IdentityDefinition};
    use crate::model::index::IndexConstraint;
    use crate::model::join::{Join, JoinColumn};
    use crate::model::sequence::Sequence;
    use crate::name_generator::NameGenerator;
    use arbor_types::DataType;

    /// Builds `test.t(id INT NOT NULL PRIMARY KEY)` as a lone group.
    fn valid_builder() -> (CatalogBuilder, TableId) {
        let mut builder = CatalogBuilder::new(Catalog::new(), NameGenerator::new());
        let id = builder.user_table(&TableName::new("test", "t")).unwrap();
        builder
            .column(id, &ColumnDefinition::new("id", DataType::Int32, false))
            .unwrap();
        builder
            .index(id, "PRIMARY", true, IndexConstraint::Primary)
            .unwrap();
        builder
            .index_column(id, "PRIMARY", "id", 0, true, None)
            .unwrap();
        builder.create_group("t", "test", "_group_t").unwrap();
        builder.add_table_to_group("t", id).unwrap();
        builder.grouping_is_complete().unwrap();
        (builder, id)
    }

    #[test]
    fn valid_catalog_passes() {
        let (builder, _) = valid_builder();
        let output = validate(builder.catalog(), LIVE_VALIDATIONS);
        assert!(output.is_empty(), "{:?}", output.failures());
    }

    #[test]
    fn nullable_primary_key() {
        let (builder, id) = valid_builder();
        let mut catalog = builder.into_catalog();
        catalog.user_table_mut(id).unwrap().columns[0].nullable = true;

        let err = validate(&catalog, LIVE_VALIDATIONS)
            .into_result()
            .unwrap_err();
        let CatalogError::Validation(failures) = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(
            vec![CatalogError::PrimaryKeyNullable {
                table: TableName::new("test", "t"),
                column: "id".to_string(),
            }],
            failures.0
        );
    }

    #[test]
    fn ungrouped_table() {
        let mut builder = CatalogBuilder::new(Catalog::new(), NameGenerator::new());
        builder.user_table(&TableName::new("test", "t")).unwrap();
        let output = validate(builder.catalog(), &[&GroupForest]);
        assert!(matches!(
            output.failures(),
            [CatalogError::InvalidGroupStructure { .. }]
        ));
    }

    #[test]
    fn user_table_in_system_range() {
        let (mut builder, _) = valid_builder();
        builder.set_table_id_offset(IS_TABLE_ID_OFFSET + 5);
        builder.user_table(&TableName::new("test", "big")).unwrap();

        let output = validate(builder.catalog(), &[&TableIdsInRange]);
        assert_eq!(
            &[CatalogError::TableIdOutOfRange {
                table: TableName::new("test", "big"),
                id: IS_TABLE_ID_OFFSET + 5,
            }],
            output.failures()
        );
    }

    /// Frozen catalog with `test.p(id)` as root of group `p`, child
    /// `test.c(id, pid)` joined on `pid`, and sequence `test.seq`.
    fn frozen_family() -> (Catalog, TableId, TableId) {
        let mut builder = CatalogBuilder::new(Catalog::new(), NameGenerator::new());
        let p = builder.user_table(&TableName::new("test", "p")).unwrap();
        let c = builder.user_table(&TableName::new("test", "c")).unwrap();
        for (table, columns) in [(p, &["id"][..]), (c, &["id", "pid"][..])] {
            for (pos, col) in columns.iter().enumerate() {
                let mut def = ColumnDefinition::new(*col, DataType::Int32, false);
                def.position = pos;
                builder.column(table, &def).unwrap();
            }
            builder
                .index(table, "PRIMARY", true, IndexConstraint::Primary)
                .unwrap();
            builder
                .index_column(table, "PRIMARY", "id", 0, true, None)
                .unwrap();
        }
        builder.index(c, "by_pid", false, IndexConstraint::Key).unwrap();
        builder.index_column(c, "by_pid", "pid", 0, true, None).unwrap();
        builder.join_tables("c_p", p, c).unwrap();
        builder.join_columns("c_p", "id", "pid").unwrap();
        builder.create_group("p", "test", "_group_p").unwrap();
        builder.add_table_to_group("p", p).unwrap();
        builder.add_join_to_group("p", "c_p").unwrap();
        builder
            .sequence(TableName::new("test", "seq"), &IdentityDefinition::default())
            .unwrap();
        builder.grouping_is_complete().unwrap();

        let mut catalog = builder.into_catalog();
        catalog.freeze();
        (catalog, p, c)
    }

    /// Writable copy of the family. The frozen original passes every check.
    fn unfrozen_family() -> (Catalog, TableId, TableId) {
        let (frozen, p, c) = frozen_family();
        let output = validate(&frozen, LIVE_VALIDATIONS);
        assert!(output.is_empty(), "{:?}", output.failures());
        assert!(frozen.clone().user_table_mut(p).is_err());
        (frozen.clone_unfrozen(), p, c)
    }

    #[test]
    fn duplicate_user_table_id() {
        let (mut catalog, p, c) = unfrozen_family();
        catalog.user_table_mut(c).unwrap().id = p;

        let output = validate(&catalog, &[&TableIdsUnique]);
        assert_eq!(
            &[CatalogError::DuplicateTableId {
                id: p,
                first: TableName::new("test", "p"),
                second: TableName::new("test", "c"),
            }],
            output.failures()
        );
    }

    #[test]
    fn user_table_reusing_group_table_id() {
        let (mut catalog, _, c) = unfrozen_family();
        let group_table = catalog.group("p").unwrap().group_table;
        catalog.user_table_mut(c).unwrap().id = group_table;

        let output = validate(&catalog, &[&TableIdsUnique]);
        assert_eq!(
            &[CatalogError::DuplicateTableId {
                id: group_table,
                first: TableName::new("test", "c"),
                second: TableName::new("test", "_group_p"),
            }],
            output.failures()
        );
    }

    #[test]
    fn column_position_gap() {
        let (mut catalog, _, c) = unfrozen_family();
        catalog.user_table_mut(c).unwrap().columns[1].position = 2;

        let output = validate(&catalog, &[&ColumnPositionsContiguous]);
        assert_eq!(
            &[CatalogError::ColumnPositionGap {
                table: TableName::new("test", "c"),
                column: "pid".to_string(),
                position: 2,
                expected: 1,
            }],
            output.failures()
        );
    }

    #[test]
    fn join_column_type_mismatch() {
        let (mut catalog, _, c) = unfrozen_family();
        catalog.user_table_mut(c).unwrap().columns[1].datatype = DataType::Utf8;

        let output = validate(&catalog, &[&JoinColumnTypesMatch]);
        assert_eq!(
            &[CatalogError::JoinTypeMismatch {
                join: "c_p".to_string(),
                parent_column: "id".to_string(),
                parent_type: "INT".to_string(),
                child_column: "pid".to_string(),
                child_type: "VARCHAR".to_string(),
            }],
            output.failures()
        );

        // Integer widths are compatible with each other.
        catalog.user_table_mut(c).unwrap().columns[1].datatype = DataType::Int64;
        assert!(validate(&catalog, &[&JoinColumnTypesMatch]).is_empty());
    }

    #[test]
    fn join_cycle() {
        let (mut catalog, p, c) = unfrozen_family();
        catalog
            .add_join(Join {
                name: "p_c".to_string(),
                parent: c,
                child: p,
                columns: vec![JoinColumn::new("pid", "id")],
                group: Some("p".to_string()),
            })
            .unwrap();
        catalog.user_table_mut(p).unwrap().parent_join = Some("p_c".to_string());

        let output = validate(&catalog, &[&GroupForest]);
        assert_eq!(
            &[
                CatalogError::GroupCycle(TableName::new("test", "p")),
                CatalogError::GroupCycle(TableName::new("test", "c")),
            ],
            output.failures()
        );
    }

    #[test]
    fn second_root_in_group() {
        let (mut catalog, _, c) = unfrozen_family();
        let child = catalog.user_table_mut(c).unwrap();
        child.parent_join = None;
        child.depth = Some(0);

        let output = validate(&catalog, &[&GroupForest]);
        assert_eq!(
            &[CatalogError::InvalidGroupStructure {
                table: TableName::new("test", "c"),
                reason: "does not reach root of group p".to_string(),
            }],
            output.failures()
        );
    }

    #[test]
    fn child_depth_out_of_step() {
        let (mut catalog, _, c) = unfrozen_family();
        catalog.user_table_mut(c).unwrap().depth = Some(3);

        let output = validate(&catalog, &[&GroupForest]);
        assert_eq!(
            &[CatalogError::InvalidGroupStructure {
                table: TableName::new("test", "c"),
                reason: "depth inconsistent with parent".to_string(),
            }],
            output.failures()
        );
    }

    #[test]
    fn duplicate_index_id_in_group() {
        let (mut catalog, p, c) = unfrozen_family();
        let pk_id = catalog.user_table_by_id(p).unwrap().indexes["PRIMARY"].id;
        catalog
            .user_table_mut(c)
            .unwrap()
            .indexes
            .get_mut("by_pid")
            .unwrap()
            .id = pk_id;

        let output = validate(&catalog, &[&IndexIdsUniqueInGroup]);
        assert_eq!(
            &[CatalogError::DuplicateIndexId {
                group: "p".to_string(),
                id: pk_id,
                first: "PRIMARY".to_string(),
                second: "by_pid".to_string(),
            }],
            output.failures()
        );
    }

    #[test]
    fn duplicate_tree_name() {
        let (mut catalog, _, c) = unfrozen_family();
        let group_tree = catalog.group("p").unwrap().tree_name.clone();
        catalog
            .user_table_mut(c)
            .unwrap()
            .indexes
            .get_mut("by_pid")
            .unwrap()
            .tree_name = group_tree.clone();

        let output = validate(&catalog, &[&TreeNamesUnique]);
        assert_eq!(
            &[CatalogError::DuplicateTreeName(group_tree)],
            output.failures()
        );
    }

    #[test]
    fn duplicate_sequence_name_across_schemas() {
        let (mut catalog, _, _) = unfrozen_family();
        catalog
            .add_sequence(Sequence {
                name: TableName::new("other", "seq"),
                start: 1,
                increment: 1,
                min: 1,
                max: i64::MAX,
                cycle: false,
                tree_name: None,
            })
            .unwrap();

        // Ordered by name, so the original in `test` is the repeat.
        let output = validate(&catalog, &[&SequenceNamesUnique]);
        assert_eq!(
            &[CatalogError::DuplicateSequenceName("test.seq".to_string())],
            output.failures()
        );
    }

    #[test]
    fn group_mixing_reserved_schema() {
        let (mut catalog, _, c) = unfrozen_family();
        catalog
            .rename_user_table(c, TableName::new("information_schema", "c"))
            .unwrap();

        let output = validate(&catalog, &[&ReservedSchema]);
        assert_eq!(
            &[CatalogError::ReservedSchemaViolation("p".to_string())],
            output.failures()
        );
    }

    #[test]
    fn all_validations_run() {
        // Two independent problems both get reported.
        let (builder, id) = valid_builder();
        let mut catalog = builder.into_catalog();
        let table = catalog.user_table_mut(id).unwrap();
        table.columns[0].nullable = true;
        table.columns[0].position = 3;

        let output = validate(&catalog, LIVE_VALIDATIONS);
        assert_eq!(2, output.failures().len());
    }
}
