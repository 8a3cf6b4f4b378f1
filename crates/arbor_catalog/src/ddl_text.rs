//! DDL text generated from catalog tables.

use std::fmt::Write as _;

use crate::model::catalog::Catalog;
use crate::model::index::IndexConstraint;
use crate::model::table::UserTable;

fn quote(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// `CREATE TABLE` statement recreating `table`, including its grouping foreign
/// key when it has a parent.
pub fn create_table_statement(catalog: &Catalog, table: &UserTable) -> String {
    let mut parts: Vec<String> = Vec::new();

    for col in &table.columns {
        let mut part = format!("{} {}", quote(&col.name), col.type_description());
        if let Some(charset) = &col.charset {
            let _ = write!(part, " CHARACTER SET {}", charset.charset);
            if let Some(collation) = &charset.collation {
                let _ = write!(part, " COLLATE {collation}");
            }
        }
        if !col.nullable {
            part.push_str(" NOT NULL");
        }
        if let Some(identity) = &col.identity {
            if identity.default_identity {
                part.push_str(" GENERATED BY DEFAULT AS IDENTITY");
            } else {
                part.push_str(" GENERATED ALWAYS AS IDENTITY");
            }
        }
        if col.initial_auto_increment.is_some() {
            part.push_str(" AUTO_INCREMENT");
        }
        parts.push(part);
    }

    let mut indexes: Vec<_> = table.indexes.values().collect();
    // PRIMARY first, the rest by id.
    indexes.sort_by_key(|idx| (!idx.is_primary_key(), idx.id));
    for index in indexes {
        let columns = index
            .columns()
            .iter()
            .map(|c| {
                let mut s = quote(&c.column);
                if let Some(len) = c.indexed_length {
                    let _ = write!(s, "({len})");
                }
                if !c.ascending {
                    s.push_str(" DESC");
                }
                s
            })
            .collect::<Vec<_>>()
            .join(",");
        let part = match index.constraint {
            IndexConstraint::Primary => format!("PRIMARY KEY({columns})"),
            IndexConstraint::Unique => format!("UNIQUE {}({columns})", quote(&index.name)),
            IndexConstraint::Key | IndexConstraint::ForeignKey => {
                format!("KEY {}({columns})", quote(&index.name))
            }
        };
        parts.push(part);
    }

    if let (Some(join), Some(parent)) = (catalog.parent_join(table), catalog.parent_table(table)) {
        let child_cols = join
            .columns
            .iter()
            .map(|c| quote(&c.child))
            .collect::<Vec<_>>()
            .join(",");
        let parent_cols = join
            .columns
            .iter()
            .map(|c| quote(&c.parent))
            .collect::<Vec<_>>()
            .join(",");
        let parent_name = if parent.name.schema() == table.name.schema() {
            quote(parent.name.table())
        } else {
            format!(
                "{}.{}",
                quote(parent.name.schema()),
                quote(parent.name.table())
            )
        };
        parts.push(format!(
            "GROUPING FOREIGN KEY({child_cols}) REFERENCES {parent_name}({parent_cols})"
        ));
    }

    let mut stmt = format!(
        "CREATE TABLE {}.{}({}) engine={}",
        quote(table.name.schema()),
        quote(table.name.table()),
        parts.join(", "),
        table.engine,
    );
    if let Some(charset) = &table.charset {
        let _ = write!(stmt, " DEFAULT CHARSET={}", charset.charset);
        if let Some(collation) = &charset.collation {
            let _ = write!(stmt, " COLLATE={collation}");
        }
    }
    stmt
}

/// DDL for every schema and user table, schemas first. Tables are ordered by
/// group and depth so parents always precede their children.
pub fn schema_strings(catalog: &Catalog) -> Vec<String> {
    let mut out: Vec<String> = catalog
        .schemas()
        .into_iter()
        .map(|schema| format!("CREATE SCHEMA IF NOT EXISTS {}", quote(schema)))
        .collect();

    let mut tables: Vec<&UserTable> = catalog.user_tables().collect();
    tables.sort_by(|a, b| {
        (a.group.as_deref(), a.depth, a.id).cmp(&(b.group.as_deref(), b.depth, b.id))
    });
    out.extend(tables.into_iter().map(|t| create_table_statement(catalog, t)));
    out
}

#[cfg(test)]
mod tests {
    use arbor_types::DataType;

    use super::*;
    use crate::definition::{ColumnDefinition, TableDefinition};
    use crate::merge::merge_table;
    use crate::name::TableName;

    #[test]
    fn parent_and_child_text() {
        let parent = TableDefinition::new(TableName::new("test", "parent"))
            .with_column(ColumnDefinition::new("id", DataType::Int32, false))
            .with_column(ColumnDefinition::new("name", DataType::Utf8, true).with_max_length(10))
            .with_primary_key(["id"]);
        let child = TableDefinition::new(TableName::new("test", "child"))
            .with_column(ColumnDefinition::new("cid", DataType::Int32, false))
            .with_column(ColumnDefinition::new("pid", DataType::Int32, true))
            .with_primary_key(["cid"])
            .with_parent_join(TableName::new("test", "parent"), [("id", "pid")]);
        let catalog = merge_table(&Catalog::new(), &parent).unwrap();
        let catalog = merge_table(&catalog, &child).unwrap();

        let got = schema_strings(&catalog);
        let expected = vec![
            "CREATE SCHEMA IF NOT EXISTS `test`".to_string(),
            "CREATE TABLE `test`.`parent`(`id` INT NOT NULL, `name` VARCHAR(10), PRIMARY KEY(`id`)) engine=arbor".to_string(),
            "CREATE TABLE `test`.`child`(`cid` INT NOT NULL, `pid` INT, PRIMARY KEY(`cid`), GROUPING FOREIGN KEY(`pid`) REFERENCES `parent`(`id`)) engine=arbor".to_string(),
        ];
        assert_eq!(expected, got);
    }
}
