use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CatalogError, Result};

/// Schema holding the system tables.
pub const INFORMATION_SCHEMA: &str = "information_schema";

/// Max length for schema, table, column and index names.
pub const MAX_IDENT_LENGTH: usize = 64;

/// Schema qualified name of a table, group table, sequence or view.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        TableName {
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn in_information_schema(&self) -> bool {
        is_information_schema(&self.schema)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Schema names compare case-insensitively against the reserved schema.
pub fn is_information_schema(schema: &str) -> bool {
    schema.eq_ignore_ascii_case(INFORMATION_SCHEMA)
}

pub fn validate_object_name(name: &str) -> Result<()> {
    if name.len() > MAX_IDENT_LENGTH {
        return Err(CatalogError::InvalidNameLength {
            name: name.to_string(),
            length: name.len(),
            max: MAX_IDENT_LENGTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!("test.t", TableName::new("test", "t").to_string());
    }

    #[test]
    fn reserved_schema() {
        assert!(TableName::new("INFORMATION_SCHEMA", "tables").in_information_schema());
        assert!(!TableName::new("test", "tables").in_information_schema());
    }

    #[test]
    fn long_names_rejected() {
        validate_object_name("t").unwrap();
        let long = "x".repeat(MAX_IDENT_LENGTH + 1);
        assert!(matches!(
            validate_object_name(&long),
            Err(CatalogError::InvalidNameLength { .. })
        ));
    }
}
