use arbor_types::DataType;
use serde::{Deserialize, Serialize};

use crate::errors::{CatalogError, Result};
use crate::name::TableName;

/// Charsets columns and tables may declare.
pub const SUPPORTED_CHARSETS: &[&str] = &["utf8", "utf8mb4", "latin1", "ascii", "binary"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharsetAndCollation {
    pub charset: String,
    pub collation: Option<String>,
}

impl CharsetAndCollation {
    pub fn new(charset: impl Into<String>, collation: Option<String>) -> Self {
        CharsetAndCollation {
            charset: charset.into(),
            collation,
        }
    }

    /// Check the charset is one we can store. `target` names the column or
    /// table for the error.
    pub fn check_supported(&self, target: &str) -> Result<()> {
        if SUPPORTED_CHARSETS
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&self.charset))
        {
            Ok(())
        } else {
            Err(CatalogError::UnsupportedCharset {
                target: target.to_string(),
                charset: self.charset.clone(),
            })
        }
    }
}

/// Link from a column to the sequence generating its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRef {
    pub sequence: TableName,
    /// GENERATED BY DEFAULT (true) or GENERATED ALWAYS (false).
    pub default_identity: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// 0-based position in the owning table.
    pub position: usize,
    pub datatype: DataType,
    /// Max length for string types.
    pub type_param1: Option<u64>,
    pub type_param2: Option<u64>,
    pub nullable: bool,
    pub charset: Option<CharsetAndCollation>,
    pub initial_auto_increment: Option<i64>,
    pub identity: Option<IdentityRef>,
    max_storage_size: u64,
    prefix_size: u64,
}

impl Column {
    pub fn new(
        name: impl Into<String>,
        position: usize,
        datatype: DataType,
        type_param1: Option<u64>,
        type_param2: Option<u64>,
        nullable: bool,
    ) -> Self {
        Column {
            name: name.into(),
            position,
            datatype,
            type_param1,
            type_param2,
            nullable,
            charset: None,
            initial_auto_increment: None,
            identity: None,
            max_storage_size: datatype.max_storage_size(type_param1),
            prefix_size: datatype.prefix_size(type_param1),
        }
    }

    pub fn max_storage_size(&self) -> u64 {
        self.max_storage_size
    }

    pub fn prefix_size(&self) -> u64 {
        self.prefix_size
    }

    /// SQL type as it would appear in DDL, e.g. `VARCHAR(10)`.
    pub fn type_description(&self) -> String {
        match (self.type_param1, self.type_param2) {
            (Some(p1), Some(p2)) => format!("{}({p1},{p2})", self.datatype),
            (Some(p1), None) if self.datatype.is_string() => format!("{}({p1})", self.datatype),
            _ => self.datatype.to_string(),
        }
    }
}
