use arbor_catalog::{CatalogError, TableId};

use crate::cursor::CursorState;

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Cursor {cursor} cannot {operation} while {state}")]
    CursorLifecycleViolation {
        cursor: &'static str,
        operation: &'static str,
        state: CursorState,
    },

    #[error("Query canceled")]
    QueryCanceled,

    #[error("Table {0} was modified by DDL while a scan was open")]
    DdlModified(TableId),

    #[error("Expected row of type {expected}, got {got}")]
    UnexpectedRowType { expected: String, got: String },

    #[error("Malformed hkey: {0}")]
    MalformedHKey(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T, E = ExecutionError> = std::result::Result<T, E>;

macro_rules! internal {
    ($($arg:tt)*) => {
        crate::errors::ExecutionError::Internal(std::format!($($arg)*))
    };
}
pub(crate) use internal;
