//! Execution layer over hierarchical group storage.
//!
//! Operators produce cursors that read rows from a [`store::Store`] in hkey
//! order. DDL changes are applied through [`ddl::DdlFunctions`], which keeps the
//! published catalog and the store in step.

pub mod bindings;
pub mod config;
pub mod context;
pub mod cursor;
pub mod ddl;
pub mod errors;
pub mod explain;
pub mod hkey;
pub mod operators;
pub mod row;
pub mod session;
pub mod store;

pub use errors::{ExecutionError, Result};
