//! Logical plans and expressions along with the rewrites run over them before
//! execution.

pub mod errors;
pub mod expr;
pub mod functions;
pub mod optimizer;
pub mod plan;

pub use errors::{CastError, Result, SqlError};
