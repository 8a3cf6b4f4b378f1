//! Data types and scalar values shared by the catalog, execution, and SQL
//! crates.
pub mod datatype;
pub mod scalar;

pub use datatype::DataType;
pub use scalar::ScalarValue;
