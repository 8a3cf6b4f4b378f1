pub mod builder;
pub mod ddl_text;
pub mod definition;
pub mod errors;
pub mod id_allocator;
pub mod merge;
pub mod model;
pub mod mutate;
pub mod name;
pub mod name_generator;
pub mod validation;

pub use errors::{CatalogError, Result};
pub use model::catalog::Catalog;
pub use name::{INFORMATION_SCHEMA, TableName};

/// Identifier of a user table or a group table. Unique across the catalog.
pub type TableId = u32;

/// Identifier of an index. Unique within a group.
pub type IndexId = u32;
