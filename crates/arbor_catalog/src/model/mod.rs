//! Catalog entities.
//!
//! Entities reference each other by table id or by name, never by pointer.
//! The catalog owns every entity.

pub mod catalog;
pub mod column;
pub mod group;
pub mod index;
pub mod join;
pub mod sequence;
pub mod table;
pub mod view;
