//! Static schema catalog
//!
//! This crate handles:
//! - The structured schema description format (databases, tables,
//!   columns with textual type and nullable flag)
//! - Building the read-only [`SchemaCatalog`] the resolver queries

pub mod catalog;
pub mod description;

pub use catalog::{CatalogError, DatabaseSchema, SchemaCatalog};
pub use description::{CatalogDescription, ColumnDescription, DatabaseDescription, TableDescription};
