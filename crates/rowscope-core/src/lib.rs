//! Rowscope Core
//!
//! Core value types shared by the catalog and the SQL resolver:
//! the semantic column-type union and the ordered column map that
//! every inference result is expressed in.

pub mod config;
pub mod schema;

pub use config::{Config, ConfigError, DialectConfig};
pub use schema::{ColumnMap, ColumnType, Scalar};
