//! SQL statement decomposition and column-type inference
//!
//! This crate handles:
//! - Parsing a query into a single SELECT AST ([`parser`])
//! - Resolving table/subquery aliases and join membership
//!   ([`statement`])
//! - Deriving the output-column → type mapping against a
//!   [`rowscope_catalog::SchemaCatalog`] ([`resolver`])
//!
//! The entry point for hosts is [`ColumnTypeResolver::infer_columns`]:
//! it returns an ordered name → type mapping, the soft
//! [`Inference::Unresolvable`] outcome when no catalog database
//! covers the statement's tables, or a hard [`ResolveError`].

pub mod error;
pub mod parser;
pub mod resolver;
pub mod statement;

pub use error::ResolveError;
pub use parser::SqlParser;
pub use resolver::{ColumnTypeResolver, Inference};
pub use statement::{AliasTarget, ResolvedStatement, StatementResolver, MAX_SUBQUERY_DEPTH};
