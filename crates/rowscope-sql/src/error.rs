//! Resolution failure taxonomy
//!
//! Every hard failure aborts the whole top-level query, including
//! any in-progress subquery recursion, and surfaces as one of these
//! variants. "No catalog database matches" is deliberately NOT here:
//! that outcome is the soft [`crate::Inference::Unresolvable`] value.

/// A hard resolution failure for one statement
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The input is not parseable, is not a single statement, or is
    /// not a plain SELECT
    #[error("failed to parse query `{query}`: {message}")]
    MalformedQuery { query: String, message: String },

    /// A FROM/JOIN item is neither a table nor a subquery
    #[error("expected a table or subquery, got `{item}`")]
    UnexpectedShape { item: String },

    /// A subquery in FROM/JOIN position has no alias
    #[error("subquery `{item}` in FROM/JOIN position requires an alias")]
    MissingAlias { item: String },

    /// No output name can be derived for a select-list expression
    #[error("cannot derive an output column name for `{expr}`")]
    MissingColumnName { expr: String },

    /// A referenced table does not exist in the chosen database
    #[error("table '{table}' not found in database '{database}'")]
    UnknownTable { table: String, database: String },

    /// A table qualifier is not a known alias
    #[error("unknown table alias '{alias}'")]
    UnknownAlias { alias: String },

    /// An unqualified column was found in none of the visible aliases
    #[error("cannot find a table for column '{column}' (visible aliases: {candidates})")]
    UnresolvedTable { column: String, candidates: String },

    /// A column does not exist in the resolved alias's table
    #[error("column '{column}' not found in table (alias) '{table}'")]
    UnknownColumn { column: String, table: String },

    /// Parenthesis/subquery nesting exceeded the guard; checked on
    /// the token stream before any parse attempt
    #[error("query nesting exceeds {limit} levels")]
    SubqueryNestingTooDeep { limit: usize },
}
