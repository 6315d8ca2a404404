//! SQL parsing using sqlparser
//!
//! Thin wrapper with configurable dialect. The resolver only
//! supports one plain `SELECT` per input; everything else (multiple
//! statements, DML/DDL, set operations, CTEs) is reported as a
//! malformed query with the underlying parser diagnostic attached.

use rowscope_core::DialectConfig;
use sqlparser::ast::{Select, SetExpr, Statement};
use sqlparser::dialect::{AnsiDialect, Dialect, GenericDialect, MySqlDialect};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::error::ResolveError;

/// SQL parser with configurable dialect
pub struct SqlParser {
    dialect: Box<dyn Dialect>,
}

impl SqlParser {
    /// Create a new parser with the default (MySQL) dialect
    pub fn new() -> Self {
        Self {
            dialect: Box::new(MySqlDialect {}),
        }
    }

    /// Create a parser for generic permissive SQL
    pub fn generic() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    /// Create a parser for strict ANSI SQL
    pub fn ansi() -> Self {
        Self {
            dialect: Box::new(AnsiDialect {}),
        }
    }

    /// Create a parser from a dialect config
    pub fn from_dialect(dialect: DialectConfig) -> Self {
        match dialect {
            DialectConfig::Mysql => Self::new(),
            DialectConfig::Generic => Self::generic(),
            DialectConfig::Ansi => Self::ansi(),
        }
    }

    /// Parse a query that must be exactly one plain `SELECT`.
    pub fn parse_select(&self, sql: &str) -> Result<Select, ResolveError> {
        let mut statements = Parser::parse_sql(self.dialect.as_ref(), sql).map_err(|e| {
            ResolveError::MalformedQuery {
                query: sql.to_string(),
                message: e.to_string(),
            }
        })?;

        if statements.len() != 1 {
            return Err(ResolveError::MalformedQuery {
                query: sql.to_string(),
                message: format!("expected exactly one statement, found {}", statements.len()),
            });
        }

        let query = match statements.remove(0) {
            Statement::Query(query) => *query,
            other => {
                return Err(ResolveError::MalformedQuery {
                    query: sql.to_string(),
                    message: format!("expected a SELECT statement, found `{}`", other),
                });
            }
        };

        if query.with.is_some() {
            return Err(ResolveError::MalformedQuery {
                query: sql.to_string(),
                message: "common table expressions are not supported".to_string(),
            });
        }

        match *query.body {
            SetExpr::Select(select) => Ok(*select),
            other => Err(ResolveError::MalformedQuery {
                query: sql.to_string(),
                message: format!("expected a plain SELECT, found `{}`", other),
            }),
        }
    }

    /// Tokenize a fragment with this parser's dialect.
    ///
    /// Used for raw-token-stream subquery capture; the resolver never
    /// re-lexes for anything else.
    pub fn tokenize(&self, sql: &str) -> Result<Vec<Token>, ResolveError> {
        Tokenizer::new(self.dialect.as_ref(), sql)
            .tokenize()
            .map_err(|e| ResolveError::MalformedQuery {
                query: sql.to_string(),
                message: e.to_string(),
            })
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}
