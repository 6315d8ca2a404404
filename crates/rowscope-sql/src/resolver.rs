//! Column-type derivation
//!
//! [`ColumnTypeResolver`] walks a [`ResolvedStatement`] top-down
//! against the schema catalog and produces the final output-column
//! → [`ColumnType`] mapping, recursing into subquery aliases.
//!
//! The target database of unqualified table names is inferred here,
//! not at parse time: the first catalog database whose table set
//! covers every unqualified name wins. When none does, the outcome
//! is the soft [`Inference::Unresolvable`] — the schema may simply
//! be outside the catalog — which callers must keep distinct from a
//! hard [`ResolveError`].

use rowscope_catalog::SchemaCatalog;
use rowscope_core::{ColumnMap, ColumnType};
use sqlparser::ast::{
    Expr, FunctionArguments, SelectItem, UnaryOperator, Value,
};
use std::collections::HashSet;
use tracing::debug;

use crate::error::ResolveError;
use crate::parser::SqlParser;
use crate::statement::{AliasTarget, ResolvedStatement, StatementResolver};

/// Outcome of column inference
#[derive(Debug, Clone, PartialEq)]
pub enum Inference {
    /// Ordered output-column → type mapping
    Resolved(ColumnMap),

    /// No catalog database covers the statement's unqualified table
    /// names. Not an error: hosts should skip inference, not report.
    Unresolvable,
}

impl Inference {
    /// The mapping, if resolution succeeded
    pub fn columns(&self) -> Option<&ColumnMap> {
        match self {
            Self::Resolved(columns) => Some(columns),
            Self::Unresolvable => None,
        }
    }
}

/// Derives output column types for `SELECT` statements
pub struct ColumnTypeResolver<'a> {
    catalog: &'a SchemaCatalog,
    statements: StatementResolver,
}

impl<'a> ColumnTypeResolver<'a> {
    /// Create a resolver with the default (MySQL) dialect
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self::with_parser(catalog, SqlParser::new())
    }

    pub fn with_parser(catalog: &'a SchemaCatalog, parser: SqlParser) -> Self {
        Self {
            catalog,
            statements: StatementResolver::new(parser),
        }
    }

    /// Infer the output columns of one `SELECT` statement.
    pub fn infer_columns(&self, query: &str) -> Result<Inference, ResolveError> {
        self.infer_with_scope(query, &[])
    }

    /// Infer with a pre-seeded alias scope (correlated subqueries).
    pub fn infer_with_scope(
        &self,
        query: &str,
        known_aliases: &[(String, AliasTarget)],
    ) -> Result<Inference, ResolveError> {
        let statement = self.statements.resolve(query, known_aliases)?;

        let database = match self.choose_database(&statement) {
            Some(database) => database.to_string(),
            None => {
                debug!(query, "no catalog database covers the statement");
                return Ok(Inference::Unresolvable);
            }
        };
        debug!(query, database = %database, "inferred target database");

        Ok(Inference::Resolved(
            self.columns_for(&statement, &database)?,
        ))
    }

    /// First catalog database whose tables are a superset of the
    /// statement tree's unqualified table names. An empty name set
    /// matches the first database.
    fn choose_database(&self, statement: &ResolvedStatement) -> Option<&str> {
        self.catalog
            .databases()
            .find(|db| {
                statement
                    .unqualified_tables
                    .iter()
                    .all(|table| db.has_table(table))
            })
            .map(|db| db.name())
    }

    /// Derive the column mapping of one statement level.
    fn columns_for(
        &self,
        statement: &ResolvedStatement,
        default_database: &str,
    ) -> Result<ColumnMap, ResolveError> {
        // resolve every alias to a concrete column table
        let mut aliased: Vec<(String, ColumnMap)> = Vec::with_capacity(statement.aliases.len());
        for (alias, target) in &statement.aliases {
            let columns = match target {
                AliasTarget::Table(reference) => {
                    let (database, table) = match reference.split_once('.') {
                        Some((database, table)) => (database, table),
                        None => (default_database, reference.as_str()),
                    };

                    self.catalog.table(database, table).cloned().ok_or_else(|| {
                        ResolveError::UnknownTable {
                            table: table.to_string(),
                            database: database.to_string(),
                        }
                    })?
                }
                AliasTarget::Statement(child) => self.columns_for(child, default_database)?,
            };
            aliased.push((alias.clone(), columns));
        }

        // join-nullability propagation: a left-joined table may be
        // absent entirely, and when any right join exists everything
        // outside the right-joined side is on the optional side
        let has_right_join = !statement.right_joined.is_empty();
        for (alias, columns) in aliased.iter_mut() {
            if statement.left_joined.contains(alias)
                || (has_right_join && !statement.right_joined.contains(alias))
            {
                *columns = widen_nullable(columns);
            }
        }

        let mut out = ColumnMap::new();
        for item in &statement.select.projection {
            match item {
                SelectItem::Wildcard(_) => {
                    expand_wildcard(aliased.iter().map(|(_, t)| t), &mut out);
                }
                SelectItem::QualifiedWildcard(name, _) => {
                    let qualifier = name.to_string();
                    let table = aliased
                        .iter()
                        .find(|(alias, _)| *alias == qualifier)
                        .map(|(_, table)| table)
                        .ok_or_else(|| ResolveError::UnknownAlias {
                            alias: qualifier.clone(),
                        })?;
                    expand_wildcard(std::iter::once(table), &mut out);
                }
                SelectItem::UnnamedExpr(expr) => {
                    self.push_expr(expr, None, &aliased, &mut out)?;
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    self.push_expr(expr, Some(alias.value.as_str()), &aliased, &mut out)?;
                }
            }
        }

        Ok(out)
    }

    /// Type one select-list expression and add it to the output.
    fn push_expr(
        &self,
        expr: &Expr,
        alias: Option<&str>,
        tables: &[(String, ColumnMap)],
        out: &mut ColumnMap,
    ) -> Result<(), ResolveError> {
        let named = |alias: Option<&str>| {
            alias
                .map(str::to_string)
                .unwrap_or_else(|| expr.to_string())
        };

        match expr {
            Expr::Value(Value::Null) => {
                out.insert(alias.unwrap_or("NULL"), ColumnType::null());
            }

            Expr::Value(Value::Number(text, _)) => {
                out.insert(alias.unwrap_or(text.as_str()), ColumnType::numeric(false));
            }

            // a negated/signed numeric literal is still numeric
            Expr::UnaryOp {
                op: UnaryOperator::Minus | UnaryOperator::Plus,
                expr: inner,
            } if matches!(inner.as_ref(), Expr::Value(Value::Number(_, _))) => {
                out.insert(named(alias), ColumnType::numeric(false));
            }

            Expr::Value(Value::SingleQuotedString(text))
            | Expr::Value(Value::DoubleQuotedString(text)) => {
                out.insert(named(alias), ColumnType::literal(text.clone()));
            }

            // ANSI_QUOTES repair: a double-quoted token the parser
            // took for a column reference is really a string literal
            Expr::Identifier(ident) if ident.quote_style == Some('"') => {
                out.insert(named(alias), ColumnType::literal(ident.value.clone()));
            }

            Expr::Identifier(ident) => {
                self.push_column(None, &ident.value, alias, tables, out)?;
            }

            Expr::CompoundIdentifier(idents) if idents.len() >= 2 => {
                let column = &idents[idents.len() - 1].value;
                let qualifier = &idents[idents.len() - 2].value;
                self.push_column(Some(qualifier), column, alias, tables, out)?;
            }

            Expr::Function(func) => {
                let function_name = func.name.to_string();
                let column_type = if matches!(func.args, FunctionArguments::Subquery(_))
                    && !function_name.eq_ignore_ascii_case("EXISTS")
                {
                    // subquery under a non-EXISTS function: the inner
                    // type is deliberately not inlined
                    ColumnType::generic()
                } else {
                    function_return_type(&function_name)
                };
                out.insert(named(alias), column_type);
            }

            Expr::Exists { .. } => {
                out.insert(named(alias), function_return_type("EXISTS"));
            }

            Expr::Subquery(_) | Expr::InSubquery { .. } => {
                out.insert(named(alias), ColumnType::generic());
            }

            Expr::Nested(inner) => {
                self.push_expr(inner, alias, tables, out)?;
            }

            other => {
                return Err(ResolveError::MissingColumnName {
                    expr: other.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Resolve a plain or qualified column reference.
    fn push_column(
        &self,
        qualifier: Option<&str>,
        column: &str,
        alias: Option<&str>,
        tables: &[(String, ColumnMap)],
        out: &mut ColumnMap,
    ) -> Result<(), ResolveError> {
        let (table_alias, table) = match qualifier {
            Some(qualifier) => tables
                .iter()
                .find(|(alias, _)| alias == qualifier)
                .map(|(alias, table)| (alias.as_str(), table))
                .ok_or_else(|| ResolveError::UnknownAlias {
                    alias: qualifier.to_string(),
                })?,
            None => tables
                .iter()
                .find(|(_, table)| table.contains(column))
                .map(|(alias, table)| (alias.as_str(), table))
                .ok_or_else(|| ResolveError::UnresolvedTable {
                    column: column.to_string(),
                    candidates: tables
                        .iter()
                        .map(|(alias, _)| alias.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                })?,
        };

        let column_type =
            table
                .get(column)
                .cloned()
                .ok_or_else(|| ResolveError::UnknownColumn {
                    column: column.to_string(),
                    table: table_alias.to_string(),
                })?;

        out.insert(alias.unwrap_or(column), column_type);
        Ok(())
    }
}

/// A copy of the table with null unioned into every column type
fn widen_nullable(table: &ColumnMap) -> ColumnMap {
    table
        .iter()
        .map(|(name, column_type)| (name.to_string(), column_type.with_nullable()))
        .collect()
}

/// Expand a wildcard over the given tables, deduplicating by
/// case-insensitive column name across the whole expansion (first
/// occurrence wins, original case preserved).
fn expand_wildcard<'t>(tables: impl Iterator<Item = &'t ColumnMap>, out: &mut ColumnMap) {
    let mut seen: HashSet<String> = HashSet::new();
    for table in tables {
        for (name, column_type) in table.iter() {
            if !seen.insert(name.to_lowercase()) {
                continue;
            }
            out.insert(name, column_type.clone());
        }
    }
}

/// Return type of a select-list function call, by name
fn function_return_type(name: &str) -> ColumnType {
    match name.to_uppercase().as_str() {
        // these cannot produce NULL on a non-empty result
        "COUNT" | "EXISTS" => ColumnType::numeric(false),
        // aggregates over zero rows yield NULL
        "AVG" | "MIN" | "MAX" | "SUM" => ColumnType::numeric(true),
        _ => ColumnType::generic(),
    }
}
