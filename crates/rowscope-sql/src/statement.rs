//! Statement decomposition
//!
//! [`StatementResolver`] turns one `SELECT` into a
//! [`ResolvedStatement`]: the alias → table/subquery map, the set of
//! table names referenced without a database prefix, and left/right
//! join membership. Which database unqualified names belong to is
//! not decided here — that happens at column-derivation time, once
//! the whole statement tree is known.

use std::collections::{BTreeSet, HashSet};

use sqlparser::ast::{JoinOperator, Select, TableFactor};
use sqlparser::tokenizer::Token;
use tracing::trace;

use crate::error::ResolveError;
use crate::parser::SqlParser;

/// Nesting guard, enforced on the token stream before parsing.
///
/// The parser descends through the whole nested text in one call, so
/// a post-parse check would come too late: moderately deep nesting
/// exhausts the call stack before sqlparser's own recursion limit
/// trips. The cap is therefore kept well inside what the parser can
/// walk on a default-sized thread stack.
pub const MAX_SUBQUERY_DEPTH: usize = 8;

/// What an alias is bound to
#[derive(Debug, Clone)]
pub enum AliasTarget {
    /// A physical table: `"table"` or `"database.table"`
    Table(String),

    /// A nested subquery, resolved recursively
    Statement(Box<ResolvedStatement>),
}

/// A decomposed `SELECT` statement
///
/// Aliases are kept in declaration order (wildcard expansion depends
/// on it) and are unique within one statement's scope; re-using an
/// alias rebinds it. Aliases inherited from the parent scope come
/// first, so correlated subqueries see outer names.
#[derive(Debug, Clone)]
pub struct ResolvedStatement {
    /// alias → table reference or nested statement
    pub aliases: Vec<(String, AliasTarget)>,

    /// Table names referenced without an explicit database, for the
    /// whole statement tree (children merge upward)
    pub unqualified_tables: BTreeSet<String>,

    /// Aliases reached via LEFT JOIN
    pub left_joined: HashSet<String>,

    /// Aliases reached via RIGHT JOIN
    pub right_joined: HashSet<String>,

    /// The underlying select list and from-list, for column derivation
    pub select: Select,

    /// The original query text
    pub query: String,
}

impl ResolvedStatement {
    /// Look up an alias binding
    pub fn alias(&self, name: &str) -> Option<&AliasTarget> {
        self.aliases
            .iter()
            .find(|(alias, _)| alias == name)
            .map(|(_, target)| target)
    }
}

/// Builds [`ResolvedStatement`]s from query text
pub struct StatementResolver {
    parser: SqlParser,
}

impl StatementResolver {
    pub fn new(parser: SqlParser) -> Self {
        Self { parser }
    }

    /// Decompose a query, seeding the alias scope with
    /// `known_aliases` (the parent scope for correlated subqueries).
    pub fn resolve(
        &self,
        query: &str,
        known_aliases: &[(String, AliasTarget)],
    ) -> Result<ResolvedStatement, ResolveError> {
        self.resolve_at(query, known_aliases, 0)
    }

    fn resolve_at(
        &self,
        query: &str,
        known_aliases: &[(String, AliasTarget)],
        depth: usize,
    ) -> Result<ResolvedStatement, ResolveError> {
        if depth >= MAX_SUBQUERY_DEPTH {
            return Err(ResolveError::SubqueryNestingTooDeep {
                limit: MAX_SUBQUERY_DEPTH,
            });
        }

        // bound nesting on the raw tokens before handing the text to
        // the parser, which recurses through every nested level in one
        // call and cannot be depth-limited after the fact
        let tokens = self.parser.tokenize(query)?;
        if depth + paren_depth(&tokens) > MAX_SUBQUERY_DEPTH {
            return Err(ResolveError::SubqueryNestingTooDeep {
                limit: MAX_SUBQUERY_DEPTH,
            });
        }

        let select = self.parser.parse_select(query)?;

        let mut aliases: Vec<(String, AliasTarget)> = known_aliases.to_vec();
        let mut unqualified_tables = BTreeSet::new();
        let mut left_joined = HashSet::new();
        let mut right_joined = HashSet::new();

        for item in &select.from {
            self.add_factor(&item.relation, &mut aliases, &mut unqualified_tables, depth)?;

            for join in &item.joins {
                let alias =
                    self.add_factor(&join.relation, &mut aliases, &mut unqualified_tables, depth)?;

                match &join.join_operator {
                    JoinOperator::LeftOuter(_) => {
                        left_joined.insert(alias);
                    }
                    JoinOperator::RightOuter(_) => {
                        right_joined.insert(alias);
                    }
                    _ => {}
                }
            }
        }

        Ok(ResolvedStatement {
            aliases,
            unqualified_tables,
            left_joined,
            right_joined,
            select,
            query: query.to_string(),
        })
    }

    /// Classify one FROM/JOIN item and bind its alias.
    ///
    /// Returns the alias the item was bound under.
    fn add_factor(
        &self,
        factor: &TableFactor,
        aliases: &mut Vec<(String, AliasTarget)>,
        unqualified_tables: &mut BTreeSet<String>,
        depth: usize,
    ) -> Result<String, ResolveError> {
        match factor {
            TableFactor::Table { name, alias, args, .. } => {
                // a table function is neither a table nor a subquery
                if args.is_some() {
                    return Err(ResolveError::UnexpectedShape {
                        item: factor.to_string(),
                    });
                }

                let parts: Vec<&str> = name.0.iter().map(|ident| ident.value.as_str()).collect();
                let (database, table) = match parts.as_slice() {
                    [table] => (None, (*table).to_string()),
                    [database, table] => (Some(*database), (*table).to_string()),
                    _ => {
                        return Err(ResolveError::UnexpectedShape {
                            item: factor.to_string(),
                        });
                    }
                };

                let alias_name = alias
                    .as_ref()
                    .map(|a| a.name.value.clone())
                    .unwrap_or_else(|| table.clone());

                let reference = match database {
                    Some(database) => {
                        let qualified = format!("{}.{}", database, table);
                        if database.eq_ignore_ascii_case("information_schema") {
                            qualified.to_lowercase()
                        } else {
                            qualified
                        }
                    }
                    None => {
                        unqualified_tables.insert(table.clone());
                        table
                    }
                };

                bind_alias(aliases, alias_name.clone(), AliasTarget::Table(reference));
                Ok(alias_name)
            }

            TableFactor::Derived { alias, .. } => {
                let alias_name = alias
                    .as_ref()
                    .map(|a| a.name.value.clone())
                    .ok_or_else(|| ResolveError::MissingAlias {
                        item: factor.to_string(),
                    })?;

                let subquery_text = self.capture_subquery(&factor.to_string())?;
                trace!(alias = %alias_name, subquery = %subquery_text, "captured subquery");

                // the child sees every alias bound so far
                let child = self.resolve_at(&subquery_text, aliases, depth + 1)?;
                unqualified_tables.extend(child.unqualified_tables.iter().cloned());

                bind_alias(
                    aliases,
                    alias_name.clone(),
                    AliasTarget::Statement(Box::new(child)),
                );
                Ok(alias_name)
            }

            other => Err(ResolveError::UnexpectedShape {
                item: other.to_string(),
            }),
        }
    }

    /// Extract the raw text of a subquery from a FROM/JOIN item.
    ///
    /// The scanned text is the re-rendered form of the single
    /// FROM/JOIN item, not the original input: rendering one item in
    /// isolation guarantees the first `SELECT` token belongs to this
    /// item's subquery and not to the enclosing statement.
    ///
    /// Capture starts at the first token whose text equals the
    /// subquery marker (`SELECT`) and runs until the matching close
    /// parenthesis: depth goes up on `(`, down on `)`, and the first
    /// `)` seen at depth zero ends the subquery. The first-match
    /// start is intentional; do not try to be smarter about repeated
    /// marker text.
    fn capture_subquery(&self, item_text: &str) -> Result<String, ResolveError> {
        let tokens = self.parser.tokenize(item_text)?;

        let mut capturing = false;
        let mut bracket_depth = 0usize;
        let mut captured = String::new();

        for token in &tokens {
            if !capturing {
                if token.to_string() == "SELECT" {
                    capturing = true;
                    bracket_depth = 0;
                } else {
                    continue;
                }
            }

            if matches!(token, Token::RParen) {
                if bracket_depth == 0 {
                    break;
                }
                bracket_depth -= 1;
            }

            captured.push_str(&token.to_string());

            if matches!(token, Token::LParen) {
                bracket_depth += 1;
            }
        }

        if !capturing {
            return Err(ResolveError::UnexpectedShape {
                item: item_text.to_string(),
            });
        }

        Ok(captured)
    }
}

/// Deepest parenthesis nesting in a token stream
fn paren_depth(tokens: &[Token]) -> usize {
    let mut open = 0usize;
    let mut deepest = 0usize;
    for token in tokens {
        match token {
            Token::LParen => {
                open += 1;
                deepest = deepest.max(open);
            }
            Token::RParen => open = open.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

/// Bind an alias, rebinding in place if the name is already taken
fn bind_alias(aliases: &mut Vec<(String, AliasTarget)>, name: String, target: AliasTarget) {
    if let Some(entry) = aliases.iter_mut().find(|(alias, _)| *alias == name) {
        entry.1 = target;
    } else {
        aliases.push((name, target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(query: &str) -> ResolvedStatement {
        StatementResolver::new(SqlParser::new())
            .resolve(query, &[])
            .unwrap()
    }

    #[test]
    fn table_alias_defaults_to_table_name() {
        let stmt = resolve("SELECT * FROM users");

        assert_eq!(stmt.aliases.len(), 1);
        assert!(matches!(
            stmt.alias("users"),
            Some(AliasTarget::Table(t)) if t == "users"
        ));
        assert!(stmt.unqualified_tables.contains("users"));
    }

    #[test]
    fn explicit_database_is_kept_and_not_unqualified() {
        let stmt = resolve("SELECT * FROM shop.orders o");

        assert!(matches!(
            stmt.alias("o"),
            Some(AliasTarget::Table(t)) if t == "shop.orders"
        ));
        assert!(stmt.unqualified_tables.is_empty());
    }

    #[test]
    fn information_schema_reference_is_lowercased() {
        let stmt = resolve("SELECT * FROM INFORMATION_SCHEMA.TABLES t");

        assert!(matches!(
            stmt.alias("t"),
            Some(AliasTarget::Table(t)) if t == "information_schema.tables"
        ));
    }

    #[test]
    fn join_membership_by_keyword() {
        let stmt = resolve(
            "SELECT * FROM a LEFT JOIN b ON a.id = b.id RIGHT JOIN c ON b.id = c.id JOIN d ON c.id = d.id",
        );

        assert!(stmt.left_joined.contains("b"));
        assert!(stmt.right_joined.contains("c"));
        assert!(!stmt.left_joined.contains("d"));
        assert!(!stmt.right_joined.contains("d"));
    }

    #[test]
    fn join_records_alias_not_table_name() {
        let stmt = resolve("SELECT * FROM a LEFT JOIN b other ON a.id = other.id");
        assert!(stmt.left_joined.contains("other"));
        assert!(!stmt.left_joined.contains("b"));
    }

    #[test]
    fn subquery_requires_alias() {
        let result = StatementResolver::new(SqlParser::new())
            .resolve("SELECT * FROM (SELECT id FROM users)", &[]);
        assert!(matches!(result, Err(ResolveError::MissingAlias { .. })));
    }

    #[test]
    fn subquery_resolves_recursively() {
        let stmt = resolve("SELECT * FROM (SELECT id FROM users) u");

        let child = match stmt.alias("u") {
            Some(AliasTarget::Statement(child)) => child,
            other => panic!("expected nested statement, got {:?}", other),
        };
        assert!(child.unqualified_tables.contains("users"));
        // child names merge upward
        assert!(stmt.unqualified_tables.contains("users"));
    }

    #[test]
    fn subquery_inherits_parent_aliases() {
        let stmt = resolve("SELECT * FROM orders o JOIN (SELECT id FROM users) u ON o.id = u.id");

        let child = match stmt.alias("u") {
            Some(AliasTarget::Statement(child)) => child,
            other => panic!("expected nested statement, got {:?}", other),
        };
        assert!(child.alias("o").is_some());
    }

    #[test]
    fn nested_parentheses_are_balanced_in_capture() {
        let stmt = resolve("SELECT * FROM (SELECT COUNT(id) AS n FROM users WHERE (id > 1)) c");

        let child = match stmt.alias("c") {
            Some(AliasTarget::Statement(child)) => child,
            other => panic!("expected nested statement, got {:?}", other),
        };
        assert!(child.query.contains("COUNT"));
        assert!(child.unqualified_tables.contains("users"));
    }

    #[test]
    fn rebinding_an_alias_keeps_one_entry() {
        let stmt = resolve("SELECT * FROM single JOIN single");
        assert_eq!(stmt.aliases.len(), 1);
    }

    fn nested_query(levels: usize) -> String {
        let mut query = String::from("SELECT 1");
        for i in 0..levels {
            query = format!("SELECT * FROM ({}) t{}", query, i);
        }
        query
    }

    #[test]
    fn nesting_past_the_cap_is_rejected_before_parsing() {
        let query = nested_query(MAX_SUBQUERY_DEPTH + 1);

        let result = StatementResolver::new(SqlParser::new()).resolve(&query, &[]);
        assert!(matches!(
            result,
            Err(ResolveError::SubqueryNestingTooDeep { limit }) if limit == MAX_SUBQUERY_DEPTH
        ));
    }

    #[test]
    fn nesting_under_the_cap_still_resolves() {
        let query = nested_query(MAX_SUBQUERY_DEPTH - 1);

        let stmt = resolve(&query);
        let outermost = format!("t{}", MAX_SUBQUERY_DEPTH - 2);
        assert!(matches!(
            stmt.alias(&outermost),
            Some(AliasTarget::Statement(_))
        ));
    }
}
