//! End-to-end inference tests
//!
//! Exercise the full pipeline (parse → statement decomposition →
//! column-type derivation) against an in-memory catalog fixture.

use pretty_assertions::assert_eq;
use rowscope_catalog::SchemaCatalog;
use rowscope_core::{ColumnMap, ColumnType, Scalar};
use rowscope_sql::{ColumnTypeResolver, Inference, ResolveError};

fn fixture_catalog() -> SchemaCatalog {
    SchemaCatalog::from_json_str(
        r#"{"databases": [
            {"name": "main", "tables": [
                {"name": "basic_types", "columns": [
                    {"name": "t_int", "type": "int", "nullable": "NO"},
                    {"name": "t_varchar", "type": "varchar", "nullable": "NO"},
                    {"name": "t_char", "type": "char", "nullable": "NO"},
                    {"name": "t_text", "type": "text", "nullable": "NO"},
                    {"name": "t_enumABC", "type": "enum('A','B','C')", "nullable": "NO"},
                    {"name": "t_nullable", "type": "varchar", "nullable": "YES"}
                ]},
                {"name": "single", "columns": [
                    {"name": "id", "type": "int", "nullable": "NO"},
                    {"name": "value", "type": "varchar", "nullable": "YES"}
                ]}
            ]},
            {"name": "information_schema", "tables": [
                {"name": "TABLES", "columns": [
                    {"name": "TABLE_NAME", "type": "varchar", "nullable": "NO"},
                    {"name": "TABLE_ROWS", "type": "bigint", "nullable": "YES"}
                ]}
            ]}
        ]}"#,
    )
    .unwrap()
}

fn infer(query: &str) -> ColumnMap {
    let catalog = fixture_catalog();
    let resolver = ColumnTypeResolver::new(&catalog);
    match resolver.infer_columns(query).unwrap() {
        Inference::Resolved(columns) => columns,
        Inference::Unresolvable => panic!("expected a resolved mapping for `{}`", query),
    }
}

fn enum_abc(nullable: bool) -> ColumnType {
    ColumnType::from_sql_type("enum('A','B','C')", nullable)
}

#[test]
fn numeric_literal_with_alias() {
    let out = infer("SELECT 1 as data");

    assert_eq!(out.names(), vec!["data"]);
    assert_eq!(out.get("data"), Some(&ColumnType::numeric(false)));
}

#[test]
fn bare_null_literal() {
    let out = infer("SELECT NULL");

    assert_eq!(out.names(), vec!["NULL"]);
    assert_eq!(out.get("NULL"), Some(&ColumnType::null()));
}

#[test]
fn string_columns_are_non_nullable_strings() {
    let out = infer("SELECT t_varchar, t_char, t_text FROM basic_types");

    assert_eq!(out.names(), vec!["t_varchar", "t_char", "t_text"]);
    for name in ["t_varchar", "t_char", "t_text"] {
        let column_type = out.get(name).unwrap();
        assert_eq!(column_type.scalars(), &[Scalar::String], "{}", name);
    }
}

#[test]
fn left_join_widens_only_the_joined_side() {
    let out = infer(
        "SELECT bt.t_enumABC, bt2.t_enumABC joined FROM basic_types bt LEFT JOIN basic_types bt2",
    );

    assert_eq!(out.get("t_enumABC"), Some(&enum_abc(false)));
    assert_eq!(out.get("joined"), Some(&enum_abc(true)));
}

#[test]
fn right_join_widens_the_other_side() {
    let out = infer(
        "SELECT bt.t_enumABC, bt2.t_enumABC joined FROM basic_types bt RIGHT JOIN basic_types bt2",
    );

    assert_eq!(out.get("t_enumABC"), Some(&enum_abc(true)));
    assert_eq!(out.get("joined"), Some(&enum_abc(false)));
}

#[test]
fn wildcard_self_join_expands_each_column_once() {
    let out = infer("SELECT * FROM single INNER JOIN single");

    assert_eq!(out.names(), vec!["id", "value"]);
}

#[test]
fn qualified_wildcard_expands_one_alias() {
    let out = infer("SELECT bt.* FROM basic_types bt JOIN single s");

    assert_eq!(
        out.names(),
        vec!["t_int", "t_varchar", "t_char", "t_text", "t_enumABC", "t_nullable"]
    );
}

#[test]
fn unknown_table_is_unresolvable_not_an_error() {
    let catalog = fixture_catalog();
    let resolver = ColumnTypeResolver::new(&catalog);

    let outcome = resolver.infer_columns("SELECT * FROM unknown").unwrap();
    assert_eq!(outcome, Inference::Unresolvable);
}

#[test]
fn unknown_column_names_column_and_candidate() {
    let catalog = fixture_catalog();
    let resolver = ColumnTypeResolver::new(&catalog);

    let error = resolver
        .infer_columns("SELECT bt.t_missing FROM basic_types bt")
        .unwrap_err();

    match error {
        ResolveError::UnknownColumn { column, table } => {
            assert_eq!(column, "t_missing");
            assert_eq!(table, "bt");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn subquery_in_from_resolves_recursively() {
    let out = infer("SELECT s.t_int FROM (SELECT t_int FROM basic_types) s");

    assert_eq!(out.names(), vec!["t_int"]);
    assert_eq!(out.get("t_int"), Some(&ColumnType::numeric(false)));
}

#[test]
fn left_joined_subquery_is_widened_like_a_table() {
    let out = infer(
        "SELECT s.t_int FROM basic_types bt LEFT JOIN (SELECT t_int FROM basic_types) s",
    );

    assert_eq!(out.get("t_int"), Some(&ColumnType::numeric(true)));
}

#[test]
fn right_joined_subquery_widens_the_other_side() {
    let out = infer(
        "SELECT bt.t_int, s.t_int sub_int FROM basic_types bt RIGHT JOIN (SELECT t_int FROM basic_types) s",
    );

    assert_eq!(out.get("t_int"), Some(&ColumnType::numeric(true)));
    assert_eq!(out.get("sub_int"), Some(&ColumnType::numeric(false)));
}

#[test]
fn wildcard_over_subquery_alias() {
    let out = infer("SELECT * FROM (SELECT t_int, t_nullable FROM basic_types) s");

    assert_eq!(out.names(), vec!["t_int", "t_nullable"]);
    assert!(out.get("t_nullable").unwrap().is_nullable());
}

#[test]
fn enum_column_survives_subquery_and_alias() {
    let out = infer("SELECT sub.t_enumABC FROM (SELECT t_enumABC FROM basic_types) sub");

    assert_eq!(out.get("t_enumABC"), Some(&enum_abc(false)));
}

#[test]
fn information_schema_lookup_is_case_folded() {
    let out = infer("SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES");

    assert_eq!(out.names(), vec!["TABLE_NAME"]);
    assert_eq!(
        out.get("TABLE_NAME").unwrap().scalars(),
        &[Scalar::String]
    );
}

#[test]
fn mixed_literals_and_columns_keep_select_order() {
    let out = infer("SELECT t_int, NULL, 'x' AS tag, COUNT(t_int) n FROM basic_types");

    assert_eq!(out.names(), vec!["t_int", "NULL", "tag", "n"]);
    assert_eq!(out.get("tag"), Some(&ColumnType::literal("x")));
    assert_eq!(out.get("n"), Some(&ColumnType::numeric(false)));
}

#[test]
fn malformed_query_reports_the_parser_diagnostic() {
    let catalog = fixture_catalog();
    let resolver = ColumnTypeResolver::new(&catalog);

    let error = resolver.infer_columns("SELEC t_int FROM basic_types").unwrap_err();
    match error {
        ResolveError::MalformedQuery { query, .. } => {
            assert!(query.contains("SELEC"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
