//! The read-only schema catalog
//!
//! Ground truth for inference: database → table → column →
//! [`ColumnType`]. Built once from a [`CatalogDescription`] and read
//! by every resolution afterwards; reloading means building a new
//! catalog value, there is no incremental merge.

use rowscope_core::{ColumnMap, ColumnType};
use tracing::info;

use crate::description::CatalogDescription;

/// Catalog build/load errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The description contained zero databases; a configuration
    /// error, since every lookup would be unresolvable
    #[error("no databases configured")]
    EmptyCatalog,

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// One database's tables, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSchema {
    name: String,
    tables: Vec<(String, ColumnMap)>,
}

impl DatabaseSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a table by its stored name
    pub fn table(&self, name: &str) -> Option<&ColumnMap> {
        self.tables
            .iter()
            .find(|(table_name, _)| table_name == name)
            .map(|(_, columns)| columns)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Static map of every known database, table, and column type
///
/// Database order follows the description; the resolver's
/// database-inference step picks the first database whose tables
/// cover a statement's unqualified table names, so order matters.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaCatalog {
    databases: Vec<DatabaseSchema>,
}

impl SchemaCatalog {
    /// Build a catalog from a structured description.
    ///
    /// A database named `information_schema` (any case) has its name
    /// and all its table names lower-cased, matching how MySQL
    /// reports them regardless of the `lower_case_table_names`
    /// setting.
    pub fn load(description: &CatalogDescription) -> Result<Self, CatalogError> {
        if description.databases.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        let mut databases = Vec::with_capacity(description.databases.len());
        let mut table_count = 0usize;

        for database in &description.databases {
            let info_schema = database.name.eq_ignore_ascii_case("information_schema");
            let name = if info_schema {
                database.name.to_lowercase()
            } else {
                database.name.clone()
            };

            let mut tables = Vec::with_capacity(database.tables.len());
            for table in &database.tables {
                let table_name = if info_schema {
                    table.name.to_lowercase()
                } else {
                    table.name.clone()
                };

                let mut columns = ColumnMap::new();
                for column in &table.columns {
                    columns.insert(
                        column.name.clone(),
                        ColumnType::from_sql_type(&column.sql_type, column.nullable),
                    );
                }

                tables.push((table_name, columns));
                table_count += 1;
            }

            databases.push(DatabaseSchema { name, tables });
        }

        info!(
            databases = databases.len(),
            tables = table_count,
            "schema catalog loaded"
        );

        Ok(Self { databases })
    }

    /// Parse a description from JSON and build the catalog in one step
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Self::load(&CatalogDescription::from_json_str(json)?)
    }

    /// Load a description from a JSON file and build the catalog
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, CatalogError> {
        Self::load(&CatalogDescription::from_json_file(path)?)
    }

    /// Databases in declaration order
    pub fn databases(&self) -> impl Iterator<Item = &DatabaseSchema> {
        self.databases.iter()
    }

    /// Look up one database by name
    pub fn database(&self, name: &str) -> Option<&DatabaseSchema> {
        self.databases.iter().find(|db| db.name == name)
    }

    /// Look up a table's columns
    pub fn table(&self, database: &str, table: &str) -> Option<&ColumnMap> {
        self.database(database)?.table(table)
    }

    /// Look up a single column type (case-insensitive on column)
    pub fn lookup(&self, database: &str, table: &str, column: &str) -> Option<&ColumnType> {
        self.table(database, table)?.get(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_catalog() -> SchemaCatalog {
        SchemaCatalog::from_json_str(
            r#"{"databases": [
                {"name": "main", "tables": [
                    {"name": "users", "columns": [
                        {"name": "Id", "type": "int", "nullable": "NO"},
                        {"name": "email", "type": "varchar", "nullable": "YES"}
                    ]}
                ]},
                {"name": "Information_Schema", "tables": [
                    {"name": "TABLES", "columns": [
                        {"name": "TABLE_NAME", "type": "varchar", "nullable": "NO"}
                    ]}
                ]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let result = SchemaCatalog::load(&CatalogDescription::default());
        assert!(matches!(result, Err(CatalogError::EmptyCatalog)));
    }

    #[test]
    fn lookup_is_case_insensitive_on_column() {
        let catalog = test_catalog();

        let column = catalog.lookup("main", "users", "id").unwrap();
        assert_eq!(column, &ColumnType::from_sql_type("int", false));
        assert_eq!(catalog.lookup("main", "users", "ID"), Some(column));
    }

    #[test]
    fn display_case_is_preserved() {
        let catalog = test_catalog();
        let table = catalog.table("main", "users").unwrap();
        assert_eq!(table.names(), vec!["Id", "email"]);
    }

    #[test]
    fn information_schema_is_lowercased_on_load() {
        let catalog = test_catalog();

        assert!(catalog.database("information_schema").is_some());
        assert!(catalog.database("Information_Schema").is_none());
        assert!(catalog.table("information_schema", "tables").is_some());
        assert!(catalog.table("information_schema", "TABLES").is_none());
    }

    #[test]
    fn database_order_follows_description() {
        let catalog = test_catalog();
        let names: Vec<&str> = catalog.databases().map(|db| db.name()).collect();
        assert_eq!(names, vec!["main", "information_schema"]);
    }

    #[test]
    fn nullable_flag_reaches_the_column_type() {
        let catalog = test_catalog();
        assert!(!catalog.lookup("main", "users", "Id").unwrap().is_nullable());
        assert!(catalog.lookup("main", "users", "email").unwrap().is_nullable());
    }
}
