//! Structured schema description input format
//!
//! A description is produced by dumping `information_schema.COLUMNS`
//! for the databases an application targets: a list of databases,
//! each with tables, each with columns carrying the textual column
//! type and the `IS_NULLABLE` yes/no flag.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

use crate::catalog::CatalogError;

/// Top-level schema description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDescription {
    #[serde(default)]
    pub databases: Vec<DatabaseDescription>,
}

/// One database in a description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseDescription {
    pub name: String,

    #[serde(default)]
    pub tables: Vec<TableDescription>,
}

/// One table in a description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,

    #[serde(default)]
    pub columns: Vec<ColumnDescription>,
}

/// One column in a description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,

    /// Textual column type as reported by the database
    /// (`int`, `varchar`, `enum('A','B')`, ...)
    #[serde(rename = "type")]
    pub sql_type: String,

    /// `IS_NULLABLE` flag, serialized as YES/NO
    #[serde(
        deserialize_with = "yes_no_to_bool",
        serialize_with = "bool_to_yes_no",
        default
    )]
    pub nullable: bool,
}

impl CatalogDescription {
    /// Parse a description from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(json).map_err(|e| CatalogError::ParseError(e.to_string()))
    }

    /// Parse a description from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::IoError(e.to_string()))?;
        Self::from_json_str(&contents)
    }
}

fn yes_no_to_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.eq_ignore_ascii_case("yes"))
}

fn bool_to_yes_no<S>(nullable: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(if *nullable { "YES" } else { "NO" })
}
