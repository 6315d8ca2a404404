//! Semantic column types and ordered column maps
//!
//! A [`ColumnType`] is a small union of scalar value shapes plus an
//! optional null member. It is built once from the textual column
//! type of a schema dump (`int`, `varchar`, `enum('A','B')`, ...)
//! and never mutated afterwards; widening with null always produces
//! a copy.

use serde::{Deserialize, Serialize};
use sqlparser::dialect::MySqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Column types MySQL reports that stringify to numeric strings when
/// fetched through a text-protocol driver.
const NUMERIC_TYPES: &[&str] = &[
    "int",
    "tinyint",
    "smallint",
    "mediumint",
    "bigint",
    "integer",
    "numeric",
    "decimal",
    "float",
    "double",
    "bit",
];

/// One member of a column-type union
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    /// SQL NULL
    Null,

    /// A string that is guaranteed to hold a numeric value
    NumericString,

    /// Any string
    String,

    /// Exactly one known string value (an enum member or a quoted
    /// literal from the select list)
    Literal(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::NumericString => write!(f, "numeric-string"),
            Self::String => write!(f, "string"),
            Self::Literal(value) => write!(f, "'{}'", value),
        }
    }
}

/// The inferred value type of one output column
///
/// Immutable union of [`Scalar`]s. Nullability is represented as a
/// `Null` member of the union, mirroring how the host analyzer's
/// type system models it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    scalars: Vec<Scalar>,
}

impl ColumnType {
    /// Build a type from the textual column type of a schema dump.
    ///
    /// Recognizes the numeric family, `ENUM(...)` definitions (the
    /// quoted members become literal-string union members), and the
    /// special type name `null`. Everything else is a plain string.
    /// The `nullable` flag unions a null member in, except for the
    /// `null` type name which is already null-only.
    pub fn from_sql_type(sql_type: &str, nullable: bool) -> Self {
        let lowered = sql_type.trim().to_ascii_lowercase();

        if lowered == "null" {
            return Self { scalars: vec![Scalar::Null] };
        }

        let mut scalars = if NUMERIC_TYPES.contains(&lowered.as_str()) {
            vec![Scalar::NumericString]
        } else if lowered.starts_with("enum") {
            let mut members = enum_members(sql_type);
            if members.is_empty() {
                members.push(String::new());
            }
            members.into_iter().map(Scalar::Literal).collect()
        } else {
            vec![Scalar::String]
        };

        if nullable {
            scalars.push(Scalar::Null);
        }

        Self { scalars }
    }

    /// The null-only type of a bare `NULL` select item
    pub fn null() -> Self {
        Self { scalars: vec![Scalar::Null] }
    }

    /// Numeric-string type, optionally nullable
    pub fn numeric(nullable: bool) -> Self {
        let mut scalars = vec![Scalar::NumericString];
        if nullable {
            scalars.push(Scalar::Null);
        }
        Self { scalars }
    }

    /// A single-member literal-string type (enum-of-one)
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            scalars: vec![Scalar::Literal(value.into())],
        }
    }

    /// The conservative fallback type: any string or null.
    ///
    /// Used for unknown functions and for scalar subqueries, whose
    /// inner type is deliberately not inlined.
    pub fn generic() -> Self {
        Self {
            scalars: vec![Scalar::String, Scalar::Null],
        }
    }

    /// Whether null is a member of the union
    pub fn is_nullable(&self) -> bool {
        self.scalars.contains(&Scalar::Null)
    }

    /// A copy of this type with null unioned in
    pub fn with_nullable(&self) -> Self {
        let mut widened = self.clone();
        if !widened.is_nullable() {
            widened.scalars.push(Scalar::Null);
        }
        widened
    }

    /// Union members in construction order
    pub fn scalars(&self) -> &[Scalar] {
        &self.scalars
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.scalars.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", rendered.join("|"))
    }
}

/// Pull the quoted member strings out of an `ENUM(...)` type text.
///
/// Runs the SQL tokenizer over the type text and keeps every quoted
/// string token, the same way the schema dump itself quotes them.
fn enum_members(sql_type: &str) -> Vec<String> {
    let dialect = MySqlDialect {};
    let tokens = match Tokenizer::new(&dialect, sql_type).tokenize() {
        Ok(tokens) => tokens,
        Err(_) => return Vec::new(),
    };

    tokens
        .into_iter()
        .filter_map(|token| match token {
            Token::SingleQuotedString(value) | Token::DoubleQuotedString(value) => Some(value),
            _ => None,
        })
        .collect()
}

/// An ordered mapping from output column name to [`ColumnType`]
///
/// Preserves insertion order. Re-inserting an existing name replaces
/// the value but keeps the original position, matching the
/// last-definition-wins convention of SQL column lists. Lookup is
/// case-insensitive, display is case-preserving.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    entries: Vec<(String, ColumnType)>,
}

impl ColumnMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column, overwriting in place if the exact name is
    /// already present
    pub fn insert(&mut self, name: impl Into<String>, column_type: ColumnType) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            entry.1 = column_type;
        } else {
            self.entries.push((name, column_type));
        }
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&ColumnType> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, column_type)| column_type)
    }

    /// Whether a column with this name exists (case-insensitive)
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnType)> {
        self.entries
            .iter()
            .map(|(name, column_type)| (name.as_str(), column_type))
    }

    /// Column names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ColumnType)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (String, ColumnType)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, column_type) in iter {
            map.insert(name, column_type);
        }
        map
    }
}
