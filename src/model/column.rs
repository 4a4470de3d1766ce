//! Column schema: names and declared types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a column, as named on the wire.
///
/// Unrecognized names are kept verbatim in [`ColumnType::Other`] so a newer
/// service can add types without breaking decoding. Recognized aliases
/// (`Int64`, `Double`, `date`, ...) are folded into the canonical name, so
/// re-encoding a decoded column writes `long`, `real`, `datetime` instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Bool,
    DateTime,
    Dynamic,
    Guid,
    Int,
    Long,
    Real,
    String,
    TimeSpan,
    Decimal,
    Other(String),
}

impl ColumnType {
    /// Wire name of the type.
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::DateTime => "datetime",
            ColumnType::Dynamic => "dynamic",
            ColumnType::Guid => "guid",
            ColumnType::Int => "int",
            ColumnType::Long => "long",
            ColumnType::Real => "real",
            ColumnType::String => "string",
            ColumnType::TimeSpan => "timespan",
            ColumnType::Decimal => "decimal",
            ColumnType::Other(name) => name,
        }
    }
}

impl From<String> for ColumnType {
    fn from(name: String) -> Self {
        // Older services send `Int32`/`Int64`/`Double` style names.
        match name.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => ColumnType::Bool,
            "datetime" | "date" => ColumnType::DateTime,
            "dynamic" | "object" => ColumnType::Dynamic,
            "guid" | "uuid" | "uniqueid" => ColumnType::Guid,
            "int" | "int32" => ColumnType::Int,
            "long" | "int64" => ColumnType::Long,
            "real" | "double" => ColumnType::Real,
            "string" => ColumnType::String,
            "timespan" | "time" => ColumnType::TimeSpan,
            "decimal" => ColumnType::Decimal,
            _ => ColumnType::Other(name),
        }
    }
}

impl From<&str> for ColumnType {
    fn from(name: &str) -> Self {
        ColumnType::from(name.to_string())
    }
}

impl From<ColumnType> for String {
    fn from(ty: ColumnType) -> Self {
        ty.as_str().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Column {
    pub column_name: String,
    pub column_type: ColumnType,
}

impl Column {
    /// Create a column from a name and a type.
    pub fn new(name: impl Into<String>, column_type: impl Into<ColumnType>) -> Self {
        Self {
            column_name: name.into(),
            column_type: column_type.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.column_name
    }
}
