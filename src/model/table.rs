//! Tables: kinds, row/column datasets, and fully assembled tables.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Column;
use crate::error::{QueryV2Error, Result};

/// Purpose of a table within a result set.
///
/// Distinct from the frame type that carried it: a result set usually holds
/// several tables, and consumers pick them by kind rather than by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TableKind {
    PrimaryResult,
    QueryCompletionInformation,
    QueryTraceLog,
    QueryPerfLog,
    TableOfContents,
    QueryProperties,
    QueryPlan,
    Unknown,
    /// A kind this client does not know, kept by name.
    Other(String),
}

impl TableKind {
    pub fn as_str(&self) -> &str {
        match self {
            TableKind::PrimaryResult => "PrimaryResult",
            TableKind::QueryCompletionInformation => "QueryCompletionInformation",
            TableKind::QueryTraceLog => "QueryTraceLog",
            TableKind::QueryPerfLog => "QueryPerfLog",
            TableKind::TableOfContents => "TableOfContents",
            TableKind::QueryProperties => "QueryProperties",
            TableKind::QueryPlan => "QueryPlan",
            TableKind::Unknown => "Unknown",
            TableKind::Other(name) => name,
        }
    }
}

impl From<String> for TableKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "PrimaryResult" => TableKind::PrimaryResult,
            "QueryCompletionInformation" => TableKind::QueryCompletionInformation,
            "QueryTraceLog" => TableKind::QueryTraceLog,
            "QueryPerfLog" => TableKind::QueryPerfLog,
            "TableOfContents" => TableKind::TableOfContents,
            "QueryProperties" => TableKind::QueryProperties,
            "QueryPlan" => TableKind::QueryPlan,
            "Unknown" => TableKind::Unknown,
            _ => TableKind::Other(name),
        }
    }
}

impl From<TableKind> for String {
    fn from(kind: TableKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row: positional values matching the table's columns.
pub type Row = Vec<Value>;

/// An in-memory table payload: ordered columns and ordered rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl DataSet {
    /// Create an empty dataset with the given schema.
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a dataset, checking that every row matches the schema width.
    pub fn with_rows(columns: Vec<Column>, rows: Vec<Row>) -> Result<Self> {
        let mut dataset = Self::new(columns);
        dataset.append_rows(rows)?;
        Ok(dataset)
    }

    /// Append rows after checking their width.
    pub fn append_rows(&mut self, rows: Vec<Row>) -> Result<()> {
        for (offset, row) in rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(QueryV2Error::ProtocolDecode(format!(
                    "row {} has {} values but the table has {} columns",
                    self.rows.len() + offset,
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        self.rows.extend(rows);
        Ok(())
    }

    /// Drop all rows received so far and replace them.
    pub fn replace_rows(&mut self, rows: Vec<Row>) -> Result<()> {
        self.rows.clear();
        self.append_rows(rows)
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.column_name == name)
    }

    /// Value at `row`, column `name`.
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let index = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }
}

/// How a completed table reached the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOrigin {
    /// Delivered whole in one `DataTable` frame.
    DataTable,
    /// Assembled from `TableHeader`, `TableFragment` and `TableCompletion` frames.
    Progressive,
}

/// A fully received table, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTable {
    pub table_id: i32,
    pub table_name: String,
    pub table_kind: TableKind,
    pub dataset: DataSet,
    pub origin: TableOrigin,
    /// Index of the frame that completed the table.
    pub frame_index: usize,
}

impl CompletedTable {
    /// Banner line used as the title of the rendered table.
    pub fn banner(&self) -> String {
        let label = match self.origin {
            TableOrigin::DataTable => "DataTable(DataTableFrame)",
            TableOrigin::Progressive => "TableCompletion(TableCompletionFrame)",
        };
        format!(
            "[{}] {}: TableId={}, TableName={}, TableKind={}",
            self.frame_index, label, self.table_id, self.table_name, self.table_kind
        )
    }
}
