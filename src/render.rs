//! Text rendering of datasets.
//!
//! Renders one [`DataSet`] under a banner line, either as delimited plain
//! text or as a markdown table. Rendering is a pure function of its inputs
//! and never fails.
//!
//! # Example
//!
//! ```
//! use queryv2_client::model::{Column, ColumnType, DataSet};
//! use queryv2_client::render::{render_table, RenderOptions};
//! use serde_json::json;
//!
//! let dataset = DataSet::with_rows(
//!     vec![Column::new("Welcome", ColumnType::String)],
//!     vec![vec![json!("Hello, World!")]],
//! ).unwrap();
//!
//! let text = render_table("[1] table", &dataset, &RenderOptions::default());
//! assert_eq!(text, "[1] table\nWelcome\nHello, World!\n");
//! ```

use serde_json::Value;

use crate::model::{Column, ColumnType, DataSet};

/// Default separator between plain-text cells.
pub const DEFAULT_DELIMITER: &str = " | ";

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Render a markdown table instead of delimited text.
    pub markdown: bool,
    /// Render the column-name header line.
    pub include_header: bool,
    /// Append `:type` to each header cell.
    pub include_column_type_annotation: bool,
    /// Render only the first row.
    pub first_row_only: bool,
    /// Text written for null values.
    pub null_marker: String,
    /// Separator between plain-text cells.
    pub delimiter: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            markdown: false,
            include_header: true,
            include_column_type_annotation: false,
            first_row_only: false,
            null_marker: String::new(),
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

impl RenderOptions {
    pub fn markdown(mut self, enabled: bool) -> Self {
        self.markdown = enabled;
        self
    }

    pub fn include_header(mut self, enabled: bool) -> Self {
        self.include_header = enabled;
        self
    }

    pub fn include_column_type_annotation(mut self, enabled: bool) -> Self {
        self.include_column_type_annotation = enabled;
        self
    }

    pub fn first_row_only(mut self, enabled: bool) -> Self {
        self.first_row_only = enabled;
        self
    }

    pub fn null_marker(mut self, marker: impl Into<String>) -> Self {
        self.null_marker = marker.into();
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }
}

/// Render a dataset under a banner line.
///
/// Every line, the banner included, ends with `\n`. A dataset without
/// columns renders as the banner alone; one without rows renders the banner
/// and the header.
pub fn render_table(banner: &str, dataset: &DataSet, options: &RenderOptions) -> String {
    let mut out = String::new();
    out.push_str(banner);
    out.push('\n');

    let columns = dataset.columns();
    if columns.is_empty() {
        return out;
    }

    let limit = if options.first_row_only { 1 } else { usize::MAX };
    let rows = dataset.rows().iter().take(limit).map(|row| {
        columns
            .iter()
            .zip(row)
            .map(|(column, value)| format_value(value, &column.column_type, &options.null_marker))
            .collect::<Vec<_>>()
    });

    if options.markdown {
        out.push('\n');
        if options.include_header {
            let header = columns.iter().map(|c| header_cell(c, options));
            push_markdown_row(&mut out, header);
            out.push('|');
            for _ in columns {
                out.push_str("---|");
            }
            out.push('\n');
        }
        for cells in rows {
            push_markdown_row(&mut out, cells.into_iter());
        }
    } else {
        if options.include_header {
            let header: Vec<String> = columns.iter().map(|c| header_cell(c, options)).collect();
            out.push_str(&header.join(&options.delimiter));
            out.push('\n');
        }
        for cells in rows {
            out.push_str(&cells.join(&options.delimiter));
            out.push('\n');
        }
    }

    out
}

/// Recover column names from a plain-text header line.
///
/// Inverse of the header written by [`render_table`] with `markdown` off.
/// Names that contain the delimiter do not survive the round trip. An empty
/// line is the header of a single unnamed column: tables without columns
/// render no header line at all.
pub fn parse_header_line(line: &str, options: &RenderOptions) -> Vec<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    line.split(options.delimiter.as_str())
        .map(|cell| {
            let name = if options.include_column_type_annotation {
                cell.rsplit_once(':').map_or(cell, |(name, _)| name)
            } else {
                cell
            };
            name.to_string()
        })
        .collect()
}

/// Format one value using its column's declared type.
pub fn format_value(value: &Value, column_type: &ColumnType, null_marker: &str) -> String {
    match value {
        Value::Null => null_marker.to_string(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => match column_type {
            ColumnType::Real | ColumnType::Decimal => number
                .as_f64()
                .map(|f| f.to_string())
                .unwrap_or_else(|| number.to_string()),
            // Some services send booleans as 0/1.
            ColumnType::Bool => (number.as_i64() != Some(0)).to_string(),
            _ => number.to_string(),
        },
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn header_cell(column: &Column, options: &RenderOptions) -> String {
    if options.include_column_type_annotation {
        format!("{}:{}", column.column_name, column.column_type)
    } else {
        column.column_name.clone()
    }
}

fn push_markdown_row(out: &mut String, cells: impl Iterator<Item = String>) {
    out.push('|');
    for cell in cells {
        out.push(' ');
        out.push_str(&escape_markdown(&cell));
        out.push_str(" |");
    }
    out.push('\n');
}

fn escape_markdown(cell: &str) -> String {
    cell.replace('|', "\\|").replace(['\r', '\n'], " ")
}
