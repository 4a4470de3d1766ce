//! Frame types with typed payloads.
//!
//! A result set is a sequence of frames. Each frame is a JSON object whose
//! `FrameType` field selects one of the payload shapes below.
//!
//! # Example
//!
//! ```
//! use queryv2_client::protocol::{decode_frame, Frame, FrameType};
//!
//! let frame = decode_frame(br#"{"FrameType":"DataSetHeader","Version":"v2.0","IsProgressive":false}"#).unwrap();
//! assert_eq!(frame.frame_type(), FrameType::DataSetHeader);
//! assert!(matches!(frame, Frame::DataSetHeader(ref h) if h.version == "v2.0"));
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::model::{Column, CompletionStatus, Row, TableKind};

/// Declared type of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    DataSetHeader,
    TableHeader,
    TableFragment,
    TableProgress,
    TableCompletion,
    DataTable,
    DataSetCompletion,
    /// A frame type this client does not recognize.
    Unknown,
}

impl FrameType {
    /// Look up a known frame type by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DataSetHeader" => Some(FrameType::DataSetHeader),
            "TableHeader" => Some(FrameType::TableHeader),
            "TableFragment" => Some(FrameType::TableFragment),
            "TableProgress" => Some(FrameType::TableProgress),
            "TableCompletion" => Some(FrameType::TableCompletion),
            "DataTable" => Some(FrameType::DataTable),
            "DataSetCompletion" => Some(FrameType::DataSetCompletion),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::DataSetHeader => "DataSetHeader",
            FrameType::TableHeader => "TableHeader",
            FrameType::TableFragment => "TableFragment",
            FrameType::TableProgress => "TableProgress",
            FrameType::TableCompletion => "TableCompletion",
            FrameType::DataTable => "DataTable",
            FrameType::DataSetCompletion => "DataSetCompletion",
            FrameType::Unknown => "Unknown",
        }
    }

    /// Check if this frame type only appears in progressive mode.
    #[inline]
    pub fn is_progressive(&self) -> bool {
        matches!(
            self,
            FrameType::TableHeader
                | FrameType::TableFragment
                | FrameType::TableProgress
                | FrameType::TableCompletion
        )
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First frame of every result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSetHeader {
    /// Protocol version, e.g. `v2.0`. Numeric versions are kept as their text.
    #[serde(deserialize_with = "version_text")]
    pub version: String,
    /// Whether tables may arrive as header/fragments/completion.
    #[serde(default)]
    pub is_progressive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fragmented: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reporting_placement: Option<String>,
}

fn version_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "Version must be a string or a number, got {}",
            other
        ))),
    }
}

/// Opens a progressive table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableHeader {
    pub table_id: i32,
    pub table_name: String,
    pub table_kind: TableKind,
    pub columns: Vec<Column>,
}

/// How a fragment's rows combine with the rows received before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableFragmentType {
    #[default]
    DataAppend,
    DataReplace,
}

/// Rows for the currently open progressive table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableFragment {
    pub table_id: i32,
    #[serde(default)]
    pub table_fragment_type: TableFragmentType,
    pub rows: Vec<Row>,
}

/// Advisory progress for a progressive table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableProgress {
    pub table_id: i32,
    /// Percentage completed so far.
    pub table_progress: f64,
}

/// Closes a progressive table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableCompletion {
    pub table_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_api_errors: Option<Vec<Value>>,
}

/// A complete table delivered in a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataTable {
    pub table_id: i32,
    pub table_name: String,
    pub table_kind: TableKind,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

/// Last frame of every result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSetCompletion {
    pub has_errors: bool,
    pub cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_api_errors: Option<Vec<Value>>,
}

impl DataSetCompletion {
    /// Terminal status; `OneApiErrors` stand in when no `Exception` text is sent.
    pub fn status(&self) -> CompletionStatus {
        let exception = match (&self.exception, &self.one_api_errors) {
            (Some(text), _) if !text.is_empty() => Some(text.clone()),
            (_, Some(errors)) if !errors.is_empty() => Some(Value::from(errors.clone()).to_string()),
            _ => None,
        };
        CompletionStatus {
            has_errors: self.has_errors,
            cancelled: self.cancelled,
            exception,
        }
    }
}

/// One decoded frame of a result set.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    DataSetHeader(DataSetHeader),
    TableHeader(TableHeader),
    TableFragment(TableFragment),
    TableProgress(TableProgress),
    TableCompletion(TableCompletion),
    DataTable(DataTable),
    DataSetCompletion(DataSetCompletion),
    /// A frame with an unrecognized `FrameType`; consumed but not interpreted.
    Unknown { frame_type: String },
}

impl Frame {
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::DataSetHeader(_) => FrameType::DataSetHeader,
            Frame::TableHeader(_) => FrameType::TableHeader,
            Frame::TableFragment(_) => FrameType::TableFragment,
            Frame::TableProgress(_) => FrameType::TableProgress,
            Frame::TableCompletion(_) => FrameType::TableCompletion,
            Frame::DataTable(_) => FrameType::DataTable,
            Frame::DataSetCompletion(_) => FrameType::DataSetCompletion,
            Frame::Unknown { .. } => FrameType::Unknown,
        }
    }

    /// Wire name of the frame type, including unrecognized names.
    pub fn type_name(&self) -> &str {
        match self {
            Frame::Unknown { frame_type } => frame_type,
            other => other.frame_type().as_str(),
        }
    }

    /// Build a non-progressive header frame.
    pub fn header(version: impl Into<String>) -> Self {
        Frame::DataSetHeader(DataSetHeader {
            version: version.into(),
            is_progressive: false,
            is_fragmented: None,
            error_reporting_placement: None,
        })
    }

    /// Build a completion frame.
    pub fn completion(has_errors: bool, cancelled: bool, exception: Option<String>) -> Self {
        Frame::DataSetCompletion(DataSetCompletion {
            has_errors,
            cancelled,
            exception,
            one_api_errors: None,
        })
    }
}
