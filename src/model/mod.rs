//! Data model shared by the decoder and the renderer.
//!
//! - [`Column`] / [`ColumnType`] - typed column schema
//! - [`TableKind`] - purpose of a table within a result set
//! - [`DataSet`] - columns plus rows
//! - [`CompletedTable`] - a table ready for rendering
//! - [`CompletionStatus`] - terminal status of the whole result set

mod column;
mod completion;
mod table;

pub use column::{Column, ColumnType};
pub use completion::{CompletionStatus, QueryOutcome};
pub use table::{CompletedTable, DataSet, Row, TableKind, TableOrigin};
