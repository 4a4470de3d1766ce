//! Table assembly strategies.
//!
//! A table reaches the client in one of two shapes:
//! - [`WholeTable`] - a single `DataTable` frame
//! - [`ProgressiveTable`] - `TableHeader`, any number of `TableFragment`s,
//!   then `TableCompletion`
//!
//! Both implement [`TableAssembler`], which yields a [`CompletedTable`] once
//! the table is fully received.

use crate::error::{QueryV2Error, Result};
use crate::model::{CompletedTable, DataSet, TableKind, TableOrigin};
use crate::protocol::{DataTable, TableCompletion, TableFragment, TableFragmentType, TableHeader};

/// Produces a completed dataset for one table.
pub trait TableAssembler {
    fn table_id(&self) -> i32;

    fn table_kind(&self) -> &TableKind;

    /// Check if every frame of the table has been received.
    fn is_complete(&self) -> bool;

    /// Hand over the completed table.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolSequence` if the table is not complete yet.
    fn finish(self, frame_index: usize) -> Result<CompletedTable>;
}

/// A table delivered whole in one `DataTable` frame.
#[derive(Debug)]
pub struct WholeTable {
    table_id: i32,
    table_name: String,
    table_kind: TableKind,
    dataset: DataSet,
}

impl WholeTable {
    /// Take over a `DataTable` payload, checking row widths.
    pub fn from_frame(frame: DataTable) -> Result<Self> {
        let dataset = DataSet::with_rows(frame.columns, frame.rows).map_err(|e| {
            QueryV2Error::ProtocolDecode(format!("table {}: {}", frame.table_id, e))
        })?;
        Ok(Self {
            table_id: frame.table_id,
            table_name: frame.table_name,
            table_kind: frame.table_kind,
            dataset,
        })
    }
}

impl TableAssembler for WholeTable {
    fn table_id(&self) -> i32 {
        self.table_id
    }

    fn table_kind(&self) -> &TableKind {
        &self.table_kind
    }

    fn is_complete(&self) -> bool {
        true
    }

    fn finish(self, frame_index: usize) -> Result<CompletedTable> {
        Ok(CompletedTable {
            table_id: self.table_id,
            table_name: self.table_name,
            table_kind: self.table_kind,
            dataset: self.dataset,
            origin: TableOrigin::DataTable,
            frame_index,
        })
    }
}

/// A table accumulated across progressive frames.
#[derive(Debug)]
pub struct ProgressiveTable {
    table_id: i32,
    table_name: String,
    table_kind: TableKind,
    dataset: DataSet,
    fragments: usize,
    completed: bool,
}

impl ProgressiveTable {
    /// Open a table from its `TableHeader`.
    pub fn open(header: TableHeader) -> Self {
        Self {
            table_id: header.table_id,
            table_name: header.table_name,
            table_kind: header.table_kind,
            dataset: DataSet::new(header.columns),
            fragments: 0,
            completed: false,
        }
    }

    /// Apply one fragment: append its rows or replace everything so far.
    pub fn apply_fragment(&mut self, fragment: TableFragment) -> Result<()> {
        self.expect_open(fragment.table_id, "TableFragment")?;
        let applied = match fragment.table_fragment_type {
            TableFragmentType::DataAppend => self.dataset.append_rows(fragment.rows),
            TableFragmentType::DataReplace => self.dataset.replace_rows(fragment.rows),
        };
        applied.map_err(|e| QueryV2Error::ProtocolDecode(format!("table {}: {}", self.table_id, e)))?;
        self.fragments += 1;
        Ok(())
    }

    /// Close the table on its `TableCompletion`.
    pub fn complete(&mut self, completion: &TableCompletion) -> Result<()> {
        self.expect_open(completion.table_id, "TableCompletion")?;
        if let Some(expected) = completion.row_count {
            if expected != self.dataset.row_count() as i64 {
                tracing::warn!(
                    table_id = self.table_id,
                    expected,
                    received = self.dataset.row_count(),
                    "TableCompletion row count does not match received rows"
                );
            }
        }
        if let Some(errors) = completion.one_api_errors.as_ref().filter(|e| !e.is_empty()) {
            tracing::warn!(
                table_id = self.table_id,
                errors = errors.len(),
                "table completed with errors"
            );
        }
        self.completed = true;
        Ok(())
    }

    /// Number of fragments applied so far.
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn row_count(&self) -> usize {
        self.dataset.row_count()
    }

    fn expect_open(&self, table_id: i32, frame: &str) -> Result<()> {
        if self.completed {
            return Err(QueryV2Error::ProtocolSequence(format!(
                "{} for table {} after its TableCompletion",
                frame, table_id
            )));
        }
        if table_id != self.table_id {
            return Err(QueryV2Error::ProtocolSequence(format!(
                "{} for table {} while table {} is open",
                frame, table_id, self.table_id
            )));
        }
        Ok(())
    }
}

impl TableAssembler for ProgressiveTable {
    fn table_id(&self) -> i32 {
        self.table_id
    }

    fn table_kind(&self) -> &TableKind {
        &self.table_kind
    }

    fn is_complete(&self) -> bool {
        self.completed
    }

    fn finish(self, frame_index: usize) -> Result<CompletedTable> {
        if !self.completed {
            return Err(QueryV2Error::ProtocolSequence(format!(
                "table {} finished before its TableCompletion",
                self.table_id
            )));
        }
        Ok(CompletedTable {
            table_id: self.table_id,
            table_name: self.table_name,
            table_kind: self.table_kind,
            dataset: self.dataset,
            origin: TableOrigin::Progressive,
            frame_index,
        })
    }
}
