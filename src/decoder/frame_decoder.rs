//! Result-set state machine.
//!
//! ```text
//! AwaitingHeader ──DataSetHeader──► AwaitingTable ──DataSetCompletion──► Done
//!                                    │        ▲
//!                          TableHeader│        │TableCompletion
//!                                    ▼        │
//!                                  StreamingTable
//! ```
//!
//! `DataTable` frames are complete on arrival and keep the decoder in
//! `AwaitingTable`. Progressive frames are only assembled when
//! [`DecoderConfig::assemble_progressive`] is set; otherwise they are
//! acknowledged and dropped.

use crate::error::{QueryV2Error, Result};
use crate::model::{CompletedTable, CompletionStatus};
use crate::protocol::{Frame, FrameType};

use super::assembler::{ProgressiveTable, TableAssembler, WholeTable};

/// Decoder configuration.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Assemble progressive tables from header/fragment/completion frames.
    pub assemble_progressive: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            assemble_progressive: true,
        }
    }
}

/// Position of the decoder in the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    AwaitingHeader,
    AwaitingTable,
    StreamingTable { table_id: i32 },
    Done,
}

/// What a single frame decoded to.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Header {
        version: String,
        is_progressive: bool,
    },
    /// A table is fully received.
    Table(CompletedTable),
    /// Advisory progress for a progressive table.
    Progress { table_id: i32, progress: f64 },
    /// A progressive frame consumed without assembly.
    Acknowledged(FrameType),
    /// Consumed but not interpreted.
    Ignored { frame_type: String },
    Completion {
        status: CompletionStatus,
        frame_index: usize,
    },
}

/// Classifies frames in arrival order and assembles their tables.
///
/// One decoder consumes exactly one result set.
#[derive(Debug)]
pub struct FrameDecoder {
    config: DecoderConfig,
    state: DecoderState,
    /// Index the next frame will get.
    frame_index: usize,
    open_table: Option<ProgressiveTable>,
    tables_completed: usize,
}

impl FrameDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            state: DecoderState::AwaitingHeader,
            frame_index: 0,
            open_table: None,
            tables_completed: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Number of frames decoded so far.
    #[inline]
    pub fn frames_seen(&self) -> usize {
        self.frame_index
    }

    /// Number of tables handed out so far.
    #[inline]
    pub fn tables_completed(&self) -> usize {
        self.tables_completed
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.state == DecoderState::Done
    }

    /// Decode the next frame of the result set.
    ///
    /// # Errors
    ///
    /// - `ProtocolSequence` if the frame is not legal in the current state
    /// - `ProtocolDecode` if a table payload is malformed
    pub fn decode(&mut self, frame: Frame) -> Result<Decoded> {
        let index = self.frame_index;
        self.frame_index += 1;

        tracing::debug!(
            frame_index = index,
            frame_type = frame.type_name(),
            state = ?self.state,
            "decoding frame"
        );

        match (self.state, frame) {
            (DecoderState::Done, frame) => Err(sequence(format!(
                "{} frame after DataSetCompletion",
                frame.type_name()
            ))),

            (DecoderState::AwaitingHeader, Frame::DataSetHeader(header)) => {
                self.state = DecoderState::AwaitingTable;
                Ok(Decoded::Header {
                    version: header.version,
                    is_progressive: header.is_progressive,
                })
            }
            (DecoderState::AwaitingHeader, frame) => Err(sequence(format!(
                "expected DataSetHeader as the first frame, got {}",
                frame.type_name()
            ))),
            (_, Frame::DataSetHeader(_)) => {
                Err(sequence("DataSetHeader after the start of the result set"))
            }

            (DecoderState::AwaitingTable, Frame::DataTable(table)) => {
                let assembler = WholeTable::from_frame(table)?;
                self.emit(assembler, index)
            }
            (DecoderState::StreamingTable { table_id }, Frame::DataTable(table)) => {
                Err(sequence(format!(
                    "DataTable {} while progressive table {} is open",
                    table.table_id, table_id
                )))
            }

            (_, frame) if frame.frame_type().is_progressive() && !self.config.assemble_progressive => {
                Ok(Decoded::Acknowledged(frame.frame_type()))
            }

            (DecoderState::AwaitingTable, Frame::TableHeader(header)) => {
                self.state = DecoderState::StreamingTable {
                    table_id: header.table_id,
                };
                self.open_table = Some(ProgressiveTable::open(header));
                Ok(Decoded::Acknowledged(FrameType::TableHeader))
            }
            (DecoderState::StreamingTable { table_id }, Frame::TableHeader(header)) => {
                Err(sequence(format!(
                    "TableHeader {} while table {} is open",
                    header.table_id, table_id
                )))
            }

            (_, Frame::TableFragment(fragment)) => {
                let table = self.open_table_for(fragment.table_id, "TableFragment")?;
                table.apply_fragment(fragment)?;
                Ok(Decoded::Acknowledged(FrameType::TableFragment))
            }

            (_, Frame::TableCompletion(completion)) => {
                let table = self.open_table_for(completion.table_id, "TableCompletion")?;
                table.complete(&completion)?;
                let table = self.open_table.take().ok_or_else(|| {
                    sequence(format!("TableCompletion {} without an open table", completion.table_id))
                })?;
                self.state = DecoderState::AwaitingTable;
                self.emit(table, index)
            }

            (state, Frame::TableProgress(progress)) => {
                if state != (DecoderState::StreamingTable { table_id: progress.table_id }) {
                    tracing::warn!(
                        table_id = progress.table_id,
                        ?state,
                        "TableProgress for a table that is not open"
                    );
                }
                Ok(Decoded::Progress {
                    table_id: progress.table_id,
                    progress: progress.table_progress,
                })
            }

            (DecoderState::StreamingTable { table_id }, Frame::DataSetCompletion(_)) => {
                Err(sequence(format!(
                    "DataSetCompletion while table {} is still open",
                    table_id
                )))
            }
            (_, Frame::DataSetCompletion(completion)) => {
                self.state = DecoderState::Done;
                Ok(Decoded::Completion {
                    status: completion.status(),
                    frame_index: index,
                })
            }

            (_, Frame::Unknown { frame_type }) => {
                tracing::warn!(frame_index = index, %frame_type, "ignoring unexpected frame type");
                Ok(Decoded::Ignored { frame_type })
            }
        }
    }

    /// Check that the result set ended properly once the stream is drained.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolSequence` unless a `DataSetCompletion` was decoded.
    pub fn finish(&self) -> Result<()> {
        match self.state {
            DecoderState::Done => Ok(()),
            DecoderState::AwaitingHeader => Err(sequence("stream ended before DataSetHeader")),
            DecoderState::StreamingTable { table_id } => Err(sequence(format!(
                "stream ended while table {} was open",
                table_id
            ))),
            DecoderState::AwaitingTable => {
                Err(sequence("stream ended before DataSetCompletion"))
            }
        }
    }

    fn open_table_for(&mut self, table_id: i32, frame: &str) -> Result<&mut ProgressiveTable> {
        self.open_table.as_mut().ok_or_else(|| {
            sequence(format!("{} for table {} without a TableHeader", frame, table_id))
        })
    }

    fn emit<A: TableAssembler>(&mut self, assembler: A, index: usize) -> Result<Decoded> {
        if !assembler.is_complete() {
            return Err(sequence(format!(
                "table {} handed over before it was complete",
                assembler.table_id()
            )));
        }
        tracing::debug!(
            table_id = assembler.table_id(),
            table_kind = %assembler.table_kind(),
            frame_index = index,
            "table complete"
        );
        let table = assembler.finish(index)?;
        self.tables_completed += 1;
        Ok(Decoded::Table(table))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

fn sequence(message: impl Into<String>) -> QueryV2Error {
    QueryV2Error::ProtocolSequence(message.into())
}
