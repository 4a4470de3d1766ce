//! Frame buffer for splitting a streamed response body into frames.
//!
//! Uses `bytes::BytesMut` for buffer management and hands out each complete
//! frame object as frozen `Bytes`. Implements a state machine over the
//! response body:
//! - `Start`: nothing consumed yet, expects `[` (or a bare `{`)
//! - `BetweenFrames`: skipping whitespace and separators
//! - `InFrame`: inside a frame object, tracking nesting and strings
//! - `Finished`: closing `]` seen
//!
//! # Example
//!
//! ```
//! use queryv2_client::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // Data arrives in arbitrary chunks from the transport
//! assert!(buffer.push(br#"[{"FrameType":"DataSet"#).unwrap().is_empty());
//! let frames = buffer.push(br#"Header","Version":"v2.0"}"#).unwrap();
//! assert_eq!(frames.len(), 1);
//! ```

use bytes::{Buf, Bytes, BytesMut};

use super::wire_format::DEFAULT_MAX_FRAME_SIZE;
use crate::error::{QueryV2Error, Result};

/// State machine for frame splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    BetweenFrames {
        in_array: bool,
    },
    InFrame {
        in_array: bool,
        depth: usize,
        in_string: bool,
        escaped: bool,
    },
    Finished,
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// Only the bytes of the frame currently being received are kept; each
/// complete frame is split off without copying.
pub struct FrameBuffer {
    /// Accumulated bytes from transport reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Bytes of the current frame already scanned.
    scanned: usize,
    /// Maximum allowed frame size.
    max_frame_size: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max frame: 1GB.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new frame buffer with a custom max frame size.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::Start,
            scanned: 0,
            max_frame_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Returns the raw JSON bytes of every frame completed by this push
    /// (may be empty if still waiting for data).
    ///
    /// # Errors
    ///
    /// Returns `ProtocolDecode` if the body is not a sequence of JSON
    /// objects or a frame exceeds the max frame size.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.state {
                State::InFrame {
                    in_array,
                    depth,
                    in_string,
                    escaped,
                } => return self.scan_frame(in_array, depth, in_string, escaped),
                state => {
                    let Some(&byte) = self.buffer.first() else {
                        return Ok(None);
                    };
                    if byte.is_ascii_whitespace() {
                        self.buffer.advance(1);
                        continue;
                    }
                    self.state = match (state, byte) {
                        (State::Start, b'[') => {
                            self.buffer.advance(1);
                            State::BetweenFrames { in_array: true }
                        }
                        (State::Start, b'{') => Self::frame_start(false),
                        (State::BetweenFrames { in_array }, b'{') => Self::frame_start(in_array),
                        (State::BetweenFrames { in_array: true }, b',') => {
                            self.buffer.advance(1);
                            state
                        }
                        (State::BetweenFrames { in_array: true }, b']') => {
                            self.buffer.advance(1);
                            State::Finished
                        }
                        (_, other) => {
                            return Err(QueryV2Error::ProtocolDecode(format!(
                                "unexpected byte 0x{:02x} outside of a frame",
                                other
                            )))
                        }
                    };
                    self.scanned = 0;
                }
            }
        }
    }

    fn frame_start(in_array: bool) -> State {
        State::InFrame {
            in_array,
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    /// Continue scanning the open frame from where the last push stopped.
    fn scan_frame(
        &mut self,
        in_array: bool,
        mut depth: usize,
        mut in_string: bool,
        mut escaped: bool,
    ) -> Result<Option<Bytes>> {
        let mut end = None;

        for (i, &byte) in self.buffer.iter().enumerate().skip(self.scanned) {
            if in_string {
                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == b'"' {
                    in_string = false;
                }
                continue;
            }
            match byte {
                b'"' => in_string = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        end = Some(i + 1);
                        break;
                    }
                }
                _ => {}
            }
        }

        let scanned_len = end.unwrap_or(self.buffer.len());
        if scanned_len > self.max_frame_size {
            return Err(QueryV2Error::ProtocolDecode(format!(
                "Frame size {} exceeds maximum {}",
                scanned_len, self.max_frame_size
            )));
        }

        match end {
            Some(end) => {
                let frame = self.buffer.split_to(end).freeze();
                self.state = State::BetweenFrames { in_array };
                self.scanned = 0;
                Ok(Some(frame))
            }
            None => {
                self.scanned = self.buffer.len();
                self.state = State::InFrame {
                    in_array,
                    depth,
                    in_string,
                    escaped,
                };
                Ok(None)
            }
        }
    }

    /// Check that the body ended at a frame boundary.
    ///
    /// Called once the transport reports end of stream.
    ///
    /// # Errors
    ///
    /// Returns a `Transport` error (`UnexpectedEof`) if the stream ended
    /// inside a frame or before the closing `]` of the frame array.
    pub fn finish(&self) -> Result<()> {
        match self.state {
            State::Start | State::Finished | State::BetweenFrames { in_array: false } => Ok(()),
            State::BetweenFrames { in_array: true } => Err(unexpected_eof(
                "stream ended before the end of the frame array",
            )),
            State::InFrame { .. } => Err(unexpected_eof("stream ended inside a frame")),
        }
    }

    /// Check if the closing `]` of the frame array was seen.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::Start;
        self.scanned = 0;
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::Start => "Start",
            State::BetweenFrames { .. } => "BetweenFrames",
            State::InFrame { .. } => "InFrame",
            State::Finished => "Finished",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn unexpected_eof(message: &str) -> QueryV2Error {
    QueryV2Error::Transport(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        message.to_string(),
    ))
}
