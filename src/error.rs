//! Error types for queryv2-client.
//!
//! Only decode-level failures live here. A query that ran and failed on the
//! service side is not an error: it arrives as data in the terminal
//! `DataSetCompletion` frame (see [`CompletionStatus`](crate::model::CompletionStatus)).

use thiserror::Error;

/// Main error type for all decode operations.
#[derive(Debug, Error)]
pub enum QueryV2Error {
    /// The underlying stream failed while pulling a frame.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A recognized frame carried a payload that does not fit its shape.
    #[error("Protocol decode error: {0}")]
    ProtocolDecode(String),

    /// Frames arrived in an order the result-set state machine forbids.
    #[error("Protocol sequence error: {0}")]
    ProtocolSequence(String),
}

impl QueryV2Error {
    /// Build a decode error for a frame type, keeping the serde message.
    pub(crate) fn decode(frame_type: &str, err: serde_json::Error) -> Self {
        QueryV2Error::ProtocolDecode(format!("invalid {} payload: {}", frame_type, err))
    }

    /// Check if this is a transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, QueryV2Error::Transport(_))
    }

    /// Check if this is a protocol (decode or sequence) failure.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            QueryV2Error::ProtocolDecode(_) | QueryV2Error::ProtocolSequence(_)
        )
    }
}

/// Result type alias using QueryV2Error.
pub type Result<T> = std::result::Result<T, QueryV2Error>;
