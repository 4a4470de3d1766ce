//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the V2 result-set protocol:
//! - Frame buffer for splitting a streamed JSON body into frame objects
//! - `FrameType`-tagged decoding into the [`Frame`] sum type
//! - Typed payload structs for each frame kind

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{
    DataSetCompletion, DataSetHeader, DataTable, Frame, FrameType, TableCompletion,
    TableFragment, TableFragmentType, TableHeader, TableProgress,
};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    decode_frame, encode_frame, encode_response, DEFAULT_MAX_FRAME_SIZE, FRAME_TYPE_FIELD,
    PROTOCOL_VERSION,
};
