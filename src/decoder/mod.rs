//! Decoder module - frame classification and table assembly.
//!
//! Provides:
//! - [`FrameDecoder`] - the result-set state machine, fed one frame at a time
//! - [`TableAssembler`] - the capability shared by the two table shapes
//!   ([`WholeTable`] and [`ProgressiveTable`])
//!
//! # Example
//!
//! ```
//! use queryv2_client::decoder::{Decoded, FrameDecoder};
//! use queryv2_client::protocol::Frame;
//!
//! let mut decoder = FrameDecoder::default();
//! decoder.decode(Frame::header("v2.0")).unwrap();
//! let done = decoder.decode(Frame::completion(false, false, None)).unwrap();
//! assert!(matches!(done, Decoded::Completion { .. }));
//! decoder.finish().unwrap();
//! ```

mod assembler;
mod frame_decoder;

pub use assembler::{ProgressiveTable, TableAssembler, WholeTable};
pub use frame_decoder::{Decoded, DecoderConfig, DecoderState, FrameDecoder};
