//! Frame stream over any async byte source.
//!
//! Reads a V2 response body in chunks, splits it with [`FrameBuffer`], and
//! yields decoded frames one at a time.
//!
//! # Example
//!
//! ```
//! use queryv2_client::protocol::{encode_response, Frame};
//! use queryv2_client::transport::FrameStream;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let body = encode_response(&[Frame::header("v2.0"), Frame::completion(false, false, None)]).unwrap();
//! let mut stream = FrameStream::new(&body[..]);
//!
//! let first = stream.read_frame().await.unwrap().unwrap();
//! assert_eq!(first, Frame::header("v2.0"));
//! # }
//! ```

use std::collections::VecDeque;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{BoxFuture, ResultSetStream};
use crate::error::Result;
use crate::protocol::{decode_frame, Frame, FrameBuffer};

/// Size of each read from the underlying source.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// A result-set stream reading frames from an `AsyncRead`.
///
/// The reader is dropped on [`close`](ResultSetStream::close) or once the
/// body ends.
pub struct FrameStream<R> {
    reader: Option<R>,
    buffer: FrameBuffer,
    /// Complete frames split off but not yet handed out.
    pending: VecDeque<Bytes>,
    read_buf: Vec<u8>,
    frames_read: usize,
}

impl<R: AsyncRead + Unpin + Send> FrameStream<R> {
    pub fn new(reader: R) -> Self {
        Self::with_buffer(reader, FrameBuffer::new())
    }

    /// Create a stream that rejects frames larger than `max_frame_size`.
    pub fn with_max_frame_size(reader: R, max_frame_size: usize) -> Self {
        Self::with_buffer(reader, FrameBuffer::with_max_frame_size(max_frame_size))
    }

    fn with_buffer(reader: R, buffer: FrameBuffer) -> Self {
        Self {
            reader: Some(reader),
            buffer,
            pending: VecDeque::new(),
            read_buf: vec![0u8; READ_CHUNK_SIZE],
            frames_read: 0,
        }
    }

    /// Read the next frame, waiting for more bytes as needed.
    ///
    /// Returns `Ok(None)` once the body has ended at a frame boundary.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(raw) = self.pending.pop_front() {
                let frame = decode_frame(&raw)?;
                self.frames_read += 1;
                return Ok(Some(frame));
            }

            let Some(reader) = self.reader.as_mut() else {
                return Ok(None);
            };

            let n = reader.read(&mut self.read_buf).await?;
            if n == 0 {
                // Source exhausted
                self.reader = None;
                self.buffer.finish()?;
                continue;
            }

            let frames = self.buffer.push(&self.read_buf[..n])?;
            self.pending.extend(frames);
        }
    }

    /// Number of frames handed out so far.
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Check if the underlying reader is still held.
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

impl<R: AsyncRead + Unpin + Send> ResultSetStream for FrameStream<R> {
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<Frame>>> {
        Box::pin(self.read_frame())
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.reader.take().is_some() {
                tracing::debug!(frames_read = self.frames_read, "closing frame stream");
            }
            self.pending.clear();
            self.buffer.clear();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_response;
    use tokio::io::AsyncWriteExt;

    fn body() -> Vec<u8> {
        encode_response(&[
            Frame::header("v2.0"),
            Frame::Unknown {
                frame_type: "Future".to_string(),
            },
            Frame::completion(false, false, None),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_reads_all_frames() {
        let bytes = body();
        let mut stream = FrameStream::new(&bytes[..]);

        let mut types = Vec::new();
        while let Some(frame) = stream.next_frame().await.unwrap() {
            types.push(frame.type_name().to_string());
        }

        assert_eq!(types, ["DataSetHeader", "Future", "DataSetCompletion"]);
        assert_eq!(stream.frames_read(), 3);
        assert!(!stream.is_open());
    }

    #[tokio::test]
    async fn test_frames_split_across_writes() {
        let bytes = body();
        let (mut client, server) = tokio::io::duplex(8);

        let writer = tokio::spawn(async move {
            for chunk in bytes.chunks(5) {
                client.write_all(chunk).await.unwrap();
            }
        });

        let mut stream = FrameStream::new(server);
        let mut count = 0;
        while stream.next_frame().await.unwrap().is_some() {
            count += 1;
        }
        writer.await.unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_truncated_body_is_transport_error() {
        let bytes = body();
        let truncated = &bytes[..bytes.len() - 10];
        let mut stream = FrameStream::new(truncated);

        let mut result = stream.next_frame().await;
        while let Ok(Some(_)) = result {
            result = stream.next_frame().await;
        }
        assert!(result.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_oversize_frame_is_decode_error() {
        let bytes = body();
        let mut stream = FrameStream::with_max_frame_size(&bytes[..], 8);
        let err = stream.next_frame().await.unwrap_err();
        assert!(err.is_protocol());
    }

    #[tokio::test]
    async fn test_close_releases_reader() {
        let bytes = body();
        let mut stream = FrameStream::new(&bytes[..]);
        stream.next_frame().await.unwrap();
        assert!(stream.is_open());

        stream.close().await;

        assert!(!stream.is_open());
        assert!(stream.next_frame().await.unwrap().is_none());
    }
}
