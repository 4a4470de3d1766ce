//! Transport module - the session and stream seams.
//!
//! The real service connection (network, TLS, authentication) lives behind
//! two traits:
//! - [`Session`] - submits a query and hands back a pending result-set stream
//! - [`ResultSetStream`] - yields frames one at a time, then is closed
//!
//! Provided implementations:
//! - [`FrameStream`] - frames from any `AsyncRead` carrying a V2 body
//! - [`MockSession`] - scripted responses for tests and the demonstration

mod mock;
mod properties;
mod stream;

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::protocol::Frame;

pub use mock::{MockSession, ScriptStep, ScriptedStream, Submission, DEMO_QUERY};
pub use properties::{CancellationToken, ClientRequestProperties};
pub use stream::FrameStream;

/// Boxed future for transport results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single-pass, single-owner sequence of frames for one query.
pub trait ResultSetStream: Send {
    /// Wait for the next frame; `Ok(None)` once the stream has ended.
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<Frame>>>;

    /// Release transport resources. Safe to call more than once.
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

impl<S: ResultSetStream + ?Sized> ResultSetStream for Box<S> {
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<Frame>>> {
        (**self).next_frame()
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        (**self).close()
    }
}

/// A connection able to run queries.
pub trait Session: Send + Sync {
    /// Submit a query; resolves once the service starts answering.
    fn submit_query<'a>(
        &'a self,
        database: &'a str,
        query: &'a str,
        properties: ClientRequestProperties,
    ) -> BoxFuture<'a, Result<Box<dyn ResultSetStream>>>;
}
