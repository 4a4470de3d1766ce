//! # queryv2-client
//!
//! Client-side decoding of the progressive, multi-frame "V2" query
//! result-set protocol.
//!
//! A V2 response is an ordered sequence of frames: a `DataSetHeader`, any
//! number of tables (whole `DataTable` frames or progressive
//! `TableHeader`/`TableFragment`/`TableCompletion` runs), and a final
//! `DataSetCompletion` carrying the authoritative outcome of the query.
//!
//! ## Architecture
//!
//! - **Protocol**: frame types, JSON wire format, and the streaming frame splitter
//! - **Decoder**: the result-set state machine and table assembly
//! - **Render**: plain-text and markdown rendering of completed tables
//! - **Transport**: session and stream traits, byte-stream and mock implementations
//!
//! ## Example
//!
//! ```
//! use queryv2_client::transport::{MockSession, DEMO_QUERY};
//! use queryv2_client::QueryClient;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), queryv2_client::QueryV2Error> {
//! let client = QueryClient::new(MockSession::demo());
//! let output = client.execute("Samples", DEMO_QUERY).await?;
//!
//! print!("{}", output.text);
//! assert!(output.text.starts_with("DataSetHeader: Version=v2.0\n"));
//! # Ok(())
//! # }
//! ```

pub mod decoder;
pub mod error;
pub mod model;
pub mod protocol;
pub mod render;
pub mod transport;

mod client;

pub use client::{
    decode_and_render, QueryClient, QueryClientBuilder, QueryOutput, DEFAULT_APPLICATION_NAME,
    PROGRESSIVE_OPTION,
};
pub use error::QueryV2Error;
