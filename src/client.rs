//! Query client and the decode-and-render loop.
//!
//! [`decode_and_render`] drives one result set:
//! 1. Await the pending stream from the session
//! 2. Pull frames one at a time and feed them to the [`FrameDecoder`]
//! 3. Render every completed table as it arrives
//! 4. Close the stream, whatever happened
//!
//! [`QueryClient`] wraps a [`Session`] with request properties and options.
//!
//! # Example
//!
//! ```
//! use queryv2_client::transport::{MockSession, DEMO_QUERY};
//! use queryv2_client::QueryClientBuilder;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let client = QueryClientBuilder::new()
//!     .application_name("docs")
//!     .build(MockSession::demo());
//!
//! let output = client.execute("Samples", DEMO_QUERY).await.unwrap();
//! assert!(output.is_success());
//! assert_eq!(output.primary_results().count(), 1);
//! # }
//! ```

use std::future::Future;

use crate::decoder::{Decoded, DecoderConfig, FrameDecoder};
use crate::error::Result;
use crate::model::{CompletedTable, CompletionStatus, QueryOutcome, TableKind};
use crate::render::{render_table, RenderOptions};
use crate::protocol::Frame;
use crate::transport::{BoxFuture, ClientRequestProperties, ResultSetStream, Session};

/// Application name used in client request ids unless overridden.
pub const DEFAULT_APPLICATION_NAME: &str = "queryv2-client";

/// Request option asking the service for progressive frames.
pub const PROGRESSIVE_OPTION: &str = "results_progressive_enabled";

/// Everything produced by one decoded result set.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    /// Rendered text of the whole result set.
    pub text: String,
    /// Protocol version from the `DataSetHeader`.
    pub version: String,
    pub is_progressive: bool,
    /// Completed tables in arrival order.
    pub tables: Vec<CompletedTable>,
    pub completion: CompletionStatus,
    /// Number of frames consumed, unknown ones included.
    pub frame_count: usize,
}

impl QueryOutput {
    pub fn tables_of_kind<'a>(
        &'a self,
        kind: &'a TableKind,
    ) -> impl Iterator<Item = &'a CompletedTable> + 'a {
        self.tables.iter().filter(move |t| &t.table_kind == kind)
    }

    /// Tables holding the query's own results.
    pub fn primary_results(&self) -> impl Iterator<Item = &CompletedTable> {
        self.tables
            .iter()
            .filter(|t| t.table_kind == TableKind::PrimaryResult)
    }

    #[inline]
    pub fn outcome(&self) -> QueryOutcome {
        self.completion.outcome()
    }

    /// Check if the service reported neither errors nor cancellation.
    pub fn is_success(&self) -> bool {
        self.outcome() == QueryOutcome::Succeeded
    }

    /// One-line summary, e.g. `query failed: <exception> (1 tables in 4 frames)`.
    pub fn summary(&self) -> String {
        format!(
            "{} ({} tables in {} frames)",
            self.outcome(),
            self.tables.len(),
            self.frame_count
        )
    }
}

/// Await a pending result set, then decode and render it.
///
/// The stream is closed before returning on every path. On error the
/// partial output is dropped and only the error is returned. If the returned
/// future is dropped mid-stream, e.g. by a timeout, the close runs as a task
/// on the current tokio runtime.
///
/// # Errors
///
/// - `Transport` if the submission or a frame pull fails
/// - `ProtocolDecode` / `ProtocolSequence` if the result set is malformed
pub async fn decode_and_render<F>(
    pending: F,
    config: &DecoderConfig,
    options: &RenderOptions,
) -> Result<QueryOutput>
where
    F: Future<Output = Result<Box<dyn ResultSetStream>>>,
{
    let mut stream = ScopedStream::new(pending.await?);
    let result = read_loop(&mut stream, config, options).await;
    stream.close().await;

    if let Err(e) = &result {
        tracing::debug!(error = %e, "result set aborted");
    }
    result
}

/// Owns the stream for one decode; closes it in the background if dropped
/// before [`ResultSetStream::close`] ran.
struct ScopedStream {
    inner: Option<Box<dyn ResultSetStream>>,
}

impl ScopedStream {
    fn new(stream: Box<dyn ResultSetStream>) -> Self {
        Self {
            inner: Some(stream),
        }
    }
}

impl ResultSetStream for ScopedStream {
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<Frame>>> {
        match self.inner.as_mut() {
            Some(stream) => stream.next_frame(),
            None => Box::pin(async { Ok(None) }),
        }
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        let stream = self.inner.take();
        Box::pin(async move {
            if let Some(mut stream) = stream {
                stream.close().await;
            }
        })
    }
}

impl Drop for ScopedStream {
    fn drop(&mut self) {
        let Some(mut stream) = self.inner.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("result set dropped mid-stream, closing in the background");
                handle.spawn(async move {
                    stream.close().await;
                });
            }
            Err(_) => {
                tracing::warn!("result set dropped outside a tokio runtime, stream not closed");
            }
        }
    }
}

/// Pull frames until the stream ends.
async fn read_loop(
    stream: &mut dyn ResultSetStream,
    config: &DecoderConfig,
    options: &RenderOptions,
) -> Result<QueryOutput> {
    let mut decoder = FrameDecoder::new(config.clone());
    let mut output = QueryOutput {
        text: String::new(),
        version: String::new(),
        is_progressive: false,
        tables: Vec::new(),
        completion: CompletionStatus::default(),
        frame_count: 0,
    };

    while let Some(frame) = stream.next_frame().await? {
        let decoded = decoder.decode(frame)?;
        dispatch_decoded(decoded, &mut output, options);
    }
    decoder.finish()?;

    output.frame_count = decoder.frames_seen();
    Ok(output)
}

/// Write one decoded frame into the output.
fn dispatch_decoded(decoded: Decoded, output: &mut QueryOutput, options: &RenderOptions) {
    match decoded {
        Decoded::Header {
            version,
            is_progressive,
        } => {
            output.text.push_str(&format!("DataSetHeader: Version={}\n\n", version));
            output.version = version;
            output.is_progressive = is_progressive;
        }
        Decoded::Table(table) => {
            output
                .text
                .push_str(&render_table(&table.banner(), &table.dataset, options));
            output.text.push('\n');
            output.tables.push(table);
        }
        Decoded::Progress { table_id, progress } => {
            tracing::debug!(table_id, progress, "table progress");
        }
        Decoded::Acknowledged(_) | Decoded::Ignored { .. } => {}
        Decoded::Completion {
            status,
            frame_index,
        } => {
            output.text.push_str(&status.line(frame_index));
            output.text.push('\n');
            output.completion = status;
        }
    }
}

/// Builder for [`QueryClient`].
#[derive(Debug, Clone)]
pub struct QueryClientBuilder {
    application_name: String,
    request_progressive: bool,
    decoder_config: DecoderConfig,
    render_options: RenderOptions,
}

impl QueryClientBuilder {
    pub fn new() -> Self {
        Self {
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            request_progressive: false,
            decoder_config: DecoderConfig::default(),
            render_options: RenderOptions::default(),
        }
    }

    /// Set the application name used in client request ids.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Ask the service for progressive frames (default: false).
    pub fn request_progressive(mut self, enabled: bool) -> Self {
        self.request_progressive = enabled;
        self
    }

    /// Assemble progressive tables instead of dropping them (default: true).
    pub fn assemble_progressive(mut self, enabled: bool) -> Self {
        self.decoder_config.assemble_progressive = enabled;
        self
    }

    pub fn render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    pub fn build<S: Session>(self, session: S) -> QueryClient<S> {
        QueryClient {
            session,
            application_name: self.application_name,
            request_progressive: self.request_progressive,
            decoder_config: self.decoder_config,
            render_options: self.render_options,
        }
    }
}

impl Default for QueryClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs queries on a [`Session`] and renders their result sets.
pub struct QueryClient<S> {
    session: S,
    application_name: String,
    request_progressive: bool,
    decoder_config: DecoderConfig,
    render_options: RenderOptions,
}

impl<S: Session> QueryClient<S> {
    /// Create a client with default options.
    pub fn new(session: S) -> Self {
        QueryClientBuilder::new().build(session)
    }

    /// Fresh request properties for one query.
    pub fn request_properties(&self) -> ClientRequestProperties {
        let mut properties = ClientRequestProperties::new(&self.application_name);
        if self.request_progressive {
            properties.set_option(PROGRESSIVE_OPTION, "true");
        }
        properties
    }

    /// Run a query with fresh request properties.
    pub async fn execute(&self, database: &str, query: &str) -> Result<QueryOutput> {
        self.execute_with(database, query, self.request_properties())
            .await
    }

    /// Run a query with caller-supplied properties, e.g. to keep the
    /// cancellation token.
    pub async fn execute_with(
        &self,
        database: &str,
        query: &str,
        properties: ClientRequestProperties,
    ) -> Result<QueryOutput> {
        tracing::debug!(
            database,
            client_request_id = properties.client_request_id(),
            "executing query"
        );
        let pending = self.session.submit_query(database, query, properties);
        decode_and_render(pending, &self.decoder_config, &self.render_options).await
    }

    #[inline]
    pub fn session(&self) -> &S {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnType};
    use crate::protocol::{
        DataTable, Frame, TableCompletion, TableFragment, TableFragmentType, TableHeader,
    };
    use crate::transport::{MockSession, ScriptStep, DEMO_QUERY};
    use serde_json::json;

    fn welcome_table(id: i32) -> Frame {
        Frame::DataTable(DataTable {
            table_id: id,
            table_name: "PrimaryResult".to_string(),
            table_kind: TableKind::PrimaryResult,
            columns: vec![
                Column::new("Welcome", ColumnType::String),
                Column::new("PI", ColumnType::Real),
            ],
            rows: vec![vec![json!("Hello, World!"), json!(3.141592653589793)]],
        })
    }

    fn progressive_frames() -> Vec<Frame> {
        vec![
            Frame::header("v2.0"),
            Frame::TableHeader(TableHeader {
                table_id: 0,
                table_name: "PrimaryResult".to_string(),
                table_kind: TableKind::PrimaryResult,
                columns: vec![Column::new("N", ColumnType::Long)],
            }),
            Frame::TableFragment(TableFragment {
                table_id: 0,
                table_fragment_type: TableFragmentType::DataAppend,
                rows: vec![vec![json!(1)], vec![json!(2)]],
            }),
            Frame::TableFragment(TableFragment {
                table_id: 0,
                table_fragment_type: TableFragmentType::DataAppend,
                rows: vec![vec![json!(3)]],
            }),
            Frame::TableCompletion(TableCompletion {
                table_id: 0,
                row_count: Some(3),
                one_api_errors: None,
            }),
            Frame::completion(false, false, None),
        ]
    }

    #[tokio::test]
    async fn test_rendered_layout() {
        let session = MockSession::new().respond_by_default(vec![
            Frame::header("v2.0"),
            welcome_table(0),
            Frame::completion(false, false, None),
        ]);
        let client = QueryClient::new(session);

        let output = client.execute("db", "print").await.unwrap();
        assert_eq!(
            output.text,
            "DataSetHeader: Version=v2.0\n\
             \n\
             [1] DataTable(DataTableFrame): TableId=0, TableName=PrimaryResult, TableKind=PrimaryResult\n\
             Welcome | PI\n\
             Hello, World! | 3.141592653589793\n\
             \n\
             [2] DataSetCompletion(CompletionFrame): HasErrors=false, Cancelled=false, Exception=\n"
        );
        assert_eq!(output.version, "v2.0");
        assert_eq!(output.frame_count, 3);
        assert!(output.is_success());
    }

    #[tokio::test]
    async fn test_demo_query() {
        let client = QueryClient::new(MockSession::demo());
        let output = client.execute("Samples", DEMO_QUERY).await.unwrap();

        assert_eq!(output.tables.len(), 3);
        let primary: Vec<_> = output.primary_results().collect();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].dataset.value(0, "Welcome"), Some(&json!("Hello, World!")));
        assert_eq!(
            primary[0].dataset.value(0, "PI"),
            Some(&json!(std::f64::consts::PI))
        );
        assert!(output.text.contains("\nWelcome | PI\nHello, World! | 3.141592653589793\n"));
        assert_eq!(
            output
                .tables_of_kind(&TableKind::QueryCompletionInformation)
                .count(),
            1
        );
        assert_eq!(client.session().closed_streams(), 1);
    }

    #[tokio::test]
    async fn test_progressive_assembly() {
        let session = MockSession::new().respond_by_default(progressive_frames());
        let client = QueryClientBuilder::new().request_progressive(true).build(session);

        let output = client.execute("db", "range").await.unwrap();
        assert!(output.text.contains(
            "[4] TableCompletion(TableCompletionFrame): TableId=0, TableName=PrimaryResult, TableKind=PrimaryResult\nN\n1\n2\n3\n"
        ));
        assert_eq!(output.tables[0].dataset.row_count(), 3);

        let submissions = client.session().submissions();
        assert_eq!(
            submissions[0].properties.option(PROGRESSIVE_OPTION),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_progressive_frames_dropped_without_assembly() {
        let session = MockSession::new().respond_by_default(progressive_frames());
        let client = QueryClientBuilder::new()
            .assemble_progressive(false)
            .build(session);

        let output = client.execute("db", "range").await.unwrap();
        assert!(output.tables.is_empty());
        assert_eq!(output.frame_count, 6);
        assert!(output.is_success());
    }

    #[tokio::test]
    async fn test_query_failure_is_data() {
        let session = MockSession::new().respond_by_default(vec![
            Frame::header("v2.0"),
            Frame::completion(true, false, Some("X".to_string())),
        ]);
        let output = QueryClient::new(session).execute("db", "bad").await.unwrap();

        assert!(!output.is_success());
        assert_eq!(output.outcome(), QueryOutcome::Failed("X".to_string()));
        assert_eq!(output.summary(), "query failed: X (0 tables in 2 frames)");
        assert!(output.text.ends_with("HasErrors=true, Cancelled=false, Exception=X\n"));
    }

    #[tokio::test]
    async fn test_cancelled_query() {
        let client = QueryClient::new(MockSession::demo());
        let properties = client.request_properties();
        properties.cancellation().cancel();

        let output = client
            .execute_with("Samples", DEMO_QUERY, properties)
            .await
            .unwrap();
        assert_eq!(output.outcome(), QueryOutcome::Cancelled);
        assert!(output.tables.is_empty());
    }

    #[tokio::test]
    async fn test_sequence_error_closes_stream() {
        let session = MockSession::new().respond_by_default(vec![welcome_table(0)]);
        let client = QueryClient::new(session);

        let err = client.execute("db", "q").await.unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(client.session().closed_streams(), 1);
    }

    #[tokio::test]
    async fn test_missing_completion_is_error() {
        let session =
            MockSession::new().respond_by_default(vec![Frame::header("v2.0"), welcome_table(0)]);
        let client = QueryClient::new(session);

        let err = client.execute("db", "q").await.unwrap_err();
        assert!(err.to_string().contains("DataSetCompletion"));
        assert_eq!(client.session().closed_streams(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_closes_stream() {
        let session = MockSession::new().script(
            "q",
            vec![
                Frame::header("v2.0").into(),
                welcome_table(0).into(),
                ScriptStep::TransportError("connection reset by peer".to_string()),
            ],
        );
        let client = QueryClient::new(session);

        let err = client.execute("db", "q").await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(client.session().closed_streams(), 1);
    }

    #[tokio::test]
    async fn test_failed_submission_propagates() {
        let client = QueryClient::new(MockSession::demo().fail_submissions("no route to host"));
        let err = client.execute("Samples", DEMO_QUERY).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(client.session().closed_streams(), 0);
    }

    /// Yields its frames, then never produces another one.
    struct StalledStream {
        frames: std::collections::VecDeque<Frame>,
        closed: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl ResultSetStream for StalledStream {
        fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<Frame>>> {
            Box::pin(async move {
                match self.frames.pop_front() {
                    Some(frame) => Ok(Some(frame)),
                    None => std::future::pending().await,
                }
            })
        }

        fn close(&mut self) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                self.closed
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
        }
    }

    #[tokio::test]
    async fn test_dropped_decode_still_closes_stream() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::task::Poll;

        let closed = Arc::new(AtomicUsize::new(0));
        let stream = StalledStream {
            frames: vec![Frame::header("v2.0")].into(),
            closed: closed.clone(),
        };
        let pending = async move {
            Ok::<_, crate::error::QueryV2Error>(Box::new(stream) as Box<dyn ResultSetStream>)
        };

        let config = DecoderConfig::default();
        let options = RenderOptions::default();
        let mut decode = Box::pin(decode_and_render(pending, &config, &options));
        let still_running =
            std::future::poll_fn(|cx| Poll::Ready(decode.as_mut().poll(cx).is_pending())).await;
        assert!(still_running);
        assert_eq!(closed.load(Ordering::SeqCst), 0);

        drop(decode);
        for _ in 0..10 {
            if closed.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completed_decode_closes_once() {
        let closed = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let stream = StalledStream {
            frames: vec![Frame::header("v2.0"), Frame::completion(false, false, None)].into(),
            closed: closed.clone(),
        };
        let mut scoped = ScopedStream::new(Box::new(stream));
        assert!(scoped.next_frame().await.unwrap().is_some());
        scoped.close().await;
        scoped.close().await;
        assert!(scoped.next_frame().await.unwrap().is_none());
        drop(scoped);
        tokio::task::yield_now().await;
        assert_eq!(closed.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_request_properties_use_application_name() {
        let client = QueryClientBuilder::new()
            .application_name("tests")
            .build(MockSession::new());
        let properties = client.request_properties();
        assert!(properties.client_request_id().starts_with("tests;"));
        assert_eq!(properties.option(PROGRESSIVE_OPTION), None);
    }
}
