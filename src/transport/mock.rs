//! Scripted session for tests and the demonstration binary.
//!
//! [`MockSession`] answers queries with pre-built frame sequences and
//! records every submission so tests can inspect the request properties.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;

use super::{BoxFuture, ClientRequestProperties, ResultSetStream, Session};
use crate::error::Result;
use crate::model::{Column, ColumnType, TableKind};
use crate::protocol::{DataTable, Frame, PROTOCOL_VERSION};

/// The fixed demonstration query.
pub const DEMO_QUERY: &str = "print Welcome='Hello, World!'; print PI=pi()";

/// One step of a scripted response.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Frame(Frame),
    /// Fail the pull with a transport error carrying this message.
    TransportError(String),
}

impl From<Frame> for ScriptStep {
    fn from(frame: Frame) -> Self {
        ScriptStep::Frame(frame)
    }
}

/// A stream replaying scripted steps.
pub struct ScriptedStream {
    steps: VecDeque<ScriptStep>,
    closed: bool,
    close_counter: Arc<AtomicUsize>,
}

impl ScriptedStream {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self::with_close_counter(steps, Arc::new(AtomicUsize::new(0)))
    }

    fn with_close_counter(
        steps: impl IntoIterator<Item = ScriptStep>,
        close_counter: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            closed: false,
            close_counter,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ResultSetStream for ScriptedStream {
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<Frame>>> {
        Box::pin(async move {
            if self.closed {
                return Ok(None);
            }
            match self.steps.pop_front() {
                Some(ScriptStep::Frame(frame)) => Ok(Some(frame)),
                Some(ScriptStep::TransportError(message)) => Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    message,
                )
                .into()),
                None => Ok(None),
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.closed {
                self.closed = true;
                self.steps.clear();
                self.close_counter.fetch_add(1, Ordering::AcqRel);
            }
        })
    }
}

/// A recorded query submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub database: String,
    pub query: String,
    pub properties: ClientRequestProperties,
}

/// Session answering queries from a script.
///
/// Queries without a scripted response get a result set that reports the
/// failure in its `DataSetCompletion`, like a service would.
#[derive(Default)]
pub struct MockSession {
    responses: HashMap<String, Vec<ScriptStep>>,
    default_response: Option<Vec<ScriptStep>>,
    submit_error: Option<String>,
    submissions: Mutex<Vec<Submission>>,
    closed_streams: Arc<AtomicUsize>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with the given frames.
    pub fn respond_to(self, query: &str, frames: Vec<Frame>) -> Self {
        self.script(query, frames.into_iter().map(ScriptStep::from).collect())
    }

    /// Answer `query` with the given steps, which may include transport errors.
    pub fn script(mut self, query: &str, steps: Vec<ScriptStep>) -> Self {
        self.responses.insert(query.to_string(), steps);
        self
    }

    /// Answer every query without its own script with these frames.
    pub fn respond_by_default(mut self, frames: Vec<Frame>) -> Self {
        self.default_response = Some(frames.into_iter().map(ScriptStep::from).collect());
        self
    }

    /// Make every submission fail before any frame is produced.
    pub fn fail_submissions(mut self, message: &str) -> Self {
        self.submit_error = Some(message.to_string());
        self
    }

    /// Session answering [`DEMO_QUERY`].
    pub fn demo() -> Self {
        Self::new().respond_to(DEMO_QUERY, demo_frames())
    }

    /// All submissions so far, oldest first.
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of streams handed out and then closed.
    pub fn closed_streams(&self) -> usize {
        self.closed_streams.load(Ordering::Acquire)
    }

    fn steps_for(&self, query: &str, properties: &ClientRequestProperties) -> Vec<ScriptStep> {
        if properties.cancellation().is_cancelled() {
            return vec![
                Frame::header(PROTOCOL_VERSION).into(),
                Frame::completion(false, true, None).into(),
            ];
        }
        match self.responses.get(query).or(self.default_response.as_ref()) {
            Some(steps) => steps.clone(),
            None => vec![
                Frame::header(PROTOCOL_VERSION).into(),
                Frame::completion(
                    true,
                    false,
                    Some(format!("no scripted response for query: {}", query)),
                )
                .into(),
            ],
        }
    }
}

impl Session for MockSession {
    fn submit_query<'a>(
        &'a self,
        database: &'a str,
        query: &'a str,
        properties: ClientRequestProperties,
    ) -> BoxFuture<'a, Result<Box<dyn ResultSetStream>>> {
        Box::pin(async move {
            tracing::debug!(
                database,
                client_request_id = properties.client_request_id(),
                "submitting query"
            );

            let steps = self.steps_for(query, &properties);
            self.submissions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Submission {
                    database: database.to_string(),
                    query: query.to_string(),
                    properties,
                });

            if let Some(message) = &self.submit_error {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    message.clone(),
                )
                .into());
            }

            let stream = ScriptedStream::with_close_counter(steps, self.closed_streams.clone());
            Ok(Box::new(stream) as Box<dyn ResultSetStream>)
        })
    }
}

/// Result set for [`DEMO_QUERY`]: a single primary result holding both
/// printed columns, framed by the query properties and completion
/// information tables.
fn demo_frames() -> Vec<Frame> {
    vec![
        Frame::header(PROTOCOL_VERSION),
        Frame::DataTable(DataTable {
            table_id: 0,
            table_name: "@ExtendedProperties".to_string(),
            table_kind: TableKind::QueryProperties,
            columns: vec![
                Column::new("TableId", ColumnType::Int),
                Column::new("Key", ColumnType::String),
                Column::new("Value", ColumnType::Dynamic),
            ],
            rows: vec![
                vec![json!(1), json!("Visualization"), json!({"Visualization": null, "Title": null})],
            ],
        }),
        Frame::DataTable(DataTable {
            table_id: 1,
            table_name: "PrimaryResult".to_string(),
            table_kind: TableKind::PrimaryResult,
            columns: vec![
                Column::new("Welcome", ColumnType::String),
                Column::new("PI", ColumnType::Real),
            ],
            rows: vec![vec![json!("Hello, World!"), json!(std::f64::consts::PI)]],
        }),
        Frame::DataTable(DataTable {
            table_id: 2,
            table_name: "QueryCompletionInformation".to_string(),
            table_kind: TableKind::QueryCompletionInformation,
            columns: vec![
                Column::new("Timestamp", ColumnType::DateTime),
                Column::new("Level", ColumnType::Int),
                Column::new("LevelName", ColumnType::String),
                Column::new("StatusCode", ColumnType::Int),
                Column::new("StatusCodeName", ColumnType::String),
                Column::new("Payload", ColumnType::String),
            ],
            rows: vec![vec![
                json!("2024-01-01T00:00:00.0000000Z"),
                json!(4),
                json!("Info"),
                json!(0),
                json!("S_OK (0)"),
                json!("{\"Count\":1,\"Text\":\"Query completed successfully\"}"),
            ]],
        }),
        Frame::completion(false, false, None),
    ]
}
