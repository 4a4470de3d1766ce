//! Client request properties sent along with every query.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

/// Cooperative cancellation signal shared with the session.
///
/// Cloning shares the same flag.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Properties attached to one query submission.
///
/// The client request id correlates the request on the service side and is
/// the handle for server-side cancellation.
#[derive(Debug, Clone)]
pub struct ClientRequestProperties {
    client_request_id: String,
    options: BTreeMap<String, String>,
    cancellation: CancellationToken,
}

impl ClientRequestProperties {
    /// Create properties with a fresh `<application>;<uuid>` request id.
    pub fn new(application: &str) -> Self {
        Self::with_client_request_id(format!("{};{}", application, Uuid::new_v4()))
    }

    /// Create properties with an explicit request id.
    pub fn with_client_request_id(client_request_id: impl Into<String>) -> Self {
        Self {
            client_request_id: client_request_id.into(),
            options: BTreeMap::new(),
            cancellation: CancellationToken::new(),
        }
    }

    #[inline]
    pub fn client_request_id(&self) -> &str {
        &self.client_request_id
    }

    /// Set a request option, e.g. `results_progressive_enabled`.
    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Replace the cancellation token, e.g. to share one across queries.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    #[inline]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_format() {
        let properties = ClientRequestProperties::new("query-v2");
        let (app, id) = properties.client_request_id().split_once(';').unwrap();
        assert_eq!(app, "query-v2");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = ClientRequestProperties::new("app");
        let b = ClientRequestProperties::new("app");
        assert_ne!(a.client_request_id(), b.client_request_id());
    }

    #[test]
    fn test_options() {
        let mut properties = ClientRequestProperties::with_client_request_id("fixed");
        properties
            .set_option("results_progressive_enabled", "true")
            .set_option("servertimeout", "00:01:00");
        assert_eq!(properties.option("results_progressive_enabled"), Some("true"));
        assert_eq!(properties.options().len(), 2);
        assert_eq!(properties.option("missing"), None);
    }

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let properties = ClientRequestProperties::new("app").with_cancellation(token.clone());
        assert!(!properties.cancellation().is_cancelled());
        token.cancel();
        assert!(properties.cancellation().is_cancelled());
    }
}
