//! Request context handed to tool handlers.
//!
//! Carries the client capabilities negotiated for one request (progress
//! token, notification sink, sampler) plus cooperative cancellation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::log::McpLog;
use crate::notify::NotificationSink;
use crate::progress::Progress;
use crate::sampling::{Sampler, Sampling};
use crate::types::ProgressToken;

/// Context information for one MCP request.
///
/// # Example
///
/// ```
/// use stepmcp_core::RequestContext;
///
/// let ctx = RequestContext::with_id("req-1").with_progress_token("req-1");
///
/// assert_eq!(ctx.request_id(), "req-1");
/// assert!(ctx.progress().is_supported());
/// assert!(!ctx.sampling().is_supported());
/// ```
#[derive(Clone)]
pub struct RequestContext {
    request_id: String,
    start_time: Instant,
    progress_token: Option<ProgressToken>,
    notifier: Option<Arc<dyn NotificationSink>>,
    sampler: Option<Arc<dyn Sampler>>,
    cancellation_token: Option<CancellationToken>,
    metadata: HashMap<String, serde_json::Value>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Create a new request context with a generated UUID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            start_time: Instant::now(),
            progress_token: None,
            notifier: None,
            sampler: None,
            cancellation_token: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a new request context with a specific request ID.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            request_id: id.into(),
            ..Self::new()
        }
    }

    /// Set the progress token the client sent.
    #[must_use]
    pub fn with_progress_token(mut self, token: impl Into<ProgressToken>) -> Self {
        self.progress_token = Some(token.into());
        self
    }

    /// Set the sink for server-to-client notifications.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the sampler (client supports `sampling/createMessage`).
    #[must_use]
    pub fn with_sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Add a metadata key-value pair.
    #[must_use]
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Get the request ID.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Progress capability for this request.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress::new(self.progress_token.clone(), self.notifier.clone())
    }

    /// Sampling capability for this request.
    #[must_use]
    pub fn sampling(&self) -> Sampling {
        Sampling::new(self.sampler.clone())
    }

    /// Client logger for this request.
    #[must_use]
    pub fn log(&self) -> McpLog {
        McpLog::new(self.notifier.clone())
    }

    /// The cancellation token, if one was attached.
    #[must_use]
    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.cancellation_token.as_ref()
    }

    /// Check if the request has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Get a metadata value.
    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Get the elapsed time since request processing started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("progress_token", &self.progress_token)
            .field("has_notifier", &self.notifier.is_some())
            .field("has_sampler", &self.sampler.is_some())
            .field("cancelled", &self.is_cancelled())
            .field("metadata", &self.metadata)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::channel_sink;

    #[test]
    fn test_new_context() {
        let ctx = RequestContext::new();
        assert!(!ctx.request_id().is_empty());
        assert!(!ctx.is_cancelled());
        assert!(!ctx.progress().is_supported());
        assert!(!ctx.sampling().is_supported());
    }

    #[test]
    fn test_progress_token_enables_progress() {
        let (sink, _rx) = channel_sink(1);
        let ctx = RequestContext::new()
            .with_progress_token(5i64)
            .with_notifier(Arc::new(sink));

        let progress = ctx.progress();
        assert!(progress.is_supported());
        assert_eq!(progress.token(), Some(&ProgressToken::Number(5)));
    }

    #[test]
    fn test_metadata() {
        let ctx = RequestContext::new()
            .with_metadata("key1", "value1")
            .with_metadata("key2", serde_json::json!(42));

        assert_eq!(
            ctx.get_metadata("key1"),
            Some(&serde_json::Value::String("value1".to_string()))
        );
        assert_eq!(ctx.get_metadata("key2"), Some(&serde_json::json!(42)));
        assert_eq!(ctx.get_metadata("key3"), None);
    }

    #[test]
    fn test_cancellation() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new().with_cancellation_token(token.clone());

        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
