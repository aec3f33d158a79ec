//! Client-facing logging (`notifications/message`).
//!
//! Every entry is also mirrored to `tracing` so server operators see what the
//! client was told. Delivery to the client is best effort: with no sink, or a
//! full channel, the entry only reaches the local log.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::notify::NotificationSink;
use crate::types::{LogLevel, LoggingNotification, ServerNotification};

/// Logger bound to one request's notification sink.
#[derive(Clone, Default)]
pub struct McpLog {
    sink: Option<Arc<dyn NotificationSink>>,
    logger: Option<String>,
}

impl McpLog {
    /// Create a logger writing to `sink`.
    #[must_use]
    pub fn new(sink: Option<Arc<dyn NotificationSink>>) -> Self {
        Self { sink, logger: None }
    }

    /// Tag entries with a logger name (usually the tool name).
    #[must_use]
    pub fn named(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    /// Log at debug level.
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    /// Log at info level.
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    /// Log at warning level.
    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    /// Log at error level.
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Send a log entry at `level`.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        let logger = self.logger.as_deref().unwrap_or("mcp");
        match level {
            LogLevel::Debug => debug!(logger, "{}", message),
            LogLevel::Info | LogLevel::Notice => info!(logger, "{}", message),
            LogLevel::Warning => warn!(logger, "{}", message),
            _ => error!(logger, "{}", message),
        }

        let Some(sink) = &self.sink else {
            return;
        };
        let notification = ServerNotification::Message(LoggingNotification {
            level,
            data: Value::String(message),
            logger: self.logger.clone(),
        });
        if let Err(e) = sink.send(notification) {
            debug!(error = %e, "Client log notification dropped");
        }
    }
}

impl fmt::Debug for McpLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpLog")
            .field("logger", &self.logger)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
