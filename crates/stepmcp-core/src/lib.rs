//! # stepmcp Core
//!
//! Building blocks shared by stepmcp servers:
//!
//! - [`error`] - the unified [`McpError`] type
//! - [`types`] - MCP wire types for progress, logging, sampling and tool results
//! - [`notify`] - non-blocking server-to-client notification sinks
//! - [`progress`] - progress tokens and single-owner progress trackers
//! - [`sampling`] - server-initiated LLM sampling requests
//! - [`log`] - client-facing logging
//! - [`context`] - the per-request [`RequestContext`]

#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod log;
pub mod notify;
pub mod progress;
pub mod sampling;
pub mod types;

pub use context::RequestContext;
pub use error::{ErrorContext, ErrorKind, McpError, McpResult};
pub use log::McpLog;
pub use notify::{ChannelSink, NotificationSink, channel_sink};
pub use progress::{MessageBuilder, Progress, ProgressTracker, ProgressTrackerBuilder};
pub use sampling::{SAMPLING_NOT_SUPPORTED, Sampler, Sampling, SamplingRequest, SamplingRequestBuilder};
pub use types::{
    CallToolResult, Content, CreateMessageRequest, CreateMessageResult, LogLevel,
    LoggingNotification, ProgressNotification, ProgressToken, Role, SamplingMessage,
    ServerNotification,
};
