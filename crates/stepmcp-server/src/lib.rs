//! # stepmcp Server
//!
//! MCP server runtime built around a bounded, progress-tracked task runner.
//!
//! ## Features
//!
//! - **Task runner** - paced sub-steps off the request task, with progress
//!   notifications, cancellation and a single-assignment result
//! - **Tool registry** - name-indexed async tools
//! - **Built-in tools** - `theAnswer`, `justTestSampling`, `longRunning`
//! - **Configuration** - TOML/YAML/JSON files with `STEPMCP_` env overrides
//! - **Logging** - stderr and rolling-file `tracing` output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stepmcp_server::prelude::*;
//!
//! # async fn run() -> McpResult<()> {
//! let server = Server::builder().build()?;
//! let (ctx, mut notifications) = server.request_context("req-1");
//! let ctx = ctx.with_progress_token("req-1");
//!
//! tokio::spawn(async move {
//!     while let Some(n) = notifications.recv().await {
//!         eprintln!("{:?}", n);
//!     }
//! });
//!
//! let result = server.call_tool("longRunning", ToolArguments::new(), ctx).await?;
//! assert_eq!(result.first_text(), Some("ok"));
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

pub mod config;
pub mod helpers;
pub mod logging;
pub mod registry;
pub mod runner;
pub mod server;
pub mod system;
pub mod tools;

pub use config::{
    ConfigError, ConfigurationBuilder, LogOutput, LogRotation, LoggingConfig, LongRunningConfig,
    RunnerConfig, ServerConfig, UnsupportedProgress,
};
pub use logging::LoggingGuard;
pub use registry::{ToolArgument, ToolArguments, ToolDescriptor, ToolHandler, ToolRegistry};
pub use runner::{
    ResultSlot, StepFn, StepPlan, StepWork, TaskHandle, TaskRunner, TaskStatus,
    UNSUPPORTED_PROGRESS_RESPONSE,
};
pub use server::{Server, ServerBuilder};
pub use system::SystemClock;

/// Default server name
pub const SERVER_NAME: &str = "stepmcp";

/// Crate version, used as the default server version
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports for building on the server
pub mod prelude {
    pub use crate::{
        LoggingConfig, ResultSlot, Server, ServerBuilder, ServerConfig, StepFn, StepPlan,
        StepWork, TaskHandle, TaskRunner, TaskStatus, ToolArgument, ToolArguments,
        ToolDescriptor, ToolHandler, UNSUPPORTED_PROGRESS_RESPONSE,
    };
    pub use async_trait::async_trait;
    pub use stepmcp_core::{
        CallToolResult, ErrorKind, McpError, McpResult, Progress, ProgressToken, RequestContext,
        Sampler, ServerNotification,
    };
}
