//! Server facade
//!
//! Owns the tool registry, the task runner and the start-time clock, and
//! dispatches tool calls. Transports sit in front of this and are not part of
//! this crate.

use std::sync::Arc;

use serde_json::Value;
use stepmcp_core::{
    CallToolResult, McpError, McpResult, RequestContext, ServerNotification, channel_sink,
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::ServerConfig;
use crate::registry::{ToolArguments, ToolDescriptor, ToolHandler, ToolRegistry};
use crate::runner::TaskRunner;
use crate::system::SystemClock;
use crate::tools;

/// Builder for [`Server`]
pub struct ServerBuilder {
    config: ServerConfig,
    tools: Vec<Arc<dyn ToolHandler>>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("extra_tools", &self.tools.len())
            .finish()
    }
}

impl ServerBuilder {
    /// Create a new server builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            tools: Vec::new(),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an extra tool next to the built-in ones
    #[must_use]
    pub fn tool<T>(mut self, tool: T) -> Self
    where
        T: ToolHandler + 'static,
    {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Build the server
    ///
    /// # Errors
    ///
    /// - `Configuration` if the configuration doesn't validate
    /// - `InvalidParams` if two tools share a name
    pub fn build(self) -> McpResult<Server> {
        self.config
            .validate()
            .map_err(|e| McpError::configuration(e.to_string()))?;

        let runner = TaskRunner::new(&self.config.runner);
        let registry = ToolRegistry::new();
        for tool in tools::builtin(runner.clone(), self.config.long_running.clone()) {
            registry.register(tool)?;
        }
        for tool in self.tools {
            registry.register(tool)?;
        }

        info!(
            name = %self.config.name,
            version = %self.config.version,
            tools = registry.len(),
            max_concurrent_tasks = self.config.runner.max_concurrent_tasks,
            "Server built"
        );

        Ok(Server {
            config: self.config,
            registry,
            runner,
            clock: SystemClock::start(),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An MCP server with its tools and task runner
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    registry: ToolRegistry,
    runner: TaskRunner,
    clock: SystemClock,
}

impl Server {
    /// Start building a server
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The configuration the server was built with
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Descriptors of all registered tools, sorted by name
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry.list()
    }

    /// Dispatch a tool call
    ///
    /// # Errors
    ///
    /// `ToolNotFound` for unknown tools, otherwise the tool's own error.
    pub async fn call_tool(
        &self,
        name: &str,
        args: ToolArguments,
        ctx: RequestContext,
    ) -> McpResult<CallToolResult> {
        let span = info_span!("tool_call", tool = %name, request_id = %ctx.request_id());
        async {
            debug!("Dispatching tool call");
            let result = self
                .registry
                .call(name, args, ctx.clone())
                .await
                .map_err(|e| e.with_request_id(ctx.request_id()));
            match &result {
                Ok(_) => debug!(elapsed_ms = ctx.elapsed().as_millis() as u64, "Tool call finished"),
                Err(e) => warn!(error = %e, "Tool call failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Dispatch a tool call with raw JSON arguments
    ///
    /// # Errors
    ///
    /// `InvalidParams` if `args` is neither an object nor null, otherwise as
    /// [`call_tool`](Self::call_tool).
    pub async fn call_tool_json(
        &self,
        name: &str,
        args: Value,
        ctx: RequestContext,
    ) -> McpResult<CallToolResult> {
        let args = ToolArguments::try_from(args)?;
        self.call_tool(name, args, ctx).await
    }

    /// A request context wired to a fresh notification channel sized by
    /// `notification_buffer`. The receiver yields the request's progress and
    /// log notifications.
    #[must_use]
    pub fn request_context(
        &self,
        request_id: impl Into<String>,
    ) -> (RequestContext, mpsc::Receiver<ServerNotification>) {
        let (sink, rx) = channel_sink(self.config.notification_buffer);
        let ctx = RequestContext::with_id(request_id).with_notifier(Arc::new(sink));
        (ctx, rx)
    }

    /// The task runner
    #[must_use]
    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Start time and uptime
    #[must_use]
    pub fn clock(&self) -> &SystemClock {
        &self.clock
    }

    /// Cancel running tasks and refuse new ones
    pub fn shutdown(&self) {
        info!(
            up_time_secs = self.clock.up_time().num_seconds(),
            "Server shutting down"
        );
        self.runner.shutdown();
    }
}
