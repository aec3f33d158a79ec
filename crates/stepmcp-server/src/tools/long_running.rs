use async_trait::async_trait;
use stepmcp_core::{CallToolResult, McpResult, RequestContext};
use tracing::{debug, info};

use crate::config::{LongRunningConfig, UnsupportedProgress};
use crate::registry::{ToolArguments, ToolDescriptor, ToolHandler};
use crate::runner::{StepFn, StepPlan, TaskRunner};

/// Result of a finished `longRunning` call.
pub const LONG_RUNNING_RESULT: &str = "ok";

/// Progress message for progress value `i`.
#[must_use]
pub fn long_running_message(i: u64) -> String {
    format!("Long running progress: {}", i)
}

/// `longRunning`: paced sub-steps on the task runner, reported as progress.
#[derive(Debug, Clone)]
pub struct LongRunning {
    runner: TaskRunner,
    config: LongRunningConfig,
}

impl LongRunning {
    /// Bind the tool to a runner.
    #[must_use]
    pub fn new(runner: TaskRunner, config: LongRunningConfig) -> Self {
        Self { runner, config }
    }

    fn plan(&self) -> StepPlan {
        StepPlan::new(self.config.steps)
            .step_delay(self.config.step_delay())
            .message(long_running_message)
    }
}

#[async_trait]
impl ToolHandler for LongRunning {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "longRunning",
            "Runs a slow job and reports its progress to the client",
        )
    }

    async fn call(&self, _args: ToolArguments, ctx: RequestContext) -> McpResult<CallToolResult> {
        let progress = ctx.progress();
        let work = StepFn::new(
            |_| async { McpResult::Ok(()) },
            LONG_RUNNING_RESULT.to_string(),
        );

        let handle = if !progress.is_supported()
            && self.config.unsupported == UnsupportedProgress::RunSilently
        {
            debug!(tool = "longRunning", "No progress token, running without progress");
            self.runner.submit_untracked(self.plan(), work)?
        } else {
            self.runner.submit(&progress, self.plan(), work)?
        };
        info!(tool = "longRunning", task_id = %handle.id(), request_id = %ctx.request_id(), "Task started");

        let outcome = match ctx.cancellation_token() {
            Some(token) => {
                tokio::select! {
                    result = handle.wait() => result,
                    () = token.cancelled() => {
                        handle.cancel();
                        handle.wait().await
                    }
                }
            }
            None => handle.wait().await,
        };
        Ok(CallToolResult::text(outcome?))
    }
}
