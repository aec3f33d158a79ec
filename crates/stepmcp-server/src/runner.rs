//! Progress-tracked task runner
//!
//! Runs long-lived work off the caller's task and hands back a
//! [`TaskHandle`] straight away. The work is split into sub-steps; before each
//! one the runner pauses for the plan's delay, and after each one it advances
//! the request's [`ProgressTracker`] on a fire-and-forget basis.
//!
//! ## Lifecycle
//!
//! ```text
//! CREATED ──permit──▶ RUNNING ──▶ COMPLETED
//!    │                   │
//!    └──cancel──▶ FAILED ◀┘ (step error, panic, cancellation)
//! ```
//!
//! The result lives in a [`ResultSlot`], which accepts exactly one terminal
//! outcome. Later attempts are rejected and leave the first outcome intact.
//!
//! ## Resource bounds
//!
//! - at most `max_concurrent_tasks` tasks execute work at once (semaphore)
//! - at most `max_pending_tasks` tasks are admitted (waiting + running);
//!   submissions past that fail fast with `ServerOverloaded`

use std::any::Any;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use stepmcp_core::progress::{MessageBuilder, Progress, ProgressTracker};
use stepmcp_core::{McpError, McpResult};
use tokio::sync::{Semaphore, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::RunnerConfig;

/// Response returned instead of running the work when the client can't
/// receive progress notifications.
pub const UNSUPPORTED_PROGRESS_RESPONSE: &str = "Client does not support progress notifications!";

// ============================================================================
// Task status and result slot
// ============================================================================

/// Externally visible task state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Admitted, waiting for a pool slot
    Created,
    /// Executing sub-steps
    Running,
    /// Resolved with a value
    Completed,
    /// Resolved with an error (including cancellation)
    Failed,
}

impl TaskStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Running)
                | (Self::Created, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
struct SlotState<T> {
    status: TaskStatus,
    outcome: Option<McpResult<T>>,
}

/// Single-assignment result slot observable by any number of waiters.
///
/// Backed by a `tokio::sync::watch` channel; the check-and-set in
/// [`complete`](Self::complete) and [`fail`](Self::fail) happens under the
/// channel's lock, so racing resolvers cannot both win.
pub struct ResultSlot<T> {
    tx: Arc<watch::Sender<SlotState<T>>>,
}

impl<T> Clone for ResultSlot<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ResultSlot<T> {
    /// A fresh slot in the `Created` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SlotState {
            status: TaskStatus::Created,
            outcome: None,
        });
        Self { tx: Arc::new(tx) }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.tx.borrow().status
    }

    /// The terminal outcome, if resolved.
    #[must_use]
    pub fn outcome(&self) -> Option<McpResult<T>> {
        self.tx.borrow().outcome.clone()
    }

    /// Move `Created` → `Running`. Returns `false` if the slot was not `Created`.
    pub fn mark_running(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if state.status.can_transition_to(TaskStatus::Running) {
                state.status = TaskStatus::Running;
                true
            } else {
                false
            }
        })
    }

    /// Resolve with a value. Returns `false` (and changes nothing) if already resolved.
    pub fn complete(&self, value: T) -> bool {
        self.resolve(TaskStatus::Completed, Ok(value))
    }

    /// Resolve with an error. Returns `false` (and changes nothing) if already resolved.
    pub fn fail(&self, error: McpError) -> bool {
        self.resolve(TaskStatus::Failed, Err(error))
    }

    fn resolve(&self, status: TaskStatus, outcome: McpResult<T>) -> bool {
        let mut outcome = Some(outcome);
        self.tx.send_if_modified(|state| {
            if !state.status.can_transition_to(status) {
                return false;
            }
            state.status = status;
            state.outcome = outcome.take();
            true
        })
    }

    /// Wait for the terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns the error the task was resolved with.
    pub async fn wait(&self) -> McpResult<T> {
        let mut rx = self.tx.subscribe();
        let state = rx
            .wait_for(|state| state.status.is_terminal())
            .await
            .map_err(|_| McpError::internal("Task result channel closed"))?;
        state
            .outcome
            .clone()
            .unwrap_or_else(|| Err(McpError::internal("Task resolved without an outcome")))
    }
}

impl<T> fmt::Debug for ResultSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSlot")
            .field("status", &self.tx.borrow().status)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Task handle
// ============================================================================

/// Caller-side handle to a submitted task.
///
/// Cheap to clone; every clone observes the same result. Implements
/// [`IntoFuture`], so `handle.await` yields the outcome.
pub struct TaskHandle<T> {
    id: String,
    slot: ResultSlot<T>,
    cancel: CancellationToken,
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            slot: self.slot.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<T: Clone> TaskHandle<T> {
    /// A handle that is already `Completed` with `value`.
    #[must_use]
    pub fn ready(value: T) -> Self {
        let slot = ResultSlot::new();
        slot.mark_running();
        slot.complete(value);
        Self {
            id: Uuid::new_v4().to_string(),
            slot,
            cancel: CancellationToken::new(),
        }
    }

    /// Unique task identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.slot.status()
    }

    /// Whether the task reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.slot.status().is_terminal()
    }

    /// Ask the task to stop. Takes effect at the next pause between sub-steps;
    /// the handle then resolves with a `Cancelled` error.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns the error the task failed with.
    pub async fn wait(&self) -> McpResult<T> {
        self.slot.wait().await
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

impl<T> IntoFuture for TaskHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = McpResult<T>;
    type IntoFuture = BoxFuture<'static, McpResult<T>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

// ============================================================================
// Work and plan
// ============================================================================

/// A unit of work split into numbered sub-steps.
#[async_trait]
pub trait StepWork: Send + 'static {
    /// Value the task resolves with.
    type Output: Send + 'static;

    /// Perform sub-step `index` (1-based).
    async fn step(&mut self, index: u64) -> McpResult<()>;

    /// Produce the final value once every sub-step succeeded.
    async fn finish(self) -> McpResult<Self::Output>;
}

/// [`StepWork`] built from a per-step closure and a fixed output.
pub struct StepFn<S, T> {
    step: S,
    output: T,
}

impl<S, T> StepFn<S, T> {
    /// Run `step(i)` for every sub-step, then resolve with `output`.
    pub fn new<Fut>(step: S, output: T) -> Self
    where
        S: FnMut(u64) -> Fut,
        Fut: Future<Output = McpResult<()>>,
    {
        Self { step, output }
    }
}

impl<S, T> fmt::Debug for StepFn<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S, Fut, T> StepWork for StepFn<S, T>
where
    S: FnMut(u64) -> Fut + Send + 'static,
    Fut: Future<Output = McpResult<()>> + Send,
    T: Send + 'static,
{
    type Output = T;

    async fn step(&mut self, index: u64) -> McpResult<()> {
        (self.step)(index).await
    }

    async fn finish(self) -> McpResult<T> {
        Ok(self.output)
    }
}

/// Shape of a task: how many sub-steps, how far apart, and how progress reads.
#[derive(Clone)]
pub struct StepPlan {
    total_steps: u64,
    default_step: u64,
    step_delay: Duration,
    message: Option<MessageBuilder>,
}

impl StepPlan {
    /// A plan with `total_steps` sub-steps, step 1, and no delay.
    #[must_use]
    pub fn new(total_steps: u64) -> Self {
        Self {
            total_steps,
            default_step: 1,
            step_delay: Duration::ZERO,
            message: None,
        }
    }

    /// Progress added per sub-step.
    #[must_use]
    pub fn default_step(mut self, step: u64) -> Self {
        self.default_step = step;
        self
    }

    /// Pause before every sub-step.
    #[must_use]
    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Progress message for a given progress value.
    #[must_use]
    pub fn message<F>(mut self, builder: F) -> Self
    where
        F: Fn(u64) -> String + Send + Sync + 'static,
    {
        self.message = Some(Arc::new(builder));
        self
    }

    /// Number of sub-steps.
    #[must_use]
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    fn tracker(&self, progress: &Progress) -> McpResult<ProgressTracker> {
        let mut builder = progress
            .tracker_builder()
            .set_default_step(self.default_step)
            .set_total(self.total_steps.saturating_mul(self.default_step));
        if let Some(message) = &self.message {
            builder = builder.set_shared_message_builder(Arc::clone(message));
        }
        builder.build()
    }
}

impl fmt::Debug for StepPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepPlan")
            .field("total_steps", &self.total_steps)
            .field("default_step", &self.default_step)
            .field("step_delay", &self.step_delay)
            .field("has_message", &self.message.is_some())
            .finish()
    }
}

// ============================================================================
// Runner
// ============================================================================

struct RunnerInner {
    permits: Arc<Semaphore>,
    admitted: AtomicUsize,
    max_concurrent: usize,
    max_pending: usize,
    shutdown: CancellationToken,
}

/// Bounded pool executing [`StepWork`] on tokio tasks.
#[derive(Clone)]
pub struct TaskRunner {
    inner: Arc<RunnerInner>,
}

/// Counts a task against `max_pending` until dropped.
struct Admission {
    inner: Arc<RunnerInner>,
}

impl Admission {
    fn acquire(inner: &Arc<RunnerInner>) -> McpResult<Self> {
        inner
            .admitted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < inner.max_pending).then_some(n + 1)
            })
            .map_err(|n| {
                McpError::resource_exhausted(format!(
                    "task runner at capacity ({} of {} tasks admitted)",
                    n, inner.max_pending
                ))
                .with_component("task_runner")
            })?;
        Ok(Self {
            inner: Arc::clone(inner),
        })
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.inner.admitted.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Task-side end of a submission. Releases the admission before the slot is
/// resolved, so a waiter that wakes on the result already sees the capacity
/// freed. Fails the slot if the task future is dropped before resolving it
/// (runtime shutdown, aborted task).
struct TaskGuard<T: Clone> {
    slot: ResultSlot<T>,
    admission: Option<Admission>,
}

impl<T: Clone> TaskGuard<T> {
    fn new(slot: ResultSlot<T>, admission: Admission) -> Self {
        Self {
            slot,
            admission: Some(admission),
        }
    }

    fn complete(&mut self, value: T) {
        self.admission.take();
        self.slot.complete(value);
    }

    fn fail(&mut self, error: McpError) {
        self.admission.take();
        self.slot.fail(error);
    }
}

impl<T: Clone> Drop for TaskGuard<T> {
    fn drop(&mut self) {
        self.admission.take();
        if self
            .slot
            .fail(McpError::cancelled("Task dropped before completion"))
        {
            warn!("Task dropped before completion");
        }
    }
}

impl TaskRunner {
    /// Provision a runner from its configuration.
    #[must_use]
    pub fn new(config: &RunnerConfig) -> Self {
        let max_concurrent = config.max_concurrent_tasks.max(1);
        let max_pending = config.max_pending_tasks.max(max_concurrent);
        Self {
            inner: Arc::new(RunnerInner {
                permits: Arc::new(Semaphore::new(max_concurrent)),
                admitted: AtomicUsize::new(0),
                max_concurrent,
                max_pending,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Submit work with progress reporting.
    ///
    /// If `progress` carries no token the work is not run: the returned handle
    /// is already completed with [`UNSUPPORTED_PROGRESS_RESPONSE`]. Otherwise
    /// the work is scheduled and the handle returned immediately.
    ///
    /// # Errors
    ///
    /// - `ServerOverloaded` when `max_pending_tasks` tasks are already admitted
    /// - `Cancelled` after [`shutdown`](Self::shutdown)
    /// - `Internal` when called outside a tokio runtime
    pub fn submit<W>(
        &self,
        progress: &Progress,
        plan: StepPlan,
        work: W,
    ) -> McpResult<TaskHandle<W::Output>>
    where
        W: StepWork,
        W::Output: From<&'static str> + Clone + Send + Sync,
    {
        if !progress.is_supported() {
            debug!("Client does not support progress notifications, skipping work");
            return Ok(TaskHandle::ready(UNSUPPORTED_PROGRESS_RESPONSE.into()));
        }

        let tracker = if plan.total_steps == 0 {
            None
        } else {
            Some(plan.tracker(progress)?)
        };
        self.spawn(plan, tracker, work)
    }

    /// Submit work without progress reporting.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub fn submit_untracked<W>(&self, plan: StepPlan, work: W) -> McpResult<TaskHandle<W::Output>>
    where
        W: StepWork,
        W::Output: Clone + Send + Sync,
    {
        self.spawn(plan, None, work)
    }

    fn spawn<W>(
        &self,
        plan: StepPlan,
        tracker: Option<ProgressTracker>,
        work: W,
    ) -> McpResult<TaskHandle<W::Output>>
    where
        W: StepWork,
        W::Output: Clone + Send + Sync,
    {
        if self.inner.shutdown.is_cancelled() {
            return Err(McpError::cancelled("Task runner is shut down").with_component("task_runner"));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            McpError::internal("Task runner requires a tokio runtime").with_component("task_runner")
        })?;
        let admission = Admission::acquire(&self.inner)?;

        let id = Uuid::new_v4().to_string();
        let slot = ResultSlot::new();
        let cancel = self.inner.shutdown.child_token();
        let handle = TaskHandle {
            id: id.clone(),
            slot: slot.clone(),
            cancel: cancel.clone(),
        };
        let permits = Arc::clone(&self.inner.permits);

        info!(task_id = %id, steps = plan.total_steps, "Task submitted");
        let span = info_span!("task", task_id = %id);

        runtime.spawn(
            async move {
                let mut guard = TaskGuard::new(slot.clone(), admission);

                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        guard.fail(McpError::cancelled("Task cancelled before it started"));
                        return;
                    }
                    permit = permits.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => {
                            guard.fail(McpError::internal("Task pool closed"));
                            return;
                        }
                    },
                };

                slot.mark_running();
                debug!("Task running");

                let outcome = AssertUnwindSafe(drive(work, tracker, &plan, &cancel))
                    .catch_unwind()
                    .await;
                drop(permit);

                match outcome {
                    Ok(Ok(value)) => {
                        guard.complete(value);
                        info!("Task completed");
                    }
                    Ok(Err(error)) => {
                        if error.is_cancelled() {
                            info!(reason = %error, "Task cancelled");
                        } else {
                            warn!(error = %error, "Task failed");
                        }
                        guard.fail(error);
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        warn!(panic = %message, "Task panicked");
                        guard.fail(McpError::internal(format!("Task panicked: {}", message)));
                    }
                }
            }
            .instrument(span),
        );

        Ok(handle)
    }

    /// Tasks currently admitted (waiting or running).
    #[must_use]
    pub fn active_tasks(&self) -> usize {
        self.inner.admitted.load(Ordering::Acquire)
    }

    /// Pool slots not currently executing work.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// Configured concurrency limit.
    #[must_use]
    pub fn max_concurrent_tasks(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Cancel every task and refuse new submissions.
    pub fn shutdown(&self) {
        info!(active = self.active_tasks(), "Task runner shutting down");
        self.inner.shutdown.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("max_concurrent", &self.inner.max_concurrent)
            .field("max_pending", &self.inner.max_pending)
            .field("active", &self.active_tasks())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

async fn drive<W: StepWork>(
    mut work: W,
    mut tracker: Option<ProgressTracker>,
    plan: &StepPlan,
    cancel: &CancellationToken,
) -> McpResult<W::Output> {
    for index in 1..=plan.total_steps {
        pause(plan.step_delay, cancel).await.map_err(|e| {
            McpError::cancelled(format!(
                "{} after {} of {} steps",
                e.message,
                index - 1,
                plan.total_steps
            ))
        })?;
        work.step(index).await?;
        if let Some(tracker) = tracker.as_mut() {
            tracker.advance_and_forget();
        }
        debug!(step = index, total = plan.total_steps, "Step finished");
    }
    work.finish().await
}

/// Interruptible delay. Cancellation ends the pause early and is reported as
/// an error; the caller does not retry the delay.
async fn pause(delay: Duration, cancel: &CancellationToken) -> McpResult<()> {
    if cancel.is_cancelled() {
        return Err(McpError::cancelled("Task cancelled"));
    }
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(McpError::cancelled("Task cancelled")),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
