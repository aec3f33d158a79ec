//! Progress reporting for long-running tool invocations.
//!
//! A client opts into progress updates by attaching a [`ProgressToken`] to its
//! request. [`Progress`] captures that capability for one request, and a
//! [`ProgressTracker`] built from it turns step counts into
//! `notifications/progress` messages.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use stepmcp_core::notify::channel_sink;
//! use stepmcp_core::progress::Progress;
//!
//! let (sink, mut rx) = channel_sink(16);
//! let progress = Progress::new(Some("req-1".into()), Some(Arc::new(sink)));
//!
//! let mut tracker = progress
//!     .tracker_builder()
//!     .set_total(2)
//!     .set_message_builder(|i| format!("step {}", i))
//!     .build()?;
//!
//! tracker.advance_and_forget();
//! assert_eq!(tracker.current(), 1);
//! assert!(rx.try_recv().is_ok());
//! # Ok::<(), stepmcp_core::McpError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{McpError, McpResult};
use crate::notify::NotificationSink;
use crate::types::{ProgressNotification, ProgressToken, ServerNotification};

/// Formats the human-readable message for a given progress value.
pub type MessageBuilder = Arc<dyn Fn(u64) -> String + Send + Sync>;

/// Per-request progress capability.
#[derive(Clone, Default)]
pub struct Progress {
    token: Option<ProgressToken>,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl Progress {
    /// Create a progress capability from an optional token and sink.
    #[must_use]
    pub fn new(token: Option<ProgressToken>, sink: Option<Arc<dyn NotificationSink>>) -> Self {
        Self { token, sink }
    }

    /// A capability for a client that sent no progress token.
    #[must_use]
    pub fn unsupported() -> Self {
        Self::default()
    }

    /// The progress token, if the client supplied one.
    #[must_use]
    pub fn token(&self) -> Option<&ProgressToken> {
        self.token.as_ref()
    }

    /// Whether the client asked for progress updates.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.token.is_some()
    }

    /// Start configuring a tracker for this request.
    #[must_use]
    pub fn tracker_builder(&self) -> ProgressTrackerBuilder {
        ProgressTrackerBuilder {
            token: self.token.clone(),
            sink: self.sink.clone(),
            default_step: 1,
            total: None,
            message_builder: None,
        }
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("token", &self.token)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

/// Builder for [`ProgressTracker`].
pub struct ProgressTrackerBuilder {
    token: Option<ProgressToken>,
    sink: Option<Arc<dyn NotificationSink>>,
    default_step: u64,
    total: Option<u64>,
    message_builder: Option<MessageBuilder>,
}

impl ProgressTrackerBuilder {
    /// Amount added by [`ProgressTracker::advance`]. Defaults to 1.
    #[must_use]
    pub fn set_default_step(mut self, step: u64) -> Self {
        self.default_step = step;
        self
    }

    /// Total progress value; reported progress never exceeds it.
    #[must_use]
    pub fn set_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Message attached to every notification.
    #[must_use]
    pub fn set_message_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(u64) -> String + Send + Sync + 'static,
    {
        self.message_builder = Some(Arc::new(builder));
        self
    }

    /// Same as [`set_message_builder`](Self::set_message_builder) for an already shared builder.
    #[must_use]
    pub fn set_shared_message_builder(mut self, builder: MessageBuilder) -> Self {
        self.message_builder = Some(builder);
        self
    }

    /// Build the tracker.
    ///
    /// # Errors
    ///
    /// - `CapabilityNotSupported` if the request carried no progress token
    /// - `InvalidParams` if the default step or total is zero
    pub fn build(self) -> McpResult<ProgressTracker> {
        let token = self.token.ok_or_else(|| {
            McpError::capability_not_supported("Client does not support progress notifications")
                .with_component("progress")
        })?;
        if self.default_step == 0 {
            return Err(McpError::invalid_params("Progress step must be at least 1"));
        }
        if self.total == Some(0) {
            return Err(McpError::invalid_params("Progress total must be at least 1"));
        }

        Ok(ProgressTracker {
            token,
            sink: self.sink,
            default_step: self.default_step,
            total: self.total,
            current: 0,
            message_builder: self.message_builder,
        })
    }
}

impl fmt::Debug for ProgressTrackerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTrackerBuilder")
            .field("token", &self.token)
            .field("default_step", &self.default_step)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

/// Monotonic progress counter owned by a single task.
///
/// Advancing takes `&mut self`, so only the owner can move it forward.
pub struct ProgressTracker {
    token: ProgressToken,
    sink: Option<Arc<dyn NotificationSink>>,
    default_step: u64,
    total: Option<u64>,
    current: u64,
    message_builder: Option<MessageBuilder>,
}

impl ProgressTracker {
    /// Current progress value.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Configured total, if any.
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// The token notifications are tagged with.
    #[must_use]
    pub fn token(&self) -> &ProgressToken {
        &self.token
    }

    /// Whether progress has reached the total.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total.is_some_and(|total| self.current >= total)
    }

    /// Advance by the default step and report it.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the notification could not be delivered.
    /// The counter is advanced regardless.
    pub fn advance(&mut self) -> McpResult<()> {
        self.advance_by(self.default_step)
    }

    /// Advance by `step` and report it.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the notification could not be delivered.
    pub fn advance_by(&mut self, step: u64) -> McpResult<()> {
        let next = self.current.saturating_add(step);
        self.current = match self.total {
            Some(total) => next.min(total),
            None => next,
        };

        let Some(sink) = &self.sink else {
            return Ok(());
        };
        sink.send(ServerNotification::Progress(self.notification()))
    }

    /// Advance by the default step; delivery failures are logged and dropped.
    pub fn advance_and_forget(&mut self) {
        if let Err(e) = self.advance() {
            debug!(
                token = %self.token,
                progress = self.current,
                error = %e,
                "Progress notification dropped"
            );
        }
    }

    fn notification(&self) -> ProgressNotification {
        ProgressNotification {
            progress_token: self.token.clone(),
            progress: self.current as f64,
            total: self.total.map(|t| t as f64),
            message: self.message_builder.as_ref().map(|build| build(self.current)),
        }
    }
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("token", &self.token)
            .field("current", &self.current)
            .field("total", &self.total)
            .field("default_step", &self.default_step)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::notify::channel_sink;
    use tokio::sync::mpsc::Receiver;

    fn supported(buffer: usize) -> (Progress, Receiver<ServerNotification>) {
        let (sink, rx) = channel_sink(buffer);
        (Progress::new(Some("t".into()), Some(Arc::new(sink))), rx)
    }

    fn drain(rx: &mut Receiver<ServerNotification>) -> Vec<ProgressNotification> {
        let mut out = Vec::new();
        while let Ok(ServerNotification::Progress(p)) = rx.try_recv() {
            out.push(p);
        }
        out
    }

    #[test]
    fn test_unsupported_progress_cannot_build_tracker() {
        let err = Progress::unsupported()
            .tracker_builder()
            .set_total(10)
            .build()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CapabilityNotSupported);
    }

    #[test]
    fn test_zero_total_or_step_rejected() {
        let (progress, _rx) = supported(1);
        assert!(progress.tracker_builder().set_total(0).build().is_err());
        assert!(progress.tracker_builder().set_default_step(0).build().is_err());
    }

    #[test]
    fn test_advance_reports_messages() {
        let (progress, mut rx) = supported(16);
        let mut tracker = progress
            .tracker_builder()
            .set_total(3)
            .set_message_builder(|i| format!("Long running progress: {}", i))
            .build()
            .unwrap();

        for _ in 0..3 {
            tracker.advance().unwrap();
        }
        assert!(tracker.is_complete());

        let updates = drain(&mut rx);
        let progress: Vec<f64> = updates.iter().map(|n| n.progress).collect();
        assert_eq!(progress, vec![1.0, 2.0, 3.0]);
        assert_eq!(
            updates[2].message.as_deref(),
            Some("Long running progress: 3")
        );
        assert!(updates.iter().all(|n| n.total == Some(3.0)));
    }

    #[test]
    fn test_advance_and_forget_survives_full_channel() {
        let (progress, mut rx) = supported(1);
        let mut tracker = progress.tracker_builder().set_total(5).build().unwrap();

        for _ in 0..5 {
            tracker.advance_and_forget();
        }

        assert_eq!(tracker.current(), 5);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_without_sink_is_noop() {
        let progress = Progress::new(Some(ProgressToken::Number(7)), None);
        let mut tracker = progress.tracker_builder().build().unwrap();
        tracker.advance().unwrap();
        assert_eq!(tracker.current(), 1);
        assert_eq!(tracker.total(), None);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Reported progress is non-decreasing and never exceeds the total
            #[test]
            fn test_progress_clamped_to_total(
                total in 1u64..50,
                step in 1u64..7,
                advances in 0usize..80,
            ) {
                let (progress, mut rx) = supported(128);
                let mut tracker = progress
                    .tracker_builder()
                    .set_default_step(step)
                    .set_total(total)
                    .build()
                    .unwrap();

                for _ in 0..advances {
                    tracker.advance_and_forget();
                }

                let updates = drain(&mut rx);
                prop_assert_eq!(updates.len(), advances);
                let mut last = 0.0;
                for update in updates {
                    prop_assert!(update.progress >= last);
                    prop_assert!(update.progress <= total as f64);
                    last = update.progress;
                }
            }
        }
    }
}
