//! Server-to-client notification delivery.
//!
//! A [`NotificationSink`] is the observer end of progress and log updates.
//! Sending must never block the caller: a slow or closed observer surfaces as
//! an error the caller is free to ignore.

use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::{McpError, McpResult};
use crate::types::ServerNotification;

/// Destination for server-initiated notifications.
pub trait NotificationSink: Send + Sync {
    /// Enqueue a notification without waiting.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the notification could not be enqueued.
    fn send(&self, notification: ServerNotification) -> McpResult<()>;
}

/// [`NotificationSink`] backed by a bounded tokio channel.
///
/// Uses `try_send`, so a full buffer drops the notification instead of
/// applying backpressure to the producing task.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ServerNotification>,
}

impl ChannelSink {
    /// Wrap an existing sender.
    #[must_use]
    pub fn new(tx: mpsc::Sender<ServerNotification>) -> Self {
        Self { tx }
    }
}

impl fmt::Debug for ChannelSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSink")
            .field("capacity", &self.tx.capacity())
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl NotificationSink for ChannelSink {
    fn send(&self, notification: ServerNotification) -> McpResult<()> {
        let method = notification.method();
        self.tx.try_send(notification).map_err(|e| match e {
            TrySendError::Full(_) => {
                McpError::transport(format!("Notification buffer full, dropped {}", method))
            }
            TrySendError::Closed(_) => {
                McpError::transport(format!("Notification channel closed, dropped {}", method))
            }
        })
    }
}

/// Create a bounded notification channel.
///
/// # Panics
///
/// Panics if `buffer` is 0 (tokio rejects zero-capacity channels).
#[must_use]
pub fn channel_sink(buffer: usize) -> (ChannelSink, mpsc::Receiver<ServerNotification>) {
    let (tx, rx) = mpsc::channel(buffer);
    (ChannelSink::new(tx), rx)
}
