// ── Notification channel ──
//
// Transient user-facing messages ("toasts"). Publishers never wait and
// never learn whether anyone was listening.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::broadcast;
use tracing::trace;

const BUS_CAPACITY: usize = 64;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

/// Anything that can show a [`Notification`] to the user.
pub trait Notifier: Send + Sync {
    fn publish(&self, notification: Notification);

    fn info(&self, message: &str) {
        self.publish(Notification::info(message));
    }

    fn success(&self, message: &str) {
        self.publish(Notification::success(message));
    }

    fn error(&self, message: &str) {
        self.publish(Notification::error(message));
    }
}

/// Process-wide broadcast publisher.
///
/// Every [`subscribe`](Self::subscribe)d receiver sees every event published
/// after it subscribed. Events published with no receiver are dropped.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<Notification>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::with_capacity(BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationBus {
    fn publish(&self, notification: Notification) {
        trace!(severity = %notification.severity, message = %notification.message, "notification");
        // No listener mounted: the event is lost.
        let _ = self.tx.send(notification);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn publish(&self, _notification: Notification) {}
}
