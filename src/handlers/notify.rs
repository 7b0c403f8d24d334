//! Out-of-band notifications from background tasks (reminders, price alerts).

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Default channel capacity. Slow receivers lose the oldest entries.
const DEFAULT_CAPACITY: usize = 64;

/// Where a notification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Reminder,
    PriceAlert,
}

impl NotificationKind {
    /// Snake-case name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::PriceAlert => "price_alert",
        }
    }
}

/// A message raised outside the request/response cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub at: DateTime<Local>,
}

/// Broadcast sender shared by the background tasks.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Publish a notification. Having no subscribers is not an error.
    pub fn publish(&self, kind: NotificationKind, message: impl Into<String>) {
        let message = message.into();
        info!(?kind, "{message}");
        let notification = Notification {
            kind,
            message,
            at: Local::now(),
        };
        if self.tx.send(notification).is_err() {
            debug!("no notification subscribers");
        }
    }
}
