//! One-shot reminders, each a Tokio task sleeping until it is due.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::{NotificationKind, Notifier, ReminderService};
use crate::action::TimeUnit;
use crate::error::{AssistantError, Result};

/// Furthest a reminder may be scheduled.
pub const MAX_DELAY: Duration = Duration::from_secs(30 * 24 * 3600);

/// A reminder that has not fired yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReminder {
    pub id: Uuid,
    pub message: String,
    /// `'<message>' in <n> <unit>`, as confirmed to the user.
    pub description: String,
    pub due: DateTime<Local>,
}

/// Schedules reminders and publishes them through the [`Notifier`].
///
/// Dropping the scheduler cancels every pending reminder.
#[derive(Debug)]
pub struct ReminderScheduler {
    pending: Arc<Mutex<Vec<PendingReminder>>>,
    notifier: Notifier,
    cancel: CancellationToken,
}

impl ReminderScheduler {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            pending: Arc::new(Mutex::new(Vec::new())),
            notifier,
            cancel: CancellationToken::new(),
        }
    }

    /// Snapshot of pending reminders, soonest first.
    pub fn snapshot(&self) -> Vec<PendingReminder> {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        pending.sort_by_key(|r| r.due);
        pending
    }

    fn schedule(&self, delay: Duration, message: &str, description: String) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            AssistantError::Reminder(format!("reminders need an async runtime: {e}"))
        })?;
        let due = Local::now()
            + TimeDelta::from_std(delay)
                .map_err(|e| AssistantError::Reminder(format!("invalid delay: {e}")))?;
        let reminder = PendingReminder {
            id: Uuid::new_v4(),
            message: message.to_owned(),
            description,
            due,
        };
        let id = reminder.id;
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reminder);

        let pending = Arc::clone(&self.pending);
        let notifier = self.notifier.clone();
        let cancel = self.cancel.clone();
        let message = message.to_owned();
        runtime.spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(%id, "reminder cancelled");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
            pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|r| r.id != id);
            notifier.publish(
                NotificationKind::Reminder,
                format!("Hey, this is your reminder: {message}"),
            );
        });
        Ok(())
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl ReminderService for ReminderScheduler {
    fn set_reminder(&self, amount: u64, unit: TimeUnit, message: &str) -> Result<String> {
        let delay = Duration::from_secs(amount.saturating_mul(unit.seconds()));
        if delay > MAX_DELAY {
            return Err(AssistantError::Reminder(
                "reminders can be set at most 30 days ahead".to_owned(),
            ));
        }
        let message = message.trim();
        let description = format!("'{message}' in {amount} {}", unit.label(amount));
        self.schedule(delay, message, description.clone())?;
        info!(secs = delay.as_secs(), "reminder set");
        Ok(format!("Okay, reminder set: {description}"))
    }

    fn pending(&self) -> Result<String> {
        let pending = self.snapshot();
        if pending.is_empty() {
            return Ok("No pending reminders.".to_owned());
        }
        let lines: Vec<String> = pending
            .iter()
            .map(|r| format!("- {} (due at {})", r.description, r.due.format("%H:%M:%S")))
            .collect();
        Ok(format!("Pending reminders:\n{}", lines.join("\n")))
    }

    fn has_pending(&self) -> bool {
        !self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}
