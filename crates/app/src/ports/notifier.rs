//! Notifier port — the user-facing side effect of a due reminder.

use std::future::Future;
use std::sync::Arc;

use pillminder_domain::reminder::ReminderEvent;

/// Failure to hand a reminder to the notification channel.
#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed")]
pub struct NotifyError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

/// Emits a notification for one due occurrence.
pub trait Notifier {
    /// Deliver `reminder`. Called at most once per claimed occurrence.
    fn notify(
        &self,
        reminder: &ReminderEvent,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

impl<T: Notifier + Send + Sync> Notifier for Arc<T> {
    fn notify(
        &self,
        reminder: &ReminderEvent,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send {
        (**self).notify(reminder)
    }
}
