//! Notifier that reports due reminders through `tracing`.

use std::future::Future;

use pillminder_app::ports::{Notifier, NotifyError};
use pillminder_domain::reminder::ReminderEvent;

/// Log target carrying one event per delivered reminder.
pub const REMINDER_TARGET: &str = "pillminder::reminder";

/// Emits each reminder as an `info` event on [`REMINDER_TARGET`], so a log
/// shipper or desktop bridge can pick it up.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(
        &self,
        reminder: &ReminderEvent,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send {
        tracing::info!(
            target: REMINDER_TARGET,
            medicine_id = %reminder.medicine_id,
            name = %reminder.name,
            dosage = %reminder.dosage,
            due_at = %reminder.due_at,
            "{reminder}"
        );
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pillminder_domain::id::MedicineId;

    #[tokio::test]
    async fn should_accept_every_reminder() {
        let reminder = ReminderEvent {
            medicine_id: MedicineId::new(),
            name: "Aspirin".to_string(),
            dosage: "100mg".parse().unwrap(),
            due_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap(),
        };
        assert!(LogNotifier.notify(&reminder).await.is_ok());
    }
}
