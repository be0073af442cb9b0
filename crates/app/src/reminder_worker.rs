//! Reminder worker — the periodic wake that turns due occurrences into
//! notifications.
//!
//! Each wake looks at a window around "now", so a wake that arrives late
//! still catches occurrences it slept through. The [`DeliveryLog`] makes
//! overlapping windows safe: an occurrence is notified only by the wake
//! that first claims it.
//!
//! An entry's window never starts before its `created_at`, so a freshly
//! added medicine is not reminded of doses that fell due before it existed.
//! Re-activation is not tracked: turning an entry back on may still bring a
//! reminder for a dose that fell due inside the lookback.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::TimeDelta;
use tracing::{debug, warn};

use pillminder_domain::error::PillminderError;
use pillminder_domain::reminder::{ReminderEvent, ReminderKey};

use crate::ports::{ChangePublisher, Clock, DeliveryLog, MedicineRepository, Notifier};
use crate::services::medicine_service::MedicineService;
use crate::work_scheduler::{PeriodicWork, WorkOutcome};

/// Which occurrences a wake considers, relative to its own time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    /// How far back a wake looks for occurrences it may have missed.
    pub lookback: Duration,
    /// How far ahead a wake notifies early.
    pub lead: Duration,
    /// Cap on occurrences per entry per wake.
    pub max_per_entry: usize,
}

impl Default for ReminderWindow {
    fn default() -> Self {
        Self {
            lookback: Duration::from_secs(15 * 60),
            lead: Duration::ZERO,
            max_per_entry: 32,
        }
    }
}

/// Counters for one wake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WakeReport {
    pub courses_ended: usize,
    pub notified: usize,
    pub already_notified: usize,
    pub failed: usize,
    pub skipped_entries: usize,
    pub pruned: u64,
}

pub struct ReminderWorker<R, P, C, L, N> {
    service: Arc<MedicineService<R, P, C>>,
    log: L,
    notifier: N,
    window: ReminderWindow,
    /// Claims whose release failed, released again on the next wake.
    unreleased: Mutex<Vec<ReminderKey>>,
}

impl<R, P, C, L, N> ReminderWorker<R, P, C, L, N>
where
    R: MedicineRepository + Send + Sync,
    P: ChangePublisher + Send + Sync,
    C: Clock,
    L: DeliveryLog + Send + Sync,
    N: Notifier + Send + Sync,
{
    pub fn new(
        service: Arc<MedicineService<R, P, C>>,
        log: L,
        notifier: N,
        window: ReminderWindow,
    ) -> Self {
        Self {
            service,
            log,
            notifier,
            window,
            unreleased: Mutex::default(),
        }
    }

    /// Run one evaluation cycle.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the active entries cannot be listed or
    /// a claim cannot be written. Nothing is notified past that point; the
    /// next wake picks up where this one stopped.
    pub async fn wake(&self) -> Result<WakeReport, PillminderError> {
        let mut report = WakeReport::default();
        let now = self.service.now();
        let evaluator = self.service.evaluator();

        match self
            .service
            .end_finished_courses(evaluator.local_date(now))
            .await
        {
            Ok(ended) => report.courses_ended = ended.len(),
            Err(err) => warn!(error = %err, "could not end finished courses"),
        }

        self.retry_releases().await;

        let entries = self.service.list(true).await?;
        let from = now - delta(self.window.lookback);
        let to = now + delta(self.window.lead);

        for entry in &entries {
            let due = match evaluator.occurrences_between(
                entry,
                from.max(entry.created_at),
                to,
                self.window.max_per_entry,
            ) {
                Ok(due) => due,
                Err(err) => {
                    warn!(medicine_id = %entry.id, error = %err, "skipping entry with unusable schedule");
                    report.skipped_entries += 1;
                    continue;
                }
            };

            for due_at in due {
                let reminder = ReminderEvent::for_entry(entry, due_at);
                let key = reminder.key();
                if !self.log.claim(key).await? {
                    report.already_notified += 1;
                    continue;
                }
                match self.notifier.notify(&reminder).await {
                    Ok(()) => {
                        debug!(medicine_id = %entry.id, %due_at, "reminder delivered");
                        report.notified += 1;
                    }
                    Err(err) => {
                        warn!(medicine_id = %entry.id, %due_at, error = %err, "notification failed; will retry");
                        self.release(key).await;
                        report.failed += 1;
                    }
                }
            }
        }

        match self.log.prune(from).await {
            Ok(pruned) => report.pruned = pruned,
            Err(err) => warn!(error = %err, "could not prune delivery log"),
        }

        debug!(?report, "reminder wake finished");
        Ok(report)
    }

    async fn release(&self, key: ReminderKey) {
        if let Err(err) = self.log.release(key).await {
            warn!(
                medicine_id = %key.medicine_id,
                due_at = %key.due_at,
                error = %err,
                "could not release claim; retrying next wake"
            );
            self.unreleased
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(key);
        }
    }

    async fn retry_releases(&self) {
        let pending = std::mem::take(
            &mut *self
                .unreleased
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for key in pending {
            self.release(key).await;
        }
    }
}

impl<R, P, C, L, N> PeriodicWork for ReminderWorker<R, P, C, L, N>
where
    R: MedicineRepository + Send + Sync,
    P: ChangePublisher + Send + Sync,
    C: Clock,
    L: DeliveryLog + Send + Sync,
    N: Notifier + Send + Sync,
{
    async fn run(&self) -> WorkOutcome {
        match self.wake().await {
            Ok(_) => WorkOutcome::Success,
            Err(err) if err.is_transient() => {
                warn!(error = %err, "reminder wake hit a storage error");
                WorkOutcome::Retry
            }
            Err(err) => {
                warn!(error = %err, "reminder wake failed");
                WorkOutcome::Failure
            }
        }
    }
}

fn delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}
