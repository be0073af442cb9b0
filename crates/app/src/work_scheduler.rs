//! Periodic background work.
//!
//! A [`WorkScheduler`] owns one tokio task per registered name. Each task
//! ticks at the configured interval and runs its [`PeriodicWork`]. Ticks
//! missed while the process was busy or suspended are skipped rather than
//! replayed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Result of one run of periodic work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    Success,
    /// A transient failure. The work runs again at the next tick.
    Retry,
    Failure,
}

/// Work executed on every tick of a [`WorkScheduler`] task.
pub trait PeriodicWork {
    fn run(&self) -> impl Future<Output = WorkOutcome> + Send;
}

impl<T: PeriodicWork + Send + Sync> PeriodicWork for Arc<T> {
    fn run(&self) -> impl Future<Output = WorkOutcome> + Send {
        (**self).run()
    }
}

/// Timing for one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Requested period between runs.
    pub interval: Duration,
    /// Floor applied to `interval`.
    pub min_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            min_interval: Duration::from_secs(15),
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(self.min_interval)
    }
}

/// What [`WorkScheduler::register`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Scheduled,
    AlreadyScheduled,
}

/// Runs named periodic work on the tokio runtime.
///
/// Dropping the scheduler aborts every task it started.
#[derive(Debug, Default)]
pub struct WorkScheduler {
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl WorkScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start running `work` under `name`.
    ///
    /// A name that is already running is left untouched and keeps the
    /// config it was started with.
    pub fn register<W>(
        &self,
        name: impl Into<String>,
        config: SchedulerConfig,
        work: W,
    ) -> Registration
    where
        W: PeriodicWork + Send + Sync + 'static,
    {
        let name = name.into();
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if tasks.get(&name).is_some_and(|task| !task.is_finished()) {
            tracing::debug!(work = %name, "periodic work already scheduled");
            return Registration::AlreadyScheduled;
        }

        let period = config.effective_interval();
        tracing::info!(work = %name, period_secs = period.as_secs(), "periodic work scheduled");
        let handle = tokio::spawn(tick_loop(name.clone(), period, work));
        tasks.insert(name, handle);
        Registration::Scheduled
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the work registered under `name`. Returns `false` if there was none.
    pub fn cancel(&self, name: &str) -> bool {
        let task = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        match task {
            Some(task) => {
                task.abort();
                tracing::info!(work = %name, "periodic work cancelled");
                true
            }
            None => false,
        }
    }

    /// Stop all registered work.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for (name, task) in tasks.drain() {
            task.abort();
            tracing::debug!(work = %name, "periodic work stopped");
        }
    }
}

impl Drop for WorkScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn tick_loop<W: PeriodicWork>(name: String, period: Duration, work: W) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        match work.run().await {
            WorkOutcome::Success => tracing::trace!(work = %name, "periodic work done"),
            WorkOutcome::Retry => {
                tracing::warn!(work = %name, "periodic work will retry at next tick");
            }
            WorkOutcome::Failure => tracing::error!(work = %name, "periodic work failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        runs: AtomicUsize,
        outcome: WorkOutcome,
    }

    impl Counting {
        fn new(outcome: WorkOutcome) -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                outcome,
            })
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    impl PeriodicWork for Counting {
        fn run(&self) -> impl Future<Output = WorkOutcome> + Send {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let outcome = self.outcome;
            async move { outcome }
        }
    }

    fn every(secs: u64) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(secs),
            min_interval: Duration::from_secs(1),
        }
    }

    #[test]
    fn should_apply_minimum_interval_when_requested_is_shorter() {
        let config = SchedulerConfig {
            interval: Duration::from_secs(5),
            min_interval: Duration::from_secs(15),
        };
        assert_eq!(config.effective_interval(), Duration::from_secs(15));
        assert_eq!(every(60).effective_interval(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn should_run_once_per_tick() {
        let scheduler = WorkScheduler::new();
        let work = Counting::new(WorkOutcome::Success);

        scheduler.register("reminders", every(60), Arc::clone(&work));
        tokio::time::sleep(Duration::from_secs(150)).await;

        assert_eq!(work.runs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_first_registration_when_name_registered_twice() {
        let scheduler = WorkScheduler::new();
        let first = Counting::new(WorkOutcome::Success);
        let second = Counting::new(WorkOutcome::Success);

        let a = scheduler.register("reminders", every(60), Arc::clone(&first));
        let b = scheduler.register("reminders", every(10), Arc::clone(&second));
        tokio::time::sleep(Duration::from_secs(90)).await;

        assert_eq!(a, Registration::Scheduled);
        assert_eq!(b, Registration::AlreadyScheduled);
        assert_eq!(first.runs(), 2);
        assert_eq!(second.runs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_retry_before_next_tick_when_work_asks_to_retry() {
        let scheduler = WorkScheduler::new();
        let work = Counting::new(WorkOutcome::Retry);

        scheduler.register("reminders", every(60), Arc::clone(&work));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(work.runs(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(work.runs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_running_when_cancelled() {
        let scheduler = WorkScheduler::new();
        let work = Counting::new(WorkOutcome::Success);
        scheduler.register("reminders", every(60), Arc::clone(&work));
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(scheduler.cancel("reminders"));
        assert!(!scheduler.is_registered("reminders"));
        assert!(!scheduler.cancel("reminders"));
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(work.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_allow_registration_again_after_shutdown() {
        let scheduler = WorkScheduler::new();
        let work = Counting::new(WorkOutcome::Success);
        scheduler.register("reminders", every(60), Arc::clone(&work));
        scheduler.shutdown();
        tokio::task::yield_now().await;

        let again = scheduler.register("reminders", every(60), Arc::clone(&work));

        assert_eq!(again, Registration::Scheduled);
        assert!(scheduler.is_registered("reminders"));
    }
}
