//! End-to-end tests for the full pillminderd stack.
//!
//! Each test wires the real pieces (in-memory `SQLite`, real repositories,
//! service, reminder worker, list view) with a manual clock and a recording
//! notifier in place of the wall clock and the log.

use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::sync::mpsc;

use pillminder_adapter_storage_sqlite_sqlx::{
    Config, Database, SqliteDeliveryLog, SqliteMedicineRepository,
};
use pillminder_app::event_bus::InProcessChangeBus;
use pillminder_app::ports::{ManualClock, Notifier, NotifyError};
use pillminder_app::reminder_worker::{ReminderWindow, ReminderWorker};
use pillminder_app::services::medicine_service::MedicineService;
use pillminder_app::view_state::{ListFilter, MedicineListView};
use pillminder_domain::evaluator::ScheduleEvaluator;
use pillminder_domain::medicine::MedicineEntry;
use pillminder_domain::reminder::ReminderEvent;
use pillminder_domain::schedule::Schedule;
use pillminder_domain::time::Timestamp;

type Service =
    MedicineService<SqliteMedicineRepository, Arc<InProcessChangeBus>, Arc<ManualClock>>;
type Worker = ReminderWorker<
    SqliteMedicineRepository,
    Arc<InProcessChangeBus>,
    Arc<ManualClock>,
    SqliteDeliveryLog,
    Arc<Recorder>,
>;

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<ReminderEvent>>,
}

impl Recorder {
    fn sent(&self) -> Vec<ReminderEvent> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for Recorder {
    fn notify(
        &self,
        reminder: &ReminderEvent,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send {
        self.sent.lock().unwrap().push(reminder.clone());
        async { Ok(()) }
    }
}

struct Stack {
    db: Database,
    bus: Arc<InProcessChangeBus>,
    clock: Arc<ManualClock>,
    service: Arc<Service>,
    recorder: Arc<Recorder>,
}

impl Stack {
    async fn start(now: Timestamp) -> Self {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .expect("in-memory database should initialise");
        let bus = Arc::new(InProcessChangeBus::new(64));
        let clock = Arc::new(ManualClock::new(now));
        let service = Arc::new(MedicineService::new(
            SqliteMedicineRepository::new(db.pool().clone()),
            Arc::clone(&bus),
            ScheduleEvaluator::default(),
            Arc::clone(&clock),
        ));
        Self {
            db,
            bus,
            clock,
            service,
            recorder: Arc::new(Recorder::default()),
        }
    }

    /// A fresh worker over the same database, as after a restart.
    fn worker(&self) -> Worker {
        ReminderWorker::new(
            Arc::clone(&self.service),
            SqliteDeliveryLog::new(self.db.pool().clone()),
            Arc::clone(&self.recorder),
            ReminderWindow::default(),
        )
    }
}

fn ts(d: u32, h: u32, m: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, d, h, m, 0).unwrap()
}

fn aspirin() -> MedicineEntry {
    MedicineEntry::builder()
        .name("Aspirin")
        .dosage("100mg".parse().unwrap())
        .schedule(Schedule::daily([NaiveTime::from_hms_opt(8, 0, 0).unwrap()]))
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_read_back_created_entry_except_assigned_fields() {
    let stack = Stack::start(ts(2, 7, 0)).await;
    let input = aspirin();

    let created = stack.service.create(input.clone()).await.unwrap();
    let fetched = stack.service.get(created.id).await.unwrap();

    assert_eq!(fetched.name, input.name);
    assert_eq!(fetched.dosage, input.dosage);
    assert_eq!(fetched.schedule, input.schedule);
    assert_eq!(fetched.active, input.active);
    assert_eq!(fetched.created_at, ts(2, 7, 0));
    assert_eq!(fetched, created);
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_notify_each_due_occurrence_once_across_restarts() {
    let stack = Stack::start(ts(2, 7, 0)).await;
    let entry = stack.service.create(aspirin()).await.unwrap();

    stack.clock.set(ts(2, 8, 1));
    stack.worker().wake().await.unwrap();
    stack.clock.set(ts(2, 8, 6));
    stack.worker().wake().await.unwrap();

    let sent = stack.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].medicine_id, entry.id);
    assert_eq!(sent[0].due_at, ts(2, 8, 0));
}

#[tokio::test]
async fn should_notify_next_day_occurrence_after_missing_todays() {
    let stack = Stack::start(ts(2, 9, 0)).await;
    stack.service.create(aspirin()).await.unwrap();
    let worker = stack.worker();

    worker.wake().await.unwrap();
    assert!(stack.recorder.sent().is_empty());

    stack.clock.set(ts(3, 8, 0));
    worker.wake().await.unwrap();

    let sent = stack.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].due_at, ts(3, 8, 0));
}

#[tokio::test]
async fn should_not_notify_deleted_entry() {
    let stack = Stack::start(ts(2, 7, 0)).await;
    let entry = stack.service.create(aspirin()).await.unwrap();
    stack.service.delete(entry.id).await.unwrap();

    stack.clock.set(ts(2, 8, 1));
    let report = stack.worker().wake().await.unwrap();

    assert_eq!(report.notified, 0);
    assert!(stack.recorder.sent().is_empty());
}

#[tokio::test]
async fn should_stop_reminding_once_course_is_over() {
    let stack = Stack::start(ts(2, 7, 0)).await;
    let mut entry = aspirin();
    entry.course.end = NaiveDate::from_ymd_opt(2026, 3, 2);
    let entry = stack.service.create(entry).await.unwrap();

    stack.clock.set(ts(3, 8, 1));
    let report = stack.worker().wake().await.unwrap();

    assert_eq!(report.courses_ended, 1);
    assert!(stack.recorder.sent().is_empty());
    assert!(!stack.service.get(entry.id).await.unwrap().active);
}

// ---------------------------------------------------------------------------
// List view
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_push_active_list_to_subscriber_after_writes() {
    let stack = Stack::start(ts(2, 7, 0)).await;
    let view = Arc::new(MedicineListView::new(
        Arc::clone(&stack.service),
        ListFilter::Active,
    ));
    let listener = tokio::spawn({
        let view = Arc::clone(&view);
        let events = stack.bus.subscribe();
        async move { view.listen(events).await }
    });
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = view
        .subscribe(move |list| {
            let _ = tx.send(list.len());
        })
        .await
        .unwrap();
    assert_eq!(rx.recv().await, Some(0));

    let entry = view.create(aspirin()).await.unwrap();
    assert_eq!(rx.recv().await, Some(1));

    view.set_active(entry.id, false).await.unwrap();
    assert_eq!(rx.recv().await, Some(0));

    listener.abort();
}
