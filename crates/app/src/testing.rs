//! Shared fakes for the crate's unit tests.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

use pillminder_domain::error::{NotFoundError, PillminderError};
use pillminder_domain::id::MedicineId;
use pillminder_domain::medicine::MedicineEntry;
use pillminder_domain::reminder::{ReminderEvent, ReminderKey};
use pillminder_domain::schedule::Schedule;
use pillminder_domain::time::Timestamp;

use crate::delivery_log::InMemoryDeliveryLog;
use crate::ports::{DeliveryLog, MedicineRepository, Notifier, NotifyError};

pub fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32) -> Timestamp {
    Utc.with_ymd_and_hms(y, m, d, h, mi, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Aspirin, 100 mg, daily at 08:00.
pub fn aspirin() -> MedicineEntry {
    MedicineEntry::builder()
        .name("Aspirin")
        .dosage("100mg".parse().unwrap())
        .schedule(Schedule::daily([at(8, 0)]))
        .created_at(ts(2026, 3, 1, 12, 0))
        .build()
        .unwrap()
}

fn unavailable() -> PillminderError {
    PillminderError::Storage("store unavailable".into())
}

/// Insertion-ordered in-memory repository. Reads can be made to fail.
#[derive(Default)]
pub struct InMemoryMedicineRepo {
    entries: Mutex<Vec<MedicineEntry>>,
    failing: AtomicBool,
}

impl InMemoryMedicineRepo {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn guard(&self) -> Result<(), PillminderError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut Vec<MedicineEntry>) -> T) -> T {
        f(&mut self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn missing(id: MedicineId) -> PillminderError {
    NotFoundError {
        entity: "Medicine",
        id: id.to_string(),
    }
    .into()
}

impl MedicineRepository for InMemoryMedicineRepo {
    fn create(
        &self,
        entry: MedicineEntry,
    ) -> impl Future<Output = Result<MedicineEntry, PillminderError>> + Send {
        let result = self.guard().map(|()| {
            self.with(|entries| entries.push(entry.clone()));
            entry
        });
        async move { result }
    }

    fn get_by_id(
        &self,
        id: MedicineId,
    ) -> impl Future<Output = Result<Option<MedicineEntry>, PillminderError>> + Send {
        let result = self
            .guard()
            .map(|()| self.with(|entries| entries.iter().find(|e| e.id == id).cloned()));
        async move { result }
    }

    fn update(
        &self,
        entry: MedicineEntry,
    ) -> impl Future<Output = Result<MedicineEntry, PillminderError>> + Send {
        let result = self.guard().and_then(|()| {
            self.with(|entries| match entries.iter_mut().find(|e| e.id == entry.id) {
                Some(slot) => {
                    *slot = entry.clone();
                    Ok(entry)
                }
                None => Err(missing(entry.id)),
            })
        });
        async move { result }
    }

    fn delete(&self, id: MedicineId) -> impl Future<Output = Result<(), PillminderError>> + Send {
        let result = self.guard().and_then(|()| {
            self.with(|entries| {
                let before = entries.len();
                entries.retain(|e| e.id != id);
                if entries.len() == before {
                    Err(missing(id))
                } else {
                    Ok(())
                }
            })
        });
        async move { result }
    }

    fn list(
        &self,
        active_only: bool,
    ) -> impl Future<Output = Result<Vec<MedicineEntry>, PillminderError>> + Send {
        let result = self.guard().map(|()| {
            let mut listed: Vec<_> = self.with(|entries| {
                entries
                    .iter()
                    .filter(|e| !active_only || e.active)
                    .cloned()
                    .collect()
            });
            listed.sort_by_key(|e| e.created_at);
            listed
        });
        async move { result }
    }

    fn end_courses(
        &self,
        today: NaiveDate,
    ) -> impl Future<Output = Result<Vec<MedicineId>, PillminderError>> + Send {
        let result = self.guard().map(|()| {
            self.with(|entries| {
                entries
                    .iter_mut()
                    .filter(|e| e.active && e.course.ended_before(today))
                    .map(|e| {
                        e.active = false;
                        e.id
                    })
                    .collect()
            })
        });
        async move { result }
    }
}

/// Records every reminder it is asked to deliver. Can be made to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<ReminderEvent>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<ReminderEvent> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(
        &self,
        reminder: &ReminderEvent,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send {
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(NotifyError("channel closed".into()))
        } else {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(reminder.clone());
            Ok(())
        };
        async move { result }
    }
}

/// In-memory delivery log whose releases can be made to fail.
#[derive(Default)]
pub struct FlakyDeliveryLog {
    inner: InMemoryDeliveryLog,
    failing_release: AtomicBool,
}

impl FlakyDeliveryLog {
    pub fn set_failing_release(&self, failing: bool) {
        self.failing_release.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl DeliveryLog for FlakyDeliveryLog {
    fn claim(
        &self,
        key: ReminderKey,
    ) -> impl Future<Output = Result<bool, PillminderError>> + Send {
        self.inner.claim(key)
    }

    async fn release(&self, key: ReminderKey) -> Result<(), PillminderError> {
        if self.failing_release.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.release(key).await
    }

    fn prune(&self, before: Timestamp) -> impl Future<Output = Result<u64, PillminderError>> + Send {
        self.inner.prune(before)
    }
}
