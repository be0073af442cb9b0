//! Medicine service — use-cases for managing medicine entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use pillminder_domain::error::{NotFoundError, PillminderError, ValidationError};
use pillminder_domain::evaluator::ScheduleEvaluator;
use pillminder_domain::event::{ChangeKind, MedicineEvent};
use pillminder_domain::id::MedicineId;
use pillminder_domain::medicine::MedicineEntry;
use pillminder_domain::time::{Timestamp, truncate};

use crate::ports::{ChangePublisher, Clock, MedicineRepository};

/// Application service for medicine CRUD.
///
/// Writes to one id are serialized; reads never wait. Each successful write
/// publishes a [`MedicineEvent`].
pub struct MedicineService<R, P, C> {
    repo: R,
    publisher: P,
    evaluator: ScheduleEvaluator,
    clock: C,
    locks: WriteLocks,
}

impl<R, P, C> MedicineService<R, P, C>
where
    R: MedicineRepository,
    P: ChangePublisher,
    C: Clock,
{
    /// Create a new service.
    pub fn new(repo: R, publisher: P, evaluator: ScheduleEvaluator, clock: C) -> Self {
        Self {
            repo,
            publisher,
            evaluator,
            clock,
            locks: WriteLocks::default(),
        }
    }

    /// The evaluator used to check that active entries stay schedulable.
    pub fn evaluator(&self) -> &ScheduleEvaluator {
        &self.evaluator
    }

    /// Current time according to the service's clock.
    pub fn now(&self) -> Timestamp {
        truncate(self.clock.now())
    }

    /// Create a new entry. A fresh id and creation time are assigned; the
    /// ones on `entry` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::Validation`] if the entry is malformed or,
    /// while active, its rule has no upcoming occurrence. Storage errors are
    /// propagated from the repository.
    pub async fn create(&self, entry: MedicineEntry) -> Result<MedicineEntry, PillminderError> {
        let mut entry = entry.normalized();
        entry.id = MedicineId::new();
        entry.created_at = self.now();
        self.check(&entry, entry.created_at)?;

        let created = self.repo.create(entry).await?;
        info!(medicine_id = %created.id, name = %created.name, "medicine created");
        self.publish(ChangeKind::Created, created.id).await;
        Ok(created)
    }

    /// Look up an entry by id.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::NotFound`] when no entry with `id` exists,
    /// or a storage error from the repository.
    pub async fn get(&self, id: MedicineId) -> Result<MedicineEntry, PillminderError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// List entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list(&self, active_only: bool) -> Result<Vec<MedicineEntry>, PillminderError> {
        self.repo.list(active_only).await
    }

    /// Replace an existing entry. The stored id and creation time are kept.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::NotFound`] if the entry does not exist,
    /// [`PillminderError::Validation`] if the new content is invalid, or a
    /// storage error from the repository.
    pub async fn update(&self, entry: MedicineEntry) -> Result<MedicineEntry, PillminderError> {
        let id = entry.id;
        self.modify(id, ChangeKind::Updated, move |current| {
            let mut entry = entry.normalized();
            entry.created_at = current.created_at;
            *current = entry;
        })
        .await
    }

    /// Turn reminders for an entry on or off.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::NotFound`] if the entry does not exist,
    /// [`PillminderError::Validation`] when activating an entry with no
    /// upcoming occurrence, or a storage error.
    pub async fn set_active(
        &self,
        id: MedicineId,
        active: bool,
    ) -> Result<MedicineEntry, PillminderError> {
        self.modify(id, ChangeKind::Updated, move |entry| entry.active = active)
            .await
    }

    /// Record that a dose was taken on `date`. An earlier date never
    /// overwrites a later one.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::NotFound`] if the entry does not exist,
    /// or a storage error.
    pub async fn mark_taken(
        &self,
        id: MedicineId,
        date: NaiveDate,
    ) -> Result<MedicineEntry, PillminderError> {
        let _guard = self.locks.acquire(id).await;
        let mut entry = self.get(id).await?;
        entry.last_taken_on = entry.last_taken_on.max(Some(date));
        let saved = self.repo.update(entry).await?;
        debug!(medicine_id = %id, %date, "dose marked as taken");
        self.publish(ChangeKind::DoseTaken, id).await;
        Ok(saved)
    }

    /// Delete an entry.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::NotFound`] if the entry does not exist,
    /// or a storage error.
    pub async fn delete(&self, id: MedicineId) -> Result<(), PillminderError> {
        let _guard = self.locks.acquire(id).await;
        self.repo.delete(id).await?;
        info!(medicine_id = %id, "medicine deleted");
        self.publish(ChangeKind::Deleted, id).await;
        Ok(())
    }

    /// Deactivate entries whose course ended before `today`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn end_finished_courses(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<MedicineId>, PillminderError> {
        let ended = self.repo.end_courses(today).await?;
        for id in &ended {
            info!(medicine_id = %id, %today, "course ended; reminders stopped");
            self.publish(ChangeKind::CourseEnded, *id).await;
        }
        Ok(ended)
    }

    async fn modify(
        &self,
        id: MedicineId,
        kind: ChangeKind,
        change: impl FnOnce(&mut MedicineEntry) + Send,
    ) -> Result<MedicineEntry, PillminderError> {
        let _guard = self.locks.acquire(id).await;
        let stored = self.get(id).await?;
        let mut entry = stored.clone();
        change(&mut entry);
        entry.id = id;
        if reschedules(&stored, &entry) {
            self.check(&entry, self.now())?;
        } else {
            entry.validate()?;
        }

        let saved = self.repo.update(entry).await?;
        debug!(medicine_id = %id, active = saved.active, "medicine updated");
        self.publish(kind, id).await;
        Ok(saved)
    }

    fn check(&self, entry: &MedicineEntry, now: Timestamp) -> Result<(), PillminderError> {
        entry.validate()?;
        if entry.active && self.evaluator.next_due(entry, now)?.is_none() {
            return Err(ValidationError::NoUpcomingOccurrence.into());
        }
        Ok(())
    }

    async fn publish(&self, kind: ChangeKind, id: MedicineId) {
        if let Err(err) = self.publisher.publish(MedicineEvent::new(kind, id)).await {
            warn!(medicine_id = %id, %kind, error = %err, "failed to publish change event");
        }
    }
}

/// Whether an edit touches what decides the next reminder. Other edits are
/// accepted even when the entry has no dose left before its course ends.
fn reschedules(stored: &MedicineEntry, edited: &MedicineEntry) -> bool {
    edited.active
        && (!stored.active || stored.schedule != edited.schedule || stored.course != edited.course)
}

fn not_found(id: MedicineId) -> PillminderError {
    NotFoundError {
        entity: "Medicine",
        id: id.to_string(),
    }
    .into()
}

/// One async mutex per id currently being written.
#[derive(Default)]
struct WriteLocks {
    held: Mutex<HashMap<MedicineId, Arc<tokio::sync::Mutex<()>>>>,
}

impl WriteLocks {
    async fn acquire(&self, id: MedicineId) -> WriteGuard<'_> {
        let lock = {
            let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(held.entry(id).or_default())
        };
        // Built before waiting, so a cancelled wait still cleans the map up.
        let mut write = WriteGuard {
            locks: self,
            id,
            guard: None,
        };
        write.guard = Some(lock.lock_owned().await);
        write
    }

    fn release(&self, id: MedicineId) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own reference left: nobody holds or waits for it.
        if held.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            held.remove(&id);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

struct WriteGuard<'a> {
    locks: &'a WriteLocks,
    id: MedicineId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(self.id);
    }
}
