//! Storage port — the persistent medicine table.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use pillminder_domain::error::PillminderError;
use pillminder_domain::id::MedicineId;
use pillminder_domain::medicine::MedicineEntry;

/// Repository for persisting and querying [`MedicineEntry`]s.
///
/// Every operation is atomic for a single entry; nothing spans entries.
pub trait MedicineRepository {
    /// Store a new entry exactly as given.
    fn create(
        &self,
        entry: MedicineEntry,
    ) -> impl Future<Output = Result<MedicineEntry, PillminderError>> + Send;

    /// Get an entry by its unique identifier.
    fn get_by_id(
        &self,
        id: MedicineId,
    ) -> impl Future<Output = Result<Option<MedicineEntry>, PillminderError>> + Send;

    /// Replace an existing entry.
    ///
    /// Fails with [`PillminderError::NotFound`] when no entry has this id.
    fn update(
        &self,
        entry: MedicineEntry,
    ) -> impl Future<Output = Result<MedicineEntry, PillminderError>> + Send;

    /// Delete an entry.
    ///
    /// Fails with [`PillminderError::NotFound`] when no entry has this id.
    fn delete(&self, id: MedicineId) -> impl Future<Output = Result<(), PillminderError>> + Send;

    /// List entries ordered by creation time, oldest first.
    fn list(
        &self,
        active_only: bool,
    ) -> impl Future<Output = Result<Vec<MedicineEntry>, PillminderError>> + Send;

    /// Deactivate every active entry whose course ended before `today` and
    /// return their ids.
    fn end_courses(
        &self,
        today: NaiveDate,
    ) -> impl Future<Output = Result<Vec<MedicineId>, PillminderError>> + Send;
}

impl<T: MedicineRepository + Send + Sync> MedicineRepository for Arc<T> {
    fn create(
        &self,
        entry: MedicineEntry,
    ) -> impl Future<Output = Result<MedicineEntry, PillminderError>> + Send {
        (**self).create(entry)
    }

    fn get_by_id(
        &self,
        id: MedicineId,
    ) -> impl Future<Output = Result<Option<MedicineEntry>, PillminderError>> + Send {
        (**self).get_by_id(id)
    }

    fn update(
        &self,
        entry: MedicineEntry,
    ) -> impl Future<Output = Result<MedicineEntry, PillminderError>> + Send {
        (**self).update(entry)
    }

    fn delete(&self, id: MedicineId) -> impl Future<Output = Result<(), PillminderError>> + Send {
        (**self).delete(id)
    }

    fn list(
        &self,
        active_only: bool,
    ) -> impl Future<Output = Result<Vec<MedicineEntry>, PillminderError>> + Send {
        (**self).list(active_only)
    }

    fn end_courses(
        &self,
        today: NaiveDate,
    ) -> impl Future<Output = Result<Vec<MedicineId>, PillminderError>> + Send {
        (**self).end_courses(today)
    }
}
