//! `SQLite` implementation of [`MedicineRepository`].

use std::future::Future;

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use pillminder_app::ports::MedicineRepository;
use pillminder_domain::dosage::Dosage;
use pillminder_domain::error::{NotFoundError, PillminderError};
use pillminder_domain::id::MedicineId;
use pillminder_domain::medicine::{Course, MedicineEntry};

use crate::codec::{
    decode_date, decode_id, decode_json, decode_timestamp, encode_created_at, encode_date,
};
use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`MedicineEntry`].
struct Wrapper(MedicineEntry);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<MedicineEntry> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let schedule: String = row.try_get("schedule")?;
        let course_start: Option<String> = row.try_get("course_start")?;
        let course_end: Option<String> = row.try_get("course_end")?;
        let last_taken_on: Option<String> = row.try_get("last_taken_on")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Self(MedicineEntry {
            id: decode_id(&id)?,
            name: row.try_get("name")?,
            dosage: Dosage {
                amount: row.try_get("dosage_amount")?,
                unit: row.try_get("dosage_unit")?,
            },
            schedule: decode_json(&schedule)?,
            active: row.try_get("active")?,
            course: Course {
                start: course_start.as_deref().map(decode_date).transpose()?,
                end: course_end.as_deref().map(decode_date).transpose()?,
            },
            description: row.try_get("description")?,
            prescriber: row.try_get("prescriber")?,
            prescriber_location: row.try_get("prescriber_location")?,
            last_taken_on: last_taken_on.as_deref().map(decode_date).transpose()?,
            created_at: decode_timestamp(&created_at)?,
        }))
    }
}

const INSERT: &str = "INSERT INTO medicines (id, name, dosage_amount, dosage_unit, schedule, active, course_start, course_end, description, prescriber, prescriber_location, last_taken_on, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM medicines WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM medicines ORDER BY created_at, rowid";
const SELECT_ACTIVE: &str = "SELECT * FROM medicines WHERE active = 1 ORDER BY created_at, rowid";
const UPDATE: &str = "UPDATE medicines SET name = ?, dosage_amount = ?, dosage_unit = ?, schedule = ?, active = ?, course_start = ?, course_end = ?, description = ?, prescriber = ?, prescriber_location = ?, last_taken_on = ? WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM medicines WHERE id = ?";
const END_COURSES: &str = "UPDATE medicines SET active = 0 WHERE active = 1 AND course_end IS NOT NULL AND course_end < ? RETURNING id";

/// `SQLite`-backed medicine repository.
#[derive(Debug, Clone)]
pub struct SqliteMedicineRepository {
    pool: SqlitePool,
}

impl SqliteMedicineRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn not_found(id: MedicineId) -> PillminderError {
    NotFoundError {
        entity: "Medicine",
        id: id.to_string(),
    }
    .into()
}

impl MedicineRepository for SqliteMedicineRepository {
    fn create(
        &self,
        entry: MedicineEntry,
    ) -> impl Future<Output = Result<MedicineEntry, PillminderError>> + Send {
        let pool = self.pool.clone();
        async move {
            let schedule = serde_json::to_string(&entry.schedule).map_err(StorageError::from)?;

            sqlx::query(INSERT)
                .bind(entry.id.to_string())
                .bind(&entry.name)
                .bind(entry.dosage.amount)
                .bind(&entry.dosage.unit)
                .bind(schedule)
                .bind(entry.active)
                .bind(entry.course.start.map(encode_date))
                .bind(entry.course.end.map(encode_date))
                .bind(&entry.description)
                .bind(&entry.prescriber)
                .bind(&entry.prescriber_location)
                .bind(entry.last_taken_on.map(encode_date))
                .bind(encode_created_at(entry.created_at))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(entry)
        }
    }

    fn get_by_id(
        &self,
        id: MedicineId,
    ) -> impl Future<Output = Result<Option<MedicineEntry>, PillminderError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn update(
        &self,
        entry: MedicineEntry,
    ) -> impl Future<Output = Result<MedicineEntry, PillminderError>> + Send {
        let pool = self.pool.clone();
        async move {
            let schedule = serde_json::to_string(&entry.schedule).map_err(StorageError::from)?;

            let result = sqlx::query(UPDATE)
                .bind(&entry.name)
                .bind(entry.dosage.amount)
                .bind(&entry.dosage.unit)
                .bind(schedule)
                .bind(entry.active)
                .bind(entry.course.start.map(encode_date))
                .bind(entry.course.end.map(encode_date))
                .bind(&entry.description)
                .bind(&entry.prescriber)
                .bind(&entry.prescriber_location)
                .bind(entry.last_taken_on.map(encode_date))
                .bind(entry.id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                return Err(not_found(entry.id));
            }
            Ok(entry)
        }
    }

    fn delete(&self, id: MedicineId) -> impl Future<Output = Result<(), PillminderError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(DELETE_BY_ID)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                return Err(not_found(id));
            }
            Ok(())
        }
    }

    fn list(
        &self,
        active_only: bool,
    ) -> impl Future<Output = Result<Vec<MedicineEntry>, PillminderError>> + Send {
        let pool = self.pool.clone();
        async move {
            let query = if active_only { SELECT_ACTIVE } else { SELECT_ALL };
            let rows: Vec<Wrapper> = sqlx::query_as(query)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn end_courses(
        &self,
        today: NaiveDate,
    ) -> impl Future<Output = Result<Vec<MedicineId>, PillminderError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<(String,)> = sqlx::query_as(END_COURSES)
                .bind(encode_date(today))
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            let ids = rows
                .iter()
                .map(|(id,)| decode_id(id))
                .collect::<Result<Vec<_>, _>>()
                .map_err(StorageError::from)?;
            Ok(ids)
        }
    }
}
