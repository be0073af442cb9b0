//! `SQLite` implementation of [`DeliveryLog`]. Claims survive restarts, so
//! a reminder sent just before shutdown is not sent again on startup.

use std::future::Future;

use sqlx::SqlitePool;

use pillminder_app::ports::DeliveryLog;
use pillminder_domain::error::PillminderError;
use pillminder_domain::reminder::ReminderKey;
use pillminder_domain::time::{self, Timestamp};

use crate::codec::{encode_created_at, encode_due_at};
use crate::error::StorageError;

const CLAIM: &str =
    "INSERT OR IGNORE INTO reminder_deliveries (medicine_id, due_at, claimed_at) VALUES (?, ?, ?)";
const RELEASE: &str = "DELETE FROM reminder_deliveries WHERE medicine_id = ? AND due_at = ?";
const PRUNE: &str = "DELETE FROM reminder_deliveries WHERE due_at < ?";

/// `SQLite`-backed delivery log.
#[derive(Debug, Clone)]
pub struct SqliteDeliveryLog {
    pool: SqlitePool,
}

impl SqliteDeliveryLog {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DeliveryLog for SqliteDeliveryLog {
    fn claim(
        &self,
        key: ReminderKey,
    ) -> impl Future<Output = Result<bool, PillminderError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(CLAIM)
                .bind(key.medicine_id.to_string())
                .bind(encode_due_at(key.due_at))
                .bind(encode_created_at(time::now()))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(result.rows_affected() == 1)
        }
    }

    fn release(&self, key: ReminderKey) -> impl Future<Output = Result<(), PillminderError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(RELEASE)
                .bind(key.medicine_id.to_string())
                .bind(encode_due_at(key.due_at))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn prune(&self, before: Timestamp) -> impl Future<Output = Result<u64, PillminderError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(PRUNE)
                .bind(encode_due_at(before))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() > 0 {
                tracing::debug!(pruned = result.rows_affected(), "delivery log pruned");
            }
            Ok(result.rows_affected())
        }
    }
}
