//! Storage-specific error type wrapping sqlx errors.

use pillminder_domain::error::PillminderError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize or deserialize a stored JSON value.
    #[error("JSON (de)serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for PillminderError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_into_transient_domain_error() {
        let err: PillminderError = StorageError::Database(sqlx::Error::PoolClosed).into();
        assert!(err.is_transient());
        assert!(std::error::Error::source(&err).is_some());
    }
}
