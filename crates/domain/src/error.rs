//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`PillminderError`] via `#[from]`. Storage adapters box their error
//! into [`PillminderError::Storage`].

/// Top-level error for every pillminder operation.
#[derive(Debug, thiserror::Error)]
pub enum PillminderError {
    /// A medicine entry or schedule rule was rejected at write time.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The referenced record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The store could not be reached. Callers that run periodically retry
    /// on their next cycle.
    #[error("storage unavailable")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PillminderError {
    /// Whether the failure is expected to go away on its own (store
    /// unavailable, busy, or locked).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Rejections of malformed entries or rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("invalid dosage `{0}`")]
    InvalidDosage(String),

    #[error("schedule has no times, days, or slots")]
    EmptySchedule,

    #[error("schedule is ambiguous: {0}")]
    AmbiguousSchedule(String),

    #[error("interval must be at least one minute")]
    ZeroInterval,

    #[error("course ends on {end} before it starts on {start}")]
    CourseEndsBeforeStart { start: String, end: String },

    #[error("active schedule has no upcoming occurrence")]
    NoUpcomingOccurrence,
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} `{id}` not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_via_from() {
        let err: PillminderError = ValidationError::EmptyName.into();
        assert!(matches!(
            err,
            PillminderError::Validation(ValidationError::EmptyName)
        ));
        assert!(!err.is_transient());
    }

    #[test]
    fn should_report_storage_errors_as_transient() {
        let io = std::io::Error::other("database is locked");
        let err = PillminderError::Storage(Box::new(io));
        assert!(err.is_transient());
    }

    #[test]
    fn should_format_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Medicine",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Medicine `abc` not found");
    }
}
