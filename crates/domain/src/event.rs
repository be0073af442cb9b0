//! Medicine event — an immutable record that the medicine table changed.
//!
//! Published after every successful write so observers (the list view,
//! logs) can refresh without polling the store.

use serde::{Deserialize, Serialize};

use crate::id::MedicineId;
use crate::time::{Timestamp, now};

/// What kind of change happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    DoseTaken,
    CourseEnded,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::DoseTaken => "dose_taken",
            Self::CourseEnded => "course_ended",
        };
        f.write_str(s)
    }
}

/// A change to one medicine entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineEvent {
    pub kind: ChangeKind,
    pub medicine_id: MedicineId,
    pub at: Timestamp,
}

impl MedicineEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(kind: ChangeKind, medicine_id: MedicineId) -> Self {
        Self {
            kind,
            medicine_id,
            at: now(),
        }
    }
}
