//! Reminder event — "this entry is due at T".
//!
//! Derived from a [`MedicineEntry`] and a due timestamp each evaluation
//! cycle. Never persisted.

use serde::{Deserialize, Serialize};

use crate::dosage::Dosage;
use crate::id::MedicineId;
use crate::medicine::MedicineEntry;
use crate::time::Timestamp;

/// Identifies one due occurrence. A notification is emitted at most once
/// per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReminderKey {
    pub medicine_id: MedicineId,
    pub due_at: Timestamp,
}

/// One due occurrence of a medicine entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderEvent {
    pub medicine_id: MedicineId,
    pub name: String,
    pub dosage: Dosage,
    pub due_at: Timestamp,
}

impl ReminderEvent {
    #[must_use]
    pub fn for_entry(entry: &MedicineEntry, due_at: Timestamp) -> Self {
        Self {
            medicine_id: entry.id,
            name: entry.name.clone(),
            dosage: entry.dosage.clone(),
            due_at,
        }
    }

    #[must_use]
    pub fn key(&self) -> ReminderKey {
        ReminderKey {
            medicine_id: self.medicine_id,
            due_at: self.due_at,
        }
    }
}

impl std::fmt::Display for ReminderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "take {} of {} (due {})",
            self.dosage,
            self.name,
            self.due_at.format("%Y-%m-%d %H:%M UTC")
        )
    }
}
