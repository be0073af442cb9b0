//! Medicine entry — a medicine, its dosage, and when to take it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dosage::Dosage;
use crate::error::{PillminderError, ValidationError};
use crate::id::MedicineId;
use crate::schedule::Schedule;
use crate::time::{Timestamp, now};

/// Calendar window of a prescription. Both bounds are inclusive local dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Course {
    #[must_use]
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Whether `date` falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| start <= date) && self.end.is_none_or(|end| date <= end)
    }

    /// Whether the course finished before `today`.
    #[must_use]
    pub fn ended_before(&self, today: NaiveDate) -> bool {
        self.end.is_some_and(|end| end < today)
    }
}

/// A persisted medicine record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineEntry {
    pub id: MedicineId,
    pub name: String,
    pub dosage: Dosage,
    pub schedule: Schedule,
    pub active: bool,
    pub course: Course,
    pub description: Option<String>,
    pub prescriber: Option<String>,
    pub prescriber_location: Option<String>,
    pub last_taken_on: Option<NaiveDate>,
    pub created_at: Timestamp,
}

impl MedicineEntry {
    /// Create a builder for constructing a [`MedicineEntry`].
    #[must_use]
    pub fn builder() -> MedicineEntryBuilder {
        MedicineEntryBuilder::default()
    }

    /// Check domain invariants that need no clock.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::Validation`] when:
    /// - `name` is blank ([`ValidationError::EmptyName`])
    /// - the dosage is malformed ([`ValidationError::InvalidDosage`])
    /// - the schedule is malformed (see [`Schedule::validate`])
    /// - the course ends before it starts ([`ValidationError::CourseEndsBeforeStart`])
    pub fn validate(&self) -> Result<(), PillminderError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        self.dosage.validate()?;
        self.schedule.validate()?;
        if let (Some(start), Some(end)) = (self.course.start, self.course.end) {
            if end < start {
                return Err(ValidationError::CourseEndsBeforeStart {
                    start: start.to_string(),
                    end: end.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Trim free text and turn blank optional fields into `None`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.description = non_blank(self.description);
        self.prescriber = non_blank(self.prescriber);
        self.prescriber_location = non_blank(self.prescriber_location);
        self
    }

    /// Whether a dose was recorded as taken on `date`.
    #[must_use]
    pub fn taken_on(&self, date: NaiveDate) -> bool {
        self.last_taken_on == Some(date)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Step-by-step builder for [`MedicineEntry`].
#[derive(Debug, Default)]
pub struct MedicineEntryBuilder {
    id: Option<MedicineId>,
    name: Option<String>,
    dosage: Option<Dosage>,
    schedule: Option<Schedule>,
    active: Option<bool>,
    course: Course,
    description: Option<String>,
    prescriber: Option<String>,
    prescriber_location: Option<String>,
    created_at: Option<Timestamp>,
}

impl MedicineEntryBuilder {
    #[must_use]
    pub fn id(mut self, id: MedicineId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn dosage(mut self, dosage: Dosage) -> Self {
        self.dosage = Some(dosage);
        self
    }

    #[must_use]
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    #[must_use]
    pub fn course(mut self, course: Course) -> Self {
        self.course = course;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn prescriber(mut self, prescriber: impl Into<String>) -> Self {
        self.prescriber = Some(prescriber.into());
        self
    }

    #[must_use]
    pub fn prescriber_location(mut self, location: impl Into<String>) -> Self {
        self.prescriber_location = Some(location.into());
        self
    }

    #[must_use]
    pub fn created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Consume the builder, validate, and return a [`MedicineEntry`].
    ///
    /// Entries are active unless told otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::Validation`] if the name is blank, the
    /// dosage or schedule is missing or malformed, or the course is inverted.
    pub fn build(self) -> Result<MedicineEntry, PillminderError> {
        let dosage = self
            .dosage
            .ok_or_else(|| ValidationError::InvalidDosage(String::new()))?;
        let schedule = self.schedule.ok_or(ValidationError::EmptySchedule)?;

        let entry = MedicineEntry {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            dosage,
            schedule,
            active: self.active.unwrap_or(true),
            course: self.course,
            description: self.description,
            prescriber: self.prescriber,
            prescriber_location: self.prescriber_location,
            last_taken_on: None,
            created_at: self.created_at.unwrap_or_else(now),
        }
        .normalized();
        entry.validate()?;
        Ok(entry)
    }
}
