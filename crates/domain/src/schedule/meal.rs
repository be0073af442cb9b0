//! Meal slots and the timetable that pins them to a time of day.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{PillminderError, ValidationError};

/// A dose taken relative to a meal rather than at a fixed clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    BeforeBreakfast,
    AtBreakfast,
    AfterBreakfast,
    BeforeLunch,
    AtLunch,
    AfterLunch,
    BeforeDinner,
    AtDinner,
    AfterDinner,
}

impl MealSlot {
    /// Every slot in day order.
    pub const ALL: [Self; 9] = [
        Self::BeforeBreakfast,
        Self::AtBreakfast,
        Self::AfterBreakfast,
        Self::BeforeLunch,
        Self::AtLunch,
        Self::AfterLunch,
        Self::BeforeDinner,
        Self::AtDinner,
        Self::AfterDinner,
    ];

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::BeforeBreakfast => "Before breakfast",
            Self::AtBreakfast => "At breakfast",
            Self::AfterBreakfast => "After breakfast",
            Self::BeforeLunch => "Before lunch",
            Self::AtLunch => "At lunch",
            Self::AfterLunch => "After lunch",
            Self::BeforeDinner => "Before dinner",
            Self::AtDinner => "At dinner",
            Self::AfterDinner => "After dinner",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps each [`MealSlot`] to a local time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timetable {
    times: [NaiveTime; 9],
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for Timetable {
    fn default() -> Self {
        Self {
            times: [
                hm(7, 30),
                hm(8, 0),
                hm(8, 30),
                hm(12, 30),
                hm(13, 0),
                hm(13, 30),
                hm(18, 30),
                hm(19, 0),
                hm(19, 30),
            ],
        }
    }
}

impl Timetable {
    /// Override the time of one slot.
    #[must_use]
    pub fn with(mut self, slot: MealSlot, time: NaiveTime) -> Self {
        self.times[slot.index()] = time;
        self
    }

    /// Local time of day for `slot`.
    #[must_use]
    pub fn time_of(&self, slot: MealSlot) -> NaiveTime {
        self.times[slot.index()]
    }

    /// Resolve a set of slots into sorted times of day.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::AmbiguousSchedule`] when two slots land on
    /// the same time, since no single dose can be told apart.
    pub fn resolve(&self, slots: &[MealSlot]) -> Result<Vec<NaiveTime>, PillminderError> {
        let mut resolved: Vec<(NaiveTime, MealSlot)> =
            slots.iter().map(|slot| (self.time_of(*slot), *slot)).collect();
        resolved.sort();

        for pair in resolved.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(ValidationError::AmbiguousSchedule(format!(
                    "`{}` and `{}` both resolve to {}",
                    pair[0].1,
                    pair[1].1,
                    pair[0].0.format("%H:%M")
                ))
                .into());
            }
        }

        Ok(resolved.into_iter().map(|(time, _)| time).collect())
    }
}
