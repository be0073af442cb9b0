//! Schedule — the recurrence rule that says when a medicine is due.
//!
//! Rules are structurally validated here; turning a rule into concrete
//! timestamps is the job of the [`ScheduleEvaluator`](crate::evaluator::ScheduleEvaluator).

mod meal;

pub use meal::{MealSlot, Timetable};

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{PillminderError, ValidationError};
use crate::time::Timestamp;

/// When a medicine should be taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    /// Every day at each listed local time.
    Daily { times: Vec<NaiveTime> },
    /// On each listed weekday at each listed local time.
    Weekly {
        days: Vec<Weekday>,
        times: Vec<NaiveTime>,
    },
    /// Every `every_minutes`, counted from `anchor`.
    Interval { every_minutes: u32, anchor: Timestamp },
    /// Relative to meals; slot times come from the evaluator's timetable.
    MealTimes { slots: Vec<MealSlot> },
}

impl Schedule {
    #[must_use]
    pub fn daily(times: impl IntoIterator<Item = NaiveTime>) -> Self {
        Self::Daily {
            times: times.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn weekly(
        days: impl IntoIterator<Item = Weekday>,
        times: impl IntoIterator<Item = NaiveTime>,
    ) -> Self {
        Self::Weekly {
            days: days.into_iter().collect(),
            times: times.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn every(every_minutes: u32, anchor: Timestamp) -> Self {
        Self::Interval {
            every_minutes,
            anchor,
        }
    }

    #[must_use]
    pub fn meals(slots: impl IntoIterator<Item = MealSlot>) -> Self {
        Self::MealTimes {
            slots: slots.into_iter().collect(),
        }
    }

    /// Check the rule's structure.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::Validation`] when:
    /// - a time, day, or slot list is empty ([`ValidationError::EmptySchedule`])
    /// - an element is listed twice ([`ValidationError::AmbiguousSchedule`])
    /// - the interval is zero ([`ValidationError::ZeroInterval`])
    pub fn validate(&self) -> Result<(), PillminderError> {
        match self {
            Self::Daily { times } => check_set(times, "time"),
            Self::Weekly { days, times } => {
                check_set(days, "weekday")?;
                check_set(times, "time")
            }
            Self::Interval { every_minutes, .. } => {
                if *every_minutes == 0 {
                    return Err(ValidationError::ZeroInterval.into());
                }
                Ok(())
            }
            Self::MealTimes { slots } => check_set(slots, "meal slot"),
        }
    }
}

fn check_set<T>(items: &[T], what: &str) -> Result<(), PillminderError>
where
    T: Eq + Hash + fmt::Debug,
{
    if items.is_empty() {
        return Err(ValidationError::EmptySchedule.into());
    }
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item) {
            return Err(ValidationError::AmbiguousSchedule(format!(
                "{what} {item:?} listed more than once"
            ))
            .into());
        }
    }
    Ok(())
}

fn join_times(times: &[NaiveTime]) -> String {
    let mut sorted = times.to_vec();
    sorted.sort();
    sorted
        .iter()
        .map(|t| t.format("%H:%M").to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { times } => write!(f, "daily at {}", join_times(times)),
            Self::Weekly { days, times } => {
                let days = days
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{days} at {}", join_times(times))
            }
            Self::Interval {
                every_minutes,
                anchor,
            } => write!(
                f,
                "every {every_minutes} min from {}",
                anchor.format("%Y-%m-%d %H:%M UTC")
            ),
            Self::MealTimes { slots } => {
                let mut slots = slots.clone();
                slots.sort();
                let labels = slots
                    .iter()
                    .map(|s| s.label().to_lowercase())
                    .collect::<Vec<_>>()
                    .join(", ");
                f.write_str(&labels)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn should_accept_daily_rule_with_distinct_times() {
        assert!(Schedule::daily([at(8, 0), at(20, 0)]).validate().is_ok());
    }

    #[test]
    fn should_reject_daily_rule_without_times() {
        let result = Schedule::daily(Vec::new()).validate();
        assert!(matches!(
            result,
            Err(PillminderError::Validation(ValidationError::EmptySchedule))
        ));
    }

    #[test]
    fn should_reject_duplicate_time_as_ambiguous() {
        let result = Schedule::daily([at(8, 0), at(8, 0)]).validate();
        assert!(matches!(
            result,
            Err(PillminderError::Validation(ValidationError::AmbiguousSchedule(_)))
        ));
    }

    #[test]
    fn should_reject_weekly_rule_without_days() {
        let result = Schedule::weekly(Vec::new(), [at(8, 0)]).validate();
        assert!(matches!(
            result,
            Err(PillminderError::Validation(ValidationError::EmptySchedule))
        ));
    }

    #[test]
    fn should_reject_zero_interval() {
        let anchor = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let result = Schedule::every(0, anchor).validate();
        assert!(matches!(
            result,
            Err(PillminderError::Validation(ValidationError::ZeroInterval))
        ));
    }

    #[test]
    fn should_reject_duplicate_meal_slot() {
        let result = Schedule::meals([MealSlot::AtLunch, MealSlot::AtLunch]).validate();
        assert!(result.is_err());
    }

    #[test]
    fn should_display_rules() {
        assert_eq!(
            Schedule::daily([at(20, 0), at(8, 0)]).to_string(),
            "daily at 08:00, 20:00"
        );
        assert_eq!(
            Schedule::weekly([Weekday::Mon, Weekday::Thu], [at(9, 30)]).to_string(),
            "Mon, Thu at 09:30"
        );
        assert_eq!(
            Schedule::meals([MealSlot::AtDinner, MealSlot::BeforeBreakfast]).to_string(),
            "before breakfast, at dinner"
        );
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let anchor = Utc.with_ymd_and_hms(2026, 1, 1, 6, 0, 0).unwrap();
        let rules = vec![
            Schedule::daily([at(8, 0)]),
            Schedule::weekly([Weekday::Sun], [at(10, 0)]),
            Schedule::every(480, anchor),
            Schedule::meals([MealSlot::AfterLunch]),
        ];
        for rule in rules {
            let json = serde_json::to_string(&rule).unwrap();
            let parsed: Schedule = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, rule);
        }
    }
}
