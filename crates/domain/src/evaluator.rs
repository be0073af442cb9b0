//! Schedule evaluator — turns a recurrence rule into concrete due timestamps.
//!
//! Evaluation is a pure function of the entry, the reference time, the
//! configured UTC offset, and the meal timetable. Calling it twice with the
//! same inputs yields the same answer.

use chrono::{FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone, Utc};

use crate::error::PillminderError;
use crate::medicine::{Course, MedicineEntry};
use crate::schedule::{Schedule, Timetable};
use crate::time::Timestamp;

/// Days scanned for a calendar rule before giving up. A weekly rule fires
/// at least once in any eight consecutive days.
const CALENDAR_HORIZON_DAYS: usize = 8;

/// Computes due occurrences for medicine entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEvaluator {
    offset: FixedOffset,
    timetable: Timetable,
}

impl Default for ScheduleEvaluator {
    fn default() -> Self {
        Self::new(Utc.fix(), Timetable::default())
    }
}

impl ScheduleEvaluator {
    /// Evaluate local times of day in `offset`, resolving meal slots
    /// through `timetable`.
    #[must_use]
    pub fn new(offset: FixedOffset, timetable: Timetable) -> Self {
        Self { offset, timetable }
    }

    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    #[must_use]
    pub fn timetable(&self) -> &Timetable {
        &self.timetable
    }

    /// Local calendar date of `ts`.
    #[must_use]
    pub fn local_date(&self, ts: Timestamp) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }

    /// Next due occurrence of `entry` at or after `reference`.
    ///
    /// Returns `None` when the entry is inactive or its course ends before
    /// any remaining occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::Validation`] when the rule is malformed or
    /// ambiguous; no occurrence is guessed in that case.
    pub fn next_due(
        &self,
        entry: &MedicineEntry,
        reference: Timestamp,
    ) -> Result<Option<Timestamp>, PillminderError> {
        if !entry.active {
            return Ok(None);
        }
        self.next_occurrence(&entry.schedule, &entry.course, reference)
    }

    /// Next occurrence of a rule within a course, ignoring the active flag.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::Validation`] when the rule is malformed or
    /// ambiguous.
    pub fn next_occurrence(
        &self,
        schedule: &Schedule,
        course: &Course,
        reference: Timestamp,
    ) -> Result<Option<Timestamp>, PillminderError> {
        schedule.validate()?;
        match schedule {
            Schedule::Daily { times } => Ok(self.next_on_days(times, course, reference, |_| true)),
            Schedule::Weekly { days, times } => Ok(self.next_on_days(times, course, reference, |d| {
                days.contains(&chrono::Datelike::weekday(&d))
            })),
            Schedule::MealTimes { slots } => {
                let times = self.timetable.resolve(slots)?;
                Ok(self.next_on_days(&times, course, reference, |_| true))
            }
            Schedule::Interval {
                every_minutes,
                anchor,
            } => Ok(self.next_on_interval(*every_minutes, *anchor, course, reference)),
        }
    }

    /// Every due occurrence of `entry` in the closed window `[from, to]`,
    /// at most `limit` of them, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`PillminderError::Validation`] when the rule is malformed or
    /// ambiguous.
    pub fn occurrences_between(
        &self,
        entry: &MedicineEntry,
        from: Timestamp,
        to: Timestamp,
        limit: usize,
    ) -> Result<Vec<Timestamp>, PillminderError> {
        let mut found = Vec::new();
        let mut cursor = from;
        while found.len() < limit {
            match self.next_due(entry, cursor)? {
                Some(due) if due <= to => {
                    found.push(due);
                    cursor = due + TimeDelta::nanoseconds(1);
                }
                _ => break,
            }
        }
        Ok(found)
    }

    fn to_utc(&self, date: NaiveDate, time: NaiveTime) -> Option<Timestamp> {
        self.offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn next_on_days(
        &self,
        times: &[NaiveTime],
        course: &Course,
        reference: Timestamp,
        day_matches: impl Fn(NaiveDate) -> bool,
    ) -> Option<Timestamp> {
        let mut times = times.to_vec();
        times.sort();

        let mut day = self.local_date(reference);
        if let Some(start) = course.start {
            day = day.max(start);
        }

        for _ in 0..CALENDAR_HORIZON_DAYS {
            if course.end.is_some_and(|end| day > end) {
                return None;
            }
            if day_matches(day) {
                let due = times
                    .iter()
                    .filter_map(|time| self.to_utc(day, *time))
                    .find(|candidate| *candidate >= reference);
                if due.is_some() {
                    return due;
                }
            }
            day = day.succ_opt()?;
        }
        None
    }

    fn next_on_interval(
        &self,
        every_minutes: u32,
        anchor: Timestamp,
        course: &Course,
        reference: Timestamp,
    ) -> Option<Timestamp> {
        let mut floor = reference;
        if let Some(start) = course.start {
            floor = floor.max(self.to_utc(start, NaiveTime::MIN)?);
        }

        let due = if floor <= anchor {
            anchor
        } else {
            let step_ms = i64::from(every_minutes) * 60_000;
            let elapsed_ms = (floor - anchor).num_milliseconds();
            let mut steps = (elapsed_ms + step_ms - 1) / step_ms;
            let mut due = anchor.checked_add_signed(TimeDelta::milliseconds(
                steps.checked_mul(step_ms)?,
            ))?;
            // Sub-millisecond remainders are lost by `num_milliseconds`.
            if due < floor {
                steps += 1;
                due = anchor
                    .checked_add_signed(TimeDelta::milliseconds(steps.checked_mul(step_ms)?))?;
            }
            due
        };

        if course.end.is_some_and(|end| self.local_date(due) > end) {
            return None;
        }
        Some(due)
    }
}
