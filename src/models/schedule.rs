//! Schedule, schedule rule, and time slot models.
//!
//! A child's recurring attendance is a [`Schedule`] over a date window that
//! owns one [`ScheduleRule`] per weekday it covers. Weekdays cross the wire as
//! integers with 0 = Sunday through 6 = Saturday.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::{ChildId, GroupId, TimeSlotId};
use crate::error::{EngineError, EngineResult};

/// Converts a 0-based weekday index (0 = Sunday) to a [`Weekday`].
///
/// # Example
///
/// ```
/// use childcare_attendance::models::weekday_from_index;
/// use chrono::Weekday;
///
/// assert_eq!(weekday_from_index(0), Some(Weekday::Sun));
/// assert_eq!(weekday_from_index(1), Some(Weekday::Mon));
/// assert_eq!(weekday_from_index(7), None);
/// ```
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// Converts a [`Weekday`] to its 0-based index (0 = Sunday).
pub fn weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

fn serialize_weekday<S: Serializer>(weekday: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(weekday_index(*weekday))
}

fn deserialize_weekday<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
    let index = u8::deserialize(deserializer)?;
    weekday_from_index(index).ok_or_else(|| {
        serde::de::Error::custom(format!("weekday must be between 0 and 6, got {}", index))
    })
}

/// A named, fixed daily time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Unique identifier for the slot.
    pub id: TimeSlotId,
    /// Display name (e.g. "Morning").
    pub name: String,
    /// Daily start time.
    pub start_time: NaiveTime,
    /// Daily end time.
    pub end_time: NaiveTime,
}

impl TimeSlot {
    /// Returns true if `time` falls inside `[start_time, end_time)`.
    pub fn contains_time(&self, time: NaiveTime) -> bool {
        time >= self.start_time && time < self.end_time
    }
}

/// One weekday + time slot + group assignment within a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRule {
    /// The weekday this rule applies to.
    #[serde(
        serialize_with = "serialize_weekday",
        deserialize_with = "deserialize_weekday"
    )]
    pub weekday: Weekday,
    /// The time slot the child attends.
    pub time_slot_id: TimeSlotId,
    /// The group the child attends.
    pub group_id: GroupId,
}

/// A child's recurring attendance definition over a date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Unique identifier for the schedule.
    pub id: Uuid,
    /// The child this schedule belongs to.
    pub child_id: ChildId,
    /// First date covered (inclusive).
    pub start_date: NaiveDate,
    /// Last date covered (inclusive); `None` means open-ended.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// The weekday rules owned by this schedule.
    #[serde(default)]
    pub rules: Vec<ScheduleRule>,
}

impl Schedule {
    /// Returns true if `date` lies inside the schedule window.
    ///
    /// # Example
    ///
    /// ```
    /// use childcare_attendance::models::Schedule;
    /// use chrono::NaiveDate;
    /// use uuid::Uuid;
    ///
    /// let schedule = Schedule {
    ///     id: Uuid::nil(),
    ///     child_id: Uuid::nil(),
    ///     start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    ///     end_date: None,
    ///     rules: vec![],
    /// };
    /// assert!(schedule.covers(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
    /// assert!(!schedule.covers(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
    /// ```
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.is_none_or(|end| date <= end)
    }

    /// Returns true if this schedule's window shares at least one date with `other`'s.
    pub fn window_overlaps(&self, other: &Schedule) -> bool {
        let starts_before_other_ends = other.end_date.is_none_or(|end| self.start_date <= end);
        let other_starts_before_self_ends =
            self.end_date.is_none_or(|end| other.start_date <= end);
        starts_before_other_ends && other_starts_before_self_ends
    }

    /// Returns true if any rule assigns the child to `group_id`.
    pub fn targets_group(&self, group_id: GroupId) -> bool {
        self.rules.iter().any(|rule| rule.group_id == group_id)
    }

    /// Returns the rules that apply on `weekday`.
    pub fn rules_for(&self, weekday: Weekday) -> impl Iterator<Item = &ScheduleRule> {
        self.rules.iter().filter(move |rule| rule.weekday == weekday)
    }

    /// Checks the schedule's own consistency.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSchedule`] if the end date precedes the
    /// start date, or if two rules share a weekday.
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(end) = self.end_date.filter(|end| *end < self.start_date) {
            return Err(EngineError::InvalidSchedule {
                schedule_id: self.id,
                message: format!("end date {} is before start date {}", end, self.start_date),
            });
        }

        let mut seen = [false; 7];
        for rule in &self.rules {
            let index = weekday_index(rule.weekday) as usize;
            if seen[index] {
                return Err(EngineError::InvalidSchedule {
                    schedule_id: self.id,
                    message: format!("more than one rule for {}", rule.weekday),
                });
            }
            seen[index] = true;
        }

        Ok(())
    }
}
