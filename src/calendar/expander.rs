//! Schedule rule expansion.
//!
//! Turns a child's recurring [`Schedule`] into concrete (date, group, slot)
//! candidates over a requested date range.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};

use super::resolver::SlotAssignment;
use crate::error::{EngineError, EngineResult};
use crate::models::{Schedule, ScheduleRule, weekday_index};

/// A schedule's rules indexed by weekday.
///
/// Built once per schedule; holds at most one rule per weekday.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekdayRuleMap {
    rules: [Option<ScheduleRule>; 7],
}

impl WeekdayRuleMap {
    /// Indexes the rules of `schedule` by weekday.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSchedule`] if two rules share a weekday.
    pub fn build(schedule: &Schedule) -> EngineResult<Self> {
        let mut map = Self::default();
        for rule in &schedule.rules {
            let slot = &mut map.rules[weekday_index(rule.weekday) as usize];
            if slot.is_some() {
                return Err(EngineError::InvalidSchedule {
                    schedule_id: schedule.id,
                    message: format!("more than one rule for {}", rule.weekday),
                });
            }
            *slot = Some(*rule);
        }
        Ok(map)
    }

    /// Returns the rule for `weekday`, if any.
    pub fn get(&self, weekday: Weekday) -> Option<&ScheduleRule> {
        self.rules[weekday_index(weekday) as usize].as_ref()
    }

    /// Returns the number of weekdays with a rule.
    pub fn len(&self) -> usize {
        self.rules.iter().flatten().count()
    }

    /// Returns true if no weekday has a rule.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Expands one schedule into candidate assignments over `[start, end]`.
///
/// Only dates inside both the requested range and the schedule window, and
/// whose weekday has a rule, produce a candidate. Work is linear in the
/// number of days in the intersection.
///
/// # Errors
///
/// Returns [`EngineError::InvalidSchedule`] if two rules share a weekday.
///
/// # Example
///
/// ```
/// use childcare_attendance::calendar::expand_schedule;
/// use childcare_attendance::models::{Schedule, ScheduleRule};
/// use chrono::{NaiveDate, Weekday};
/// use uuid::Uuid;
///
/// let schedule = Schedule {
///     id: Uuid::new_v4(),
///     child_id: Uuid::new_v4(),
///     start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     end_date: None,
///     rules: vec![ScheduleRule {
///         weekday: Weekday::Mon,
///         time_slot_id: Uuid::new_v4(),
///         group_id: Uuid::new_v4(),
///     }],
/// };
///
/// let candidates = expand_schedule(
///     &schedule,
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
/// )
/// .unwrap();
///
/// // Mondays in January 2024: 1st, 8th, 15th, 22nd, 29th
/// assert_eq!(candidates.len(), 5);
/// ```
pub fn expand_schedule(
    schedule: &Schedule,
    start: NaiveDate,
    end: NaiveDate,
) -> EngineResult<Vec<(NaiveDate, SlotAssignment)>> {
    let map = WeekdayRuleMap::build(schedule)?;
    if map.is_empty() {
        return Ok(Vec::new());
    }

    let first = start.max(schedule.start_date);
    let last = schedule.end_date.map_or(end, |schedule_end| end.min(schedule_end));

    let candidates = first
        .iter_days()
        .take_while(|date| *date <= last)
        .filter_map(|date| {
            map.get(date.weekday()).map(|rule| {
                (
                    date,
                    SlotAssignment {
                        schedule_id: schedule.id,
                        group_id: rule.group_id,
                        time_slot_id: rule.time_slot_id,
                    },
                )
            })
        })
        .collect();

    Ok(candidates)
}

/// Expands every schedule of one child and groups the candidates by date.
///
/// A date with more than one candidate signals overlapping schedules; the
/// resolver rejects it.
pub fn candidates_by_date(
    schedules: &[Schedule],
    start: NaiveDate,
    end: NaiveDate,
) -> EngineResult<BTreeMap<NaiveDate, Vec<SlotAssignment>>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<SlotAssignment>> = BTreeMap::new();
    for schedule in schedules {
        for (date, assignment) in expand_schedule(schedule, start, end)? {
            by_date.entry(date).or_default().push(assignment);
        }
    }
    Ok(by_date)
}
