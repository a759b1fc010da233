//! Interval resolution for a single child on a single date.
//!
//! This module decides whether a child produces an attendance row on a date,
//! and with which status, by weighing the four interval sources in a fixed
//! order:
//!
//! 1. A [`ClosurePeriod`] covering the date makes the row Closed.
//! 2. An [`EndMark`] dated on or before the date suppresses the row.
//! 3. A schedule rule matching the date supplies the group and slot; without
//!    one there is no row.
//! 4. An [`Absence`] covering the date makes the row Absent, otherwise it is
//!    Present.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{Absence, AttendanceStatus, ChildId, ClosurePeriod, EndMark, GroupId, TimeSlotId};

/// The group and slot a schedule rule assigns a child to on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotAssignment {
    /// The schedule that owns the matching rule.
    pub schedule_id: Uuid,
    /// The group the child attends.
    pub group_id: GroupId,
    /// The time slot the child attends.
    pub time_slot_id: TimeSlotId,
}

/// The outcome of resolving one child on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayResolution {
    /// The facility is closed; the row keeps the scheduled slot.
    Closed {
        /// The slot the child would otherwise have attended.
        assignment: SlotAssignment,
        /// The closure's reason, if recorded.
        reason: Option<String>,
    },
    /// The child produces no row on this date.
    NoRow,
    /// The child is scheduled and expected.
    Present(SlotAssignment),
    /// The child is scheduled but absent.
    Absent {
        /// The scheduled slot, retained on the absent row.
        assignment: SlotAssignment,
        /// The absence's reason, if recorded.
        reason: Option<String>,
    },
}

impl DayResolution {
    /// Returns the slot assignment behind the resolution, if a row is produced.
    pub fn assignment(&self) -> Option<&SlotAssignment> {
        match self {
            DayResolution::Closed { assignment, .. }
            | DayResolution::Present(assignment)
            | DayResolution::Absent { assignment, .. } => Some(assignment),
            DayResolution::NoRow => None,
        }
    }

    /// Returns the attendance status, if a row is produced.
    pub fn status(&self) -> Option<AttendanceStatus> {
        match self {
            DayResolution::Closed { .. } => Some(AttendanceStatus::Closed),
            DayResolution::Present(_) => Some(AttendanceStatus::Present),
            DayResolution::Absent { .. } => Some(AttendanceStatus::Absent),
            DayResolution::NoRow => None,
        }
    }

    /// Returns the reason carried from a closure or absence.
    pub fn reason(&self) -> Option<&str> {
        match self {
            DayResolution::Closed { reason, .. } | DayResolution::Absent { reason, .. } => {
                reason.as_deref()
            }
            DayResolution::Present(_) | DayResolution::NoRow => None,
        }
    }
}

/// Resolves one child's attendance on one date.
///
/// `candidates` are the slot assignments produced by the child's schedules for
/// `date` (see [`expand_schedule`](super::expand_schedule)). The interval
/// lists may contain records for other dates or, for closures, the whole
/// tenant; only those covering `date` or belonging to `child_id` are
/// consulted.
///
/// # Errors
///
/// Returns [`EngineError::AmbiguousSchedule`] when more than one candidate
/// applies and the outcome depends on choosing between them. The resolver
/// never guesses.
///
/// # Example
///
/// ```
/// use childcare_attendance::calendar::{DayResolution, SlotAssignment, resolve_day};
/// use childcare_attendance::models::ClosurePeriod;
/// use chrono::NaiveDate;
/// use uuid::Uuid;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
/// let assignment = SlotAssignment {
///     schedule_id: Uuid::new_v4(),
///     group_id: Uuid::new_v4(),
///     time_slot_id: Uuid::new_v4(),
/// };
/// let closure = ClosurePeriod {
///     id: Uuid::new_v4(),
///     start_date: date,
///     end_date: date,
///     reason: Some("Staff training".to_string()),
/// };
///
/// let resolution = resolve_day(Uuid::new_v4(), date, &[assignment], &[closure], &[], &[]).unwrap();
/// assert_eq!(
///     resolution,
///     DayResolution::Closed { assignment, reason: Some("Staff training".to_string()) }
/// );
/// ```
pub fn resolve_day(
    child_id: ChildId,
    date: NaiveDate,
    candidates: &[SlotAssignment],
    closures: &[ClosurePeriod],
    end_marks: &[EndMark],
    absences: &[Absence],
) -> EngineResult<DayResolution> {
    if let Some(closure) = closures.iter().find(|closure| closure.covers(date)) {
        return Ok(match single_candidate(child_id, date, candidates)? {
            Some(assignment) => DayResolution::Closed {
                assignment,
                reason: closure.reason.clone(),
            },
            None => DayResolution::NoRow,
        });
    }

    let ended = end_marks
        .iter()
        .any(|mark| mark.child_id == child_id && mark.excludes(date));
    if ended {
        return Ok(DayResolution::NoRow);
    }

    let Some(assignment) = single_candidate(child_id, date, candidates)? else {
        return Ok(DayResolution::NoRow);
    };

    let absence = absences
        .iter()
        .find(|absence| absence.child_id == child_id && absence.covers(date));

    Ok(match absence {
        Some(absence) => DayResolution::Absent {
            assignment,
            reason: absence.reason.clone(),
        },
        None => DayResolution::Present(assignment),
    })
}

fn single_candidate(
    child_id: ChildId,
    date: NaiveDate,
    candidates: &[SlotAssignment],
) -> EngineResult<Option<SlotAssignment>> {
    match candidates {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        _ => Err(EngineError::AmbiguousSchedule {
            child_id,
            weekday: date.weekday(),
            date,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_date(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    fn assignment() -> SlotAssignment {
        SlotAssignment {
            schedule_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            time_slot_id: Uuid::new_v4(),
        }
    }

    fn closure(start: &str, end: &str) -> ClosurePeriod {
        ClosurePeriod {
            id: Uuid::new_v4(),
            start_date: make_date(start),
            end_date: make_date(end),
            reason: Some("Holiday".to_string()),
        }
    }

    fn absence(child_id: ChildId, start: &str, end: &str) -> Absence {
        Absence {
            id: Uuid::new_v4(),
            child_id,
            start_date: make_date(start),
            end_date: make_date(end),
            reason: Some("Sick".to_string()),
        }
    }

    fn end_mark(child_id: ChildId, date: &str) -> EndMark {
        EndMark {
            id: Uuid::new_v4(),
            child_id,
            end_date: make_date(date),
            reason: "Moved away".to_string(),
            system_generated: false,
        }
    }

    #[test]
    fn test_scheduled_day_without_overrides_is_present() {
        let child = Uuid::new_v4();
        let slot = assignment();
        let resolution =
            resolve_day(child, make_date("2024-01-01"), &[slot], &[], &[], &[]).unwrap();
        assert_eq!(resolution, DayResolution::Present(slot));
        assert_eq!(resolution.status(), Some(AttendanceStatus::Present));
        assert_eq!(resolution.reason(), None);
    }

    #[test]
    fn test_unscheduled_day_has_no_row() {
        let resolution =
            resolve_day(Uuid::new_v4(), make_date("2024-01-02"), &[], &[], &[], &[]).unwrap();
        assert_eq!(resolution, DayResolution::NoRow);
        assert!(resolution.assignment().is_none());
    }

    #[test]
    fn test_closure_overrides_absence() {
        let child = Uuid::new_v4();
        let slot = assignment();
        let resolution = resolve_day(
            child,
            make_date("2024-01-08"),
            &[slot],
            &[closure("2024-01-08", "2024-01-08")],
            &[],
            &[absence(child, "2024-01-01", "2024-01-31")],
        )
        .unwrap();
        assert_eq!(resolution.status(), Some(AttendanceStatus::Closed));
        assert_eq!(resolution.assignment(), Some(&slot));
        assert_eq!(resolution.reason(), Some("Holiday"));
    }

    #[test]
    fn test_closure_without_schedule_has_no_row() {
        let resolution = resolve_day(
            Uuid::new_v4(),
            make_date("2024-01-09"),
            &[],
            &[closure("2024-01-08", "2024-01-12")],
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(resolution, DayResolution::NoRow);
    }

    #[test]
    fn test_absence_keeps_slot_and_reason() {
        let child = Uuid::new_v4();
        let slot = assignment();
        let resolution = resolve_day(
            child,
            make_date("2024-01-01"),
            &[slot],
            &[],
            &[],
            &[absence(child, "2024-01-01", "2024-01-01")],
        )
        .unwrap();
        assert_eq!(
            resolution,
            DayResolution::Absent {
                assignment: slot,
                reason: Some("Sick".to_string()),
            }
        );
    }

    #[test]
    fn test_another_childs_absence_is_ignored() {
        let slot = assignment();
        let resolution = resolve_day(
            Uuid::new_v4(),
            make_date("2024-01-01"),
            &[slot],
            &[],
            &[],
            &[absence(Uuid::new_v4(), "2024-01-01", "2024-01-01")],
        )
        .unwrap();
        assert_eq!(resolution, DayResolution::Present(slot));
    }

    #[test]
    fn test_end_mark_boundary_is_exact() {
        let child = Uuid::new_v4();
        let slot = assignment();
        let marks = [end_mark(child, "2024-01-15")];

        let before = resolve_day(child, make_date("2024-01-14"), &[slot], &[], &marks, &[]).unwrap();
        let on = resolve_day(child, make_date("2024-01-15"), &[slot], &[], &marks, &[]).unwrap();
        let after = resolve_day(child, make_date("2024-01-16"), &[slot], &[], &marks, &[]).unwrap();

        assert_eq!(before, DayResolution::Present(slot));
        assert_eq!(on, DayResolution::NoRow);
        assert_eq!(after, DayResolution::NoRow);
    }

    #[test]
    fn test_overlapping_candidates_are_rejected() {
        let child = Uuid::new_v4();
        let result = resolve_day(
            child,
            make_date("2024-01-01"),
            &[assignment(), assignment()],
            &[],
            &[],
            &[],
        );
        match result {
            Err(EngineError::AmbiguousSchedule {
                child_id,
                weekday,
                date,
            }) => {
                assert_eq!(child_id, child);
                assert_eq!(weekday, chrono::Weekday::Mon);
                assert_eq!(date, make_date("2024-01-01"));
            }
            other => panic!("Expected AmbiguousSchedule, got {:?}", other),
        }
    }

    #[test]
    fn test_overlapping_candidates_after_end_mark_are_irrelevant() {
        let child = Uuid::new_v4();
        let resolution = resolve_day(
            child,
            make_date("2024-02-05"),
            &[assignment(), assignment()],
            &[],
            &[end_mark(child, "2024-02-01")],
            &[],
        )
        .unwrap();
        assert_eq!(resolution, DayResolution::NoRow);
    }
}
