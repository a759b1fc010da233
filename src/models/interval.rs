//! Date-interval records that override scheduled attendance.
//!
//! This module contains [`Absence`], [`ClosurePeriod`], and [`EndMark`], the
//! three overrides the interval resolver weighs against a child's schedule,
//! plus the per-tenant [`EndMarkSettings`] used to derive system end marks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ChildId;

/// A child-specific date range during which the child is absent.
///
/// # Example
///
/// ```
/// use childcare_attendance::models::Absence;
/// use chrono::NaiveDate;
/// use uuid::Uuid;
///
/// let absence = Absence {
///     id: Uuid::nil(),
///     child_id: Uuid::nil(),
///     start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     end_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
///     reason: Some("Flu".to_string()),
/// };
/// assert!(absence.covers(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()));
/// assert!(!absence.covers(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absence {
    /// Unique identifier for the absence.
    pub id: Uuid,
    /// The absent child.
    pub child_id: ChildId,
    /// First absent date (inclusive).
    pub start_date: NaiveDate,
    /// Last absent date (inclusive).
    pub end_date: NaiveDate,
    /// Optional free-text reason.
    #[serde(default)]
    pub reason: Option<String>,
}

impl Absence {
    /// Returns true if `date` falls inside the absence (inclusive).
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// A tenant-wide date range during which the facility is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosurePeriod {
    /// Unique identifier for the closure.
    pub id: Uuid,
    /// First closed date (inclusive).
    pub start_date: NaiveDate,
    /// Last closed date (inclusive).
    pub end_date: NaiveDate,
    /// Optional free-text reason (e.g. "Christmas break").
    #[serde(default)]
    pub reason: Option<String>,
}

impl ClosurePeriod {
    /// Returns true if `date` falls inside the closure (inclusive).
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// A date from which a child no longer produces attendance rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndMark {
    /// Unique identifier for the end mark.
    pub id: Uuid,
    /// The child whose attendance ends.
    pub child_id: ChildId,
    /// First date without attendance.
    pub end_date: NaiveDate,
    /// Why attendance ends.
    pub reason: String,
    /// True when derived from [`EndMarkSettings`] rather than entered manually.
    #[serde(default)]
    pub system_generated: bool,
}

impl EndMark {
    /// Returns true if the child is excluded on `date` (on or after the end date).
    pub fn excludes(&self, date: NaiveDate) -> bool {
        date >= self.end_date
    }
}

/// Per-tenant settings for automatically ending attendance at a given age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndMarkSettings {
    /// Whether system end marks are generated at all.
    pub enabled: bool,
    /// Age in years at which attendance ends.
    pub years_after_birth: u32,
    /// Reason recorded on generated end marks.
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_date(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_single_day_absence_covers_only_that_day() {
        let absence = Absence {
            id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            start_date: make_date("2024-01-01"),
            end_date: make_date("2024-01-01"),
            reason: None,
        };
        assert!(absence.covers(make_date("2024-01-01")));
        assert!(!absence.covers(make_date("2023-12-31")));
        assert!(!absence.covers(make_date("2024-01-02")));
    }

    #[test]
    fn test_closure_covers_inclusive_range() {
        let closure = ClosurePeriod {
            id: Uuid::new_v4(),
            start_date: make_date("2024-12-24"),
            end_date: make_date("2025-01-01"),
            reason: Some("Holidays".to_string()),
        };
        assert!(closure.covers(make_date("2024-12-24")));
        assert!(closure.covers(make_date("2024-12-31")));
        assert!(closure.covers(make_date("2025-01-01")));
        assert!(!closure.covers(make_date("2025-01-02")));
    }

    #[test]
    fn test_end_mark_boundary_is_exclusive_of_previous_day() {
        let mark = EndMark {
            id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            end_date: make_date("2024-08-01"),
            reason: "Moved to school".to_string(),
            system_generated: false,
        };
        assert!(!mark.excludes(make_date("2024-07-31")));
        assert!(mark.excludes(make_date("2024-08-01")));
        assert!(mark.excludes(make_date("2025-01-01")));
    }

    #[test]
    fn test_end_mark_system_flag_defaults_to_manual() {
        let json = format!(
            r#"{{"id": "{}", "child_id": "{}", "end_date": "2024-08-01", "reason": "left"}}"#,
            Uuid::nil(),
            Uuid::nil()
        );
        let mark: EndMark = serde_json::from_str(&json).unwrap();
        assert!(!mark.system_generated);
    }
}
