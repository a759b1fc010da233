//! Materialized calendar rows.
//!
//! A [`CalendarRow`] is a purely derived fact: one child, one date, one time
//! slot in one group, with the resolved [`AttendanceStatus`]. Rows are cached
//! for performance and may be deleted and recomputed at any time.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChildId, GroupId, TenantId, TimeSlotId};

/// The resolved attendance status of a calendar row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// The child is scheduled and expected.
    Present,
    /// The child is scheduled but an absence covers the date.
    Absent,
    /// The facility is closed on the date.
    Closed,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "Present"),
            AttendanceStatus::Absent => write!(f, "Absent"),
            AttendanceStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// How a query should treat the row cache.
///
/// # Example
///
/// ```
/// use childcare_attendance::models::CacheHint;
///
/// assert_eq!(CacheHint::from_force_flag(true), CacheHint::Bypass);
/// assert_eq!(CacheHint::from_force_flag(false), CacheHint::PreferCache);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheHint {
    /// Serve cached rows when present, compute otherwise.
    #[default]
    PreferCache,
    /// Always recompute and replace the cached rows.
    Bypass,
}

impl CacheHint {
    /// Maps a `force`/`refresh` request flag to a hint.
    pub fn from_force_flag(force: bool) -> Self {
        if force {
            CacheHint::Bypass
        } else {
            CacheHint::PreferCache
        }
    }
}

/// One materialized (child, date, slot) attendance fact.
///
/// Uniquely keyed by (tenant, group, child, date, slot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRow {
    /// The owning tenant.
    pub tenant_id: TenantId,
    /// The group the child attends in this slot.
    pub group_id: GroupId,
    /// The child.
    pub child_id: ChildId,
    /// The calendar date.
    pub date: NaiveDate,
    /// The time slot.
    pub slot_id: TimeSlotId,
    /// The time slot's display name.
    pub slot_name: String,
    /// The slot's daily start time.
    pub start_time: NaiveTime,
    /// The slot's daily end time.
    pub end_time: NaiveTime,
    /// The resolved status.
    pub status: AttendanceStatus,
    /// Reason carried over from the absence or closure, if any.
    pub reason: Option<String>,
    /// Age in completed years on `date`.
    pub age_years: u32,
    /// The child's birthday.
    pub birthday: NaiveDate,
    /// When this row was computed.
    pub cached_at: DateTime<Utc>,
}

impl CalendarRow {
    /// Returns the row's unique cache key.
    pub fn key(&self) -> (TenantId, GroupId, ChildId, NaiveDate, TimeSlotId) {
        (
            self.tenant_id,
            self.group_id,
            self.child_id,
            self.date,
            self.slot_id,
        )
    }

    /// Returns true if both rows state the same fact, ignoring when they were computed.
    pub fn same_fact(&self, other: &CalendarRow) -> bool {
        self.key() == other.key()
            && self.slot_name == other.slot_name
            && self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.status == other.status
            && self.reason == other.reason
            && self.age_years == other.age_years
            && self.birthday == other.birthday
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_row() -> CalendarRow {
        CalendarRow {
            tenant_id: Uuid::nil(),
            group_id: Uuid::nil(),
            child_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            slot_id: Uuid::nil(),
            slot_name: "Morning".to_string(),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            status: AttendanceStatus::Present,
            reason: None,
            age_years: 3,
            birthday: NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
            cached_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&AttendanceStatus::Closed).unwrap();
        assert_eq!(json, "\"closed\"");
    }

    #[test]
    fn test_same_fact_ignores_cached_at() {
        let a = sample_row();
        let mut b = a.clone();
        b.cached_at = a.cached_at + chrono::Duration::minutes(5);
        assert!(a.same_fact(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_fact_detects_status_change() {
        let a = sample_row();
        let mut b = a.clone();
        b.status = AttendanceStatus::Absent;
        assert!(!a.same_fact(&b));
    }

    #[test]
    fn test_default_hint_prefers_cache() {
        assert_eq!(CacheHint::default(), CacheHint::PreferCache);
    }
}
