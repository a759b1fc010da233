//! Core data models for the attendance engine.
//!
//! This module contains the source records (schedules, absences, closures,
//! end marks), the derived calendar rows, and the compliance audit records.

mod calendar_row;
mod child;
mod compliance;
mod interval;
mod schedule;

use uuid::Uuid;

pub use calendar_row::{AttendanceStatus, CacheHint, CalendarRow};
pub use child::{Child, completed_months};
pub use compliance::{ComplianceSnapshot, ComplianceStatus, StaffLevelObservation};
pub use interval::{Absence, ClosurePeriod, EndMark, EndMarkSettings};
pub use schedule::{Schedule, ScheduleRule, TimeSlot, weekday_from_index, weekday_index};

/// Identifies the tenant (daycare organisation) that owns every record.
pub type TenantId = Uuid;
/// Identifies a childcare group.
pub type GroupId = Uuid;
/// Identifies a child.
pub type ChildId = Uuid;
/// Identifies a time slot.
pub type TimeSlotId = Uuid;
