//! Persistence seams for the attendance engine.
//!
//! The calendar and compliance components read and write through the
//! [`CalendarStore`] and [`ComplianceStore`] traits so the resolution and
//! aggregation algorithms stay free of storage concerns. Every method takes the
//! tenant explicitly; implementations must never return another tenant's data.
//!
//! # Thread Safety
//! Implementations must be `Send + Sync`; the engine shares one store across
//! concurrent requests.

mod memory;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;
use crate::models::{
    Absence, CalendarRow, Child, ChildId, ClosurePeriod, ComplianceSnapshot, EndMark, GroupId,
    Schedule, StaffLevelObservation, TenantId, TimeSlot,
};

pub use memory::InMemoryStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Source records and the derived row cache used by the calendar materializer.
pub trait CalendarStore: Send + Sync {
    /// Returns every time slot of the tenant.
    fn time_slots(&self, tenant_id: TenantId) -> StoreResult<Vec<TimeSlot>>;

    /// Returns the children with the given ids; unknown ids are skipped.
    fn children(&self, tenant_id: TenantId, child_ids: &[ChildId]) -> StoreResult<Vec<Child>>;

    /// Returns every child of the tenant.
    fn all_children(&self, tenant_id: TenantId) -> StoreResult<Vec<Child>>;

    /// Returns every schedule with at least one rule targeting `group_id`.
    fn schedules_for_group(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
    ) -> StoreResult<Vec<Schedule>>;

    /// Returns every schedule of one child, whichever groups it targets.
    fn schedules_for_child(
        &self,
        tenant_id: TenantId,
        child_id: ChildId,
    ) -> StoreResult<Vec<Schedule>>;

    /// Persists a new schedule.
    fn insert_schedule(&self, tenant_id: TenantId, schedule: Schedule) -> StoreResult<()>;

    /// Returns the child's absences that overlap `[start, end]`.
    fn absences_for_child(
        &self,
        tenant_id: TenantId,
        child_id: ChildId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Absence>>;

    /// Returns the tenant's closures that overlap `[start, end]`.
    fn closures_between(
        &self,
        tenant_id: TenantId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<ClosurePeriod>>;

    /// Returns every end mark of the tenant.
    fn end_marks(&self, tenant_id: TenantId) -> StoreResult<Vec<EndMark>>;

    /// Persists a new end mark.
    fn insert_end_mark(&self, tenant_id: TenantId, end_mark: EndMark) -> StoreResult<()>;

    /// Returns the cached rows of one group on one date (empty if none).
    fn cached_rows(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        date: NaiveDate,
    ) -> StoreResult<Vec<CalendarRow>>;

    /// Replaces every cached row of one group on one date with `rows`.
    ///
    /// The old rows are deleted before the new ones are inserted, so no stale
    /// row survives. Returns [`StoreError::Conflict`] when the uniqueness of
    /// (tenant, group, child, date, slot) would be violated.
    fn replace_rows(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        date: NaiveDate,
        rows: &[CalendarRow],
    ) -> StoreResult<()>;

    /// Deletes cached rows from `start` through `end` (open-ended if `None`)
    /// for one group, or for every group when `group_id` is `None`.
    ///
    /// Returns the number of rows removed.
    fn delete_rows(
        &self,
        tenant_id: TenantId,
        group_id: Option<GroupId>,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> StoreResult<usize>;
}

/// Append-only staffing observations and compliance snapshots.
///
/// Records are never updated or deleted.
pub trait ComplianceStore: Send + Sync {
    /// Appends a staff level observation.
    fn append_staff_level(
        &self,
        tenant_id: TenantId,
        observation: StaffLevelObservation,
    ) -> StoreResult<()>;

    /// Returns the most recent observation for the group at or before `at`.
    fn latest_staff_level(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<StaffLevelObservation>>;

    /// Appends a compliance snapshot.
    fn append_snapshot(&self, tenant_id: TenantId, snapshot: ComplianceSnapshot)
    -> StoreResult<()>;

    /// Returns the group's snapshots captured within `[from, to]`, oldest first.
    fn snapshots_between(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<ComplianceSnapshot>>;
}

/// A store that serves both the calendar and the compliance components.
pub trait EngineStore: CalendarStore + ComplianceStore {}

impl<T: CalendarStore + ComplianceStore> EngineStore for T {}
