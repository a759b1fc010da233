//! In-memory store.
//!
//! Holds every tenant's records behind a single `parking_lot::RwLock`. Used by
//! the server binary and by tests; a relational store would implement the same
//! traits with a unique index on the calendar row key.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;

use super::{CalendarStore, ComplianceStore, StoreResult};
use crate::error::StoreError;
use crate::models::{
    Absence, CalendarRow, Child, ChildId, ClosurePeriod, ComplianceSnapshot, EndMark, GroupId,
    Schedule, StaffLevelObservation, TenantId, TimeSlot, TimeSlotId,
};

#[derive(Debug, Default)]
struct TenantData {
    children: HashMap<ChildId, Child>,
    time_slots: HashMap<TimeSlotId, TimeSlot>,
    schedules: Vec<Schedule>,
    absences: Vec<Absence>,
    closures: Vec<ClosurePeriod>,
    end_marks: Vec<EndMark>,
    rows: BTreeMap<(GroupId, NaiveDate), Vec<CalendarRow>>,
    staff_levels: Vec<StaffLevelObservation>,
    snapshots: Vec<ComplianceSnapshot>,
}

/// A thread-safe, tenant-partitioned in-memory implementation of both store traits.
///
/// # Example
///
/// ```
/// use childcare_attendance::models::Child;
/// use childcare_attendance::store::{CalendarStore, InMemoryStore};
/// use chrono::NaiveDate;
/// use uuid::Uuid;
///
/// let store = InMemoryStore::new();
/// let tenant = Uuid::new_v4();
/// let child = Child {
///     id: Uuid::new_v4(),
///     name: "Noah".to_string(),
///     birthday: NaiveDate::from_ymd_opt(2021, 5, 4).unwrap(),
/// };
/// store.insert_child(tenant, child.clone());
///
/// assert_eq!(store.children(tenant, &[child.id]).unwrap(), vec![child]);
/// assert!(store.all_children(Uuid::new_v4()).unwrap().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tenants: RwLock<HashMap<TenantId, TenantData>>,
    pending_conflicts: AtomicU32,
    row_writes: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a child record.
    pub fn insert_child(&self, tenant_id: TenantId, child: Child) {
        self.tenants
            .write()
            .entry(tenant_id)
            .or_default()
            .children
            .insert(child.id, child);
    }

    /// Adds or replaces a time slot.
    pub fn insert_time_slot(&self, tenant_id: TenantId, slot: TimeSlot) {
        self.tenants
            .write()
            .entry(tenant_id)
            .or_default()
            .time_slots
            .insert(slot.id, slot);
    }

    /// Adds an absence.
    pub fn insert_absence(&self, tenant_id: TenantId, absence: Absence) {
        self.tenants
            .write()
            .entry(tenant_id)
            .or_default()
            .absences
            .push(absence);
    }

    /// Adds a closure period.
    pub fn insert_closure(&self, tenant_id: TenantId, closure: ClosurePeriod) {
        self.tenants
            .write()
            .entry(tenant_id)
            .or_default()
            .closures
            .push(closure);
    }

    /// Makes the next `count` calls to [`CalendarStore::replace_rows`] fail
    /// with [`StoreError::Conflict`], as a concurrent writer would.
    pub fn inject_conflicts(&self, count: u32) {
        self.pending_conflicts.store(count, Ordering::SeqCst);
    }

    /// Returns how many row replacements have been committed.
    pub fn row_writes(&self) -> u64 {
        self.row_writes.load(Ordering::SeqCst)
    }

    /// Returns how many calendar rows are cached for the tenant.
    pub fn cached_row_count(&self, tenant_id: TenantId) -> usize {
        self.tenants
            .read()
            .get(&tenant_id)
            .map(|data| data.rows.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    fn take_injected_conflict(&self) -> bool {
        self.pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pending| {
                pending.checked_sub(1)
            })
            .is_ok()
    }

    fn read_tenant<T>(&self, tenant_id: TenantId, f: impl FnOnce(&TenantData) -> T) -> Option<T> {
        self.tenants.read().get(&tenant_id).map(f)
    }
}

impl CalendarStore for InMemoryStore {
    fn time_slots(&self, tenant_id: TenantId) -> StoreResult<Vec<TimeSlot>> {
        Ok(self
            .read_tenant(tenant_id, |data| data.time_slots.values().cloned().collect())
            .unwrap_or_default())
    }

    fn children(&self, tenant_id: TenantId, child_ids: &[ChildId]) -> StoreResult<Vec<Child>> {
        Ok(self
            .read_tenant(tenant_id, |data| {
                child_ids
                    .iter()
                    .filter_map(|id| data.children.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn all_children(&self, tenant_id: TenantId) -> StoreResult<Vec<Child>> {
        Ok(self
            .read_tenant(tenant_id, |data| data.children.values().cloned().collect())
            .unwrap_or_default())
    }

    fn schedules_for_group(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
    ) -> StoreResult<Vec<Schedule>> {
        Ok(self
            .read_tenant(tenant_id, |data| {
                data.schedules
                    .iter()
                    .filter(|schedule| schedule.targets_group(group_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn schedules_for_child(
        &self,
        tenant_id: TenantId,
        child_id: ChildId,
    ) -> StoreResult<Vec<Schedule>> {
        Ok(self
            .read_tenant(tenant_id, |data| {
                data.schedules
                    .iter()
                    .filter(|schedule| schedule.child_id == child_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn insert_schedule(&self, tenant_id: TenantId, schedule: Schedule) -> StoreResult<()> {
        self.tenants
            .write()
            .entry(tenant_id)
            .or_default()
            .schedules
            .push(schedule);
        Ok(())
    }

    fn absences_for_child(
        &self,
        tenant_id: TenantId,
        child_id: ChildId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Absence>> {
        Ok(self
            .read_tenant(tenant_id, |data| {
                data.absences
                    .iter()
                    .filter(|absence| {
                        absence.child_id == child_id
                            && absence.start_date <= end
                            && absence.end_date >= start
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn closures_between(
        &self,
        tenant_id: TenantId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<ClosurePeriod>> {
        Ok(self
            .read_tenant(tenant_id, |data| {
                data.closures
                    .iter()
                    .filter(|closure| closure.start_date <= end && closure.end_date >= start)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn end_marks(&self, tenant_id: TenantId) -> StoreResult<Vec<EndMark>> {
        Ok(self
            .read_tenant(tenant_id, |data| data.end_marks.clone())
            .unwrap_or_default())
    }

    fn insert_end_mark(&self, tenant_id: TenantId, end_mark: EndMark) -> StoreResult<()> {
        self.tenants
            .write()
            .entry(tenant_id)
            .or_default()
            .end_marks
            .push(end_mark);
        Ok(())
    }

    fn cached_rows(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        date: NaiveDate,
    ) -> StoreResult<Vec<CalendarRow>> {
        Ok(self
            .read_tenant(tenant_id, |data| {
                data.rows.get(&(group_id, date)).cloned().unwrap_or_default()
            })
            .unwrap_or_default())
    }

    fn replace_rows(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        date: NaiveDate,
        rows: &[CalendarRow],
    ) -> StoreResult<()> {
        let key = format!("group {} on {}", group_id, date);

        if self.take_injected_conflict() {
            return Err(StoreError::Conflict { key });
        }

        let mut seen = HashSet::with_capacity(rows.len());
        for row in rows {
            if row.tenant_id != tenant_id || row.group_id != group_id || row.date != date {
                return Err(StoreError::Unavailable {
                    message: format!("row for child {} does not belong to {}", row.child_id, key),
                });
            }
            if !seen.insert(row.key()) {
                return Err(StoreError::Conflict { key });
            }
        }

        let mut tenants = self.tenants.write();
        let data = tenants.entry(tenant_id).or_default();
        data.rows.remove(&(group_id, date));
        if !rows.is_empty() {
            data.rows.insert((group_id, date), rows.to_vec());
        }
        self.row_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete_rows(
        &self,
        tenant_id: TenantId,
        group_id: Option<GroupId>,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> StoreResult<usize> {
        let mut tenants = self.tenants.write();
        let Some(data) = tenants.get_mut(&tenant_id) else {
            return Ok(0);
        };

        let mut removed = 0;
        data.rows.retain(|(row_group, row_date), rows| {
            let in_group = group_id.is_none_or(|group| group == *row_group);
            let in_range = *row_date >= start && end.is_none_or(|end| *row_date <= end);
            if in_group && in_range {
                removed += rows.len();
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}

impl ComplianceStore for InMemoryStore {
    fn append_staff_level(
        &self,
        tenant_id: TenantId,
        observation: StaffLevelObservation,
    ) -> StoreResult<()> {
        self.tenants
            .write()
            .entry(tenant_id)
            .or_default()
            .staff_levels
            .push(observation);
        Ok(())
    }

    fn latest_staff_level(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<StaffLevelObservation>> {
        Ok(self
            .read_tenant(tenant_id, |data| {
                data.staff_levels
                    .iter()
                    .filter(|obs| obs.group_id == group_id && obs.observed_at <= at)
                    .max_by_key(|obs| obs.observed_at)
                    .cloned()
            })
            .flatten())
    }

    fn append_snapshot(
        &self,
        tenant_id: TenantId,
        snapshot: ComplianceSnapshot,
    ) -> StoreResult<()> {
        self.tenants
            .write()
            .entry(tenant_id)
            .or_default()
            .snapshots
            .push(snapshot);
        Ok(())
    }

    fn snapshots_between(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<ComplianceSnapshot>> {
        let mut snapshots: Vec<ComplianceSnapshot> = self
            .read_tenant(tenant_id, |data| {
                data.snapshots
                    .iter()
                    .filter(|s| s.group_id == group_id && s.captured_at >= from && s.captured_at <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        snapshots.sort_by_key(|s| s.captured_at);
        Ok(snapshots)
    }
}
