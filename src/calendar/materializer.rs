//! Calendar row materialization.
//!
//! The [`CalendarMaterializer`] orchestrates the expander and the resolver
//! across every child scheduled into a group, caches the resulting rows per
//! (tenant, group, date), and serves row and aggregation queries from that
//! cache.
//!
//! # Cache Consistency
//!
//! Loading source records, recomputing dates, and replacing their cached rows
//! all happen under one per-(tenant, group) lock, so two recomputations never
//! interleave their writes and an [`invalidate`](CalendarMaterializer::invalidate)
//! waits for any recompute that may have read the old sources. Tenant-wide
//! invalidation takes every group lock of the tenant. Cache hits take no lock.
//! If the store still reports a write conflict, the write is retried once; rows
//! another writer stored in the meantime are accepted as they are.
//!
//! Schedule registration is serialized per (tenant, child), so the overlap
//! check and the insert are atomic.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::aggregator::{SlotAggregation, aggregate_rows};
use super::end_marks::plan_system_end_marks;
use super::expander::candidates_by_date;
use super::resolver::{SlotAssignment, resolve_day};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, StoreError};
use crate::models::{
    Absence, CacheHint, CalendarRow, Child, ChildId, ClosurePeriod, EndMark, EndMarkSettings,
    GroupId, Schedule, TenantId, TimeSlot, TimeSlotId,
};
use crate::store::CalendarStore;

/// Source records of one child over a query range.
struct ChildSources {
    child: Child,
    end_marks: Vec<EndMark>,
    absences: Vec<Absence>,
    candidates: BTreeMap<NaiveDate, Vec<SlotAssignment>>,
}

/// Source records of one group over a query range, loaded once per query.
struct GroupSources {
    slots: HashMap<TimeSlotId, TimeSlot>,
    closures: Vec<ClosurePeriod>,
    children: BTreeMap<ChildId, ChildSources>,
}

/// Computes, caches, and serves calendar rows.
///
/// # Thread Safety
///
/// `CalendarMaterializer` is `Send + Sync` and is meant to be shared behind an
/// `Arc` across request handlers.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use childcare_attendance::calendar::CalendarMaterializer;
/// use childcare_attendance::config::ConfigLoader;
/// use childcare_attendance::models::{CacheHint, Child, Schedule, ScheduleRule, TimeSlot};
/// use childcare_attendance::store::InMemoryStore;
/// use chrono::{NaiveDate, NaiveTime, Weekday};
/// use uuid::Uuid;
///
/// let config = Arc::new(ConfigLoader::load("./config/default").unwrap().into_config());
/// let store = Arc::new(InMemoryStore::new());
/// let materializer = CalendarMaterializer::new(store.clone(), config);
///
/// let (tenant, group) = (Uuid::new_v4(), Uuid::new_v4());
/// let slot = TimeSlot {
///     id: Uuid::new_v4(),
///     name: "Morning".to_string(),
///     start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
///     end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
/// };
/// let child = Child {
///     id: Uuid::new_v4(),
///     name: "Leo".to_string(),
///     birthday: NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
/// };
/// store.insert_time_slot(tenant, slot.clone());
/// store.insert_child(tenant, child.clone());
/// materializer
///     .register_schedule(
///         tenant,
///         Schedule {
///             id: Uuid::new_v4(),
///             child_id: child.id,
///             start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///             end_date: None,
///             rules: vec![ScheduleRule { weekday: Weekday::Mon, time_slot_id: slot.id, group_id: group }],
///         },
///     )
///     .unwrap();
///
/// let rows = materializer
///     .get_rows(
///         tenant,
///         group,
///         NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///         NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
///         CacheHint::PreferCache,
///     )
///     .unwrap();
/// assert_eq!(rows.len(), 2);
/// ```
pub struct CalendarMaterializer<S: CalendarStore + ?Sized> {
    store: Arc<S>,
    config: Arc<EngineConfig>,
    group_locks: Mutex<HashMap<(TenantId, GroupId), Arc<Mutex<()>>>>,
    child_locks: Mutex<HashMap<(TenantId, ChildId), Arc<Mutex<()>>>>,
}

impl<S: CalendarStore + ?Sized> CalendarMaterializer<S> {
    /// Creates a materializer over `store`.
    pub fn new(store: Arc<S>, config: Arc<EngineConfig>) -> Self {
        Self {
            store,
            config,
            group_locks: Mutex::new(HashMap::new()),
            child_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the calendar rows of a group over `[start, end]`.
    ///
    /// With [`CacheHint::PreferCache`], dates with cached rows are served from
    /// the cache and every other date is computed and cached. With
    /// [`CacheHint::Bypass`], every date is recomputed and its cached rows
    /// replaced. Rows are ordered by date, slot start time, slot id, and
    /// child id.
    ///
    /// Unknown groups or children yield no rows rather than an error.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidRange`] if `end` precedes `start`
    /// - [`EngineError::RangeTooLarge`] if the range exceeds the configured maximum
    /// - [`EngineError::AmbiguousSchedule`] if overlapping schedules assign
    ///   the same child twice on one date
    /// - [`EngineError::Storage`] if the store fails
    pub fn get_rows(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        start: NaiveDate,
        end: NaiveDate,
        hint: CacheHint,
    ) -> EngineResult<Vec<CalendarRow>> {
        self.check_range(start, end)?;
        let started = Instant::now();

        let mut rows = Vec::new();
        let mut misses = Vec::new();
        for date in start.iter_days().take_while(|date| *date <= end) {
            if hint == CacheHint::PreferCache {
                let cached = self.store.cached_rows(tenant_id, group_id, date)?;
                if !cached.is_empty() {
                    debug!(%tenant_id, %group_id, %date, rows = cached.len(), "Row cache hit");
                    rows.extend(cached);
                    continue;
                }
            }
            misses.push(date);
        }

        let cache_hits = (end - start).num_days() as usize + 1 - misses.len();
        if !misses.is_empty() {
            rows.extend(self.refresh_dates(tenant_id, group_id, &misses, hint)?);
        }

        rows.sort_by(|a, b| {
            (a.date, a.start_time, a.slot_id, a.child_id).cmp(&(
                b.date,
                b.start_time,
                b.slot_id,
                b.child_id,
            ))
        });

        info!(
            %tenant_id,
            %group_id,
            %start,
            %end,
            ?hint,
            rows = rows.len(),
            cache_hits,
            duration_us = started.elapsed().as_micros() as u64,
            "Calendar rows served"
        );

        Ok(rows)
    }

    /// Returns per-date, per-slot summaries of a group over `[start, end]`.
    ///
    /// Built on [`get_rows`](Self::get_rows) with the same cache semantics and
    /// errors.
    pub fn get_aggregations(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        start: NaiveDate,
        end: NaiveDate,
        hint: CacheHint,
    ) -> EngineResult<Vec<SlotAggregation>> {
        let rows = self.get_rows(tenant_id, group_id, start, end, hint)?;
        Ok(aggregate_rows(&rows, &self.config))
    }

    /// Validates and stores a new schedule.
    ///
    /// A schedule is rejected if any of its weekdays is already covered by
    /// another schedule of the same child whose date window overlaps. On
    /// success the cached rows of every group the schedule targets are
    /// invalidated from its start date onwards.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidSchedule`] if the schedule is malformed
    /// - [`EngineError::AmbiguousSchedule`] if it overlaps an existing schedule;
    ///   `date` is the first date both schedules cover
    pub fn register_schedule(&self, tenant_id: TenantId, schedule: Schedule) -> EngineResult<()> {
        schedule.validate()?;

        let lock = lock_for(&self.child_locks, (tenant_id, schedule.child_id));
        let _guard = lock.lock();

        let existing = self.store.schedules_for_child(tenant_id, schedule.child_id)?;
        for other in existing.iter().filter(|other| other.window_overlaps(&schedule)) {
            let shared = schedule
                .rules
                .iter()
                .find(|rule| other.rules_for(rule.weekday).next().is_some());
            if let Some(rule) = shared {
                warn!(
                    %tenant_id,
                    child_id = %schedule.child_id,
                    schedule_id = %schedule.id,
                    conflicting_schedule_id = %other.id,
                    weekday = %rule.weekday,
                    "Rejected overlapping schedule"
                );
                return Err(EngineError::AmbiguousSchedule {
                    child_id: schedule.child_id,
                    weekday: rule.weekday,
                    date: schedule.start_date.max(other.start_date),
                });
            }
        }

        let groups: BTreeSet<GroupId> = schedule.rules.iter().map(|rule| rule.group_id).collect();
        let (schedule_id, start_date) = (schedule.id, schedule.start_date);
        self.store.insert_schedule(tenant_id, schedule)?;

        for group_id in &groups {
            self.invalidate(tenant_id, Some(*group_id), start_date, None)?;
        }

        info!(
            %tenant_id,
            %schedule_id,
            groups = groups.len(),
            "Registered schedule"
        );
        Ok(())
    }

    /// Deletes cached rows from `start` through `end` (open-ended if `None`)
    /// for one group, or for all of the tenant's groups.
    ///
    /// Returns the number of rows removed. Call after changing any source
    /// record that feeds the cached dates.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRange`] if `end` precedes `start`.
    pub fn invalidate(
        &self,
        tenant_id: TenantId,
        group_id: Option<GroupId>,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> EngineResult<usize> {
        if let Some(end) = end.filter(|end| *end < start) {
            warn!(%tenant_id, %start, %end, "Rejected invalidation range");
            return Err(EngineError::InvalidRange { start, end });
        }

        let removed = match group_id {
            Some(group_id) => {
                let lock = self.group_lock(tenant_id, group_id);
                let _guard = lock.lock();
                self.store.delete_rows(tenant_id, Some(group_id), start, end)?
            }
            None => {
                let locks = self.tenant_group_locks(tenant_id);
                let _guards: Vec<_> = locks.iter().map(|lock| lock.lock()).collect();
                self.store.delete_rows(tenant_id, None, start, end)?
            }
        };

        debug!(%tenant_id, ?group_id, %start, ?end, removed, "Invalidated cached rows");
        Ok(removed)
    }

    /// Creates system end marks for every child of the tenant that has none.
    ///
    /// Returns the marks created. Cached rows of all groups are invalidated
    /// from the earliest new end date onwards.
    pub fn apply_end_mark_settings(
        &self,
        tenant_id: TenantId,
        settings: &EndMarkSettings,
    ) -> EngineResult<Vec<EndMark>> {
        let children = self.store.all_children(tenant_id)?;
        let existing = self.store.end_marks(tenant_id)?;
        let planned = plan_system_end_marks(settings, &children, &existing);

        for mark in &planned {
            self.store.insert_end_mark(tenant_id, mark.clone())?;
        }
        if let Some(earliest) = planned.iter().map(|mark| mark.end_date).min() {
            self.invalidate(tenant_id, None, earliest, None)?;
        }

        info!(%tenant_id, created = planned.len(), "Applied end mark settings");
        Ok(planned)
    }

    fn check_range(&self, start: NaiveDate, end: NaiveDate) -> EngineResult<()> {
        if end < start {
            warn!(%start, %end, "Rejected inverted date range");
            return Err(EngineError::InvalidRange { start, end });
        }

        let days = (end - start).num_days() + 1;
        let max_days = self.config.max_range_days();
        if days > i64::from(max_days) {
            warn!(%start, %end, days, max_days, "Rejected oversized date range");
            return Err(EngineError::RangeTooLarge { days, max_days });
        }

        Ok(())
    }

    fn group_lock(&self, tenant_id: TenantId, group_id: GroupId) -> Arc<Mutex<()>> {
        lock_for(&self.group_locks, (tenant_id, group_id))
    }

    /// Every group lock of the tenant, ordered by group id.
    fn tenant_group_locks(&self, tenant_id: TenantId) -> Vec<Arc<Mutex<()>>> {
        let mut locks: Vec<(GroupId, Arc<Mutex<()>>)> = self
            .group_locks
            .lock()
            .iter()
            .filter(|((tenant, _), _)| *tenant == tenant_id)
            .map(|((_, group_id), lock)| (*group_id, lock.clone()))
            .collect();
        locks.sort_by_key(|(group_id, _)| *group_id);
        locks.into_iter().map(|(_, lock)| lock).collect()
    }

    fn load_sources(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<GroupSources> {
        let child_ids: Vec<ChildId> = self
            .store
            .schedules_for_group(tenant_id, group_id)?
            .iter()
            .map(|schedule| schedule.child_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let slots = self
            .store
            .time_slots(tenant_id)?
            .into_iter()
            .map(|slot| (slot.id, slot))
            .collect();
        let closures = self.store.closures_between(tenant_id, start, end)?;
        let end_marks = self.store.end_marks(tenant_id)?;

        let mut children = BTreeMap::new();
        for child in self.store.children(tenant_id, &child_ids)? {
            // All of the child's schedules, so overlaps across groups surface
            let schedules = self.store.schedules_for_child(tenant_id, child.id)?;
            let candidates = candidates_by_date(&schedules, start, end)?;
            let absences = self
                .store
                .absences_for_child(tenant_id, child.id, start, end)?;
            let child_marks = end_marks
                .iter()
                .filter(|mark| mark.child_id == child.id)
                .cloned()
                .collect();

            children.insert(
                child.id,
                ChildSources {
                    child,
                    end_marks: child_marks,
                    absences,
                    candidates,
                },
            );
        }

        Ok(GroupSources {
            slots,
            closures,
            children,
        })
    }

    /// Recomputes `dates` under the group lock and stores their rows.
    ///
    /// Under [`CacheHint::PreferCache`] a date cached by another caller while
    /// this one waited for the lock is served from the cache instead.
    fn refresh_dates(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        dates: &[NaiveDate],
        hint: CacheHint,
    ) -> EngineResult<Vec<CalendarRow>> {
        let lock = self.group_lock(tenant_id, group_id);
        let _guard = lock.lock();

        let mut rows = Vec::new();
        let mut pending = Vec::with_capacity(dates.len());
        for &date in dates {
            if hint == CacheHint::PreferCache {
                let cached = self.store.cached_rows(tenant_id, group_id, date)?;
                if !cached.is_empty() {
                    rows.extend(cached);
                    continue;
                }
            }
            pending.push(date);
        }

        let (Some(&first), Some(&last)) = (pending.first(), pending.last()) else {
            return Ok(rows);
        };
        let sources = self.load_sources(tenant_id, group_id, first, last)?;
        for date in pending {
            let fresh = materialize_date(tenant_id, group_id, date, &sources)?;
            debug!(%tenant_id, %group_id, %date, rows = fresh.len(), "Recomputed rows");
            rows.extend(self.write_rows(tenant_id, group_id, date, fresh)?);
        }

        Ok(rows)
    }

    fn write_rows(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        date: NaiveDate,
        rows: Vec<CalendarRow>,
    ) -> EngineResult<Vec<CalendarRow>> {
        match self.store.replace_rows(tenant_id, group_id, date, &rows) {
            Ok(()) => Ok(rows),
            Err(StoreError::Conflict { key }) => {
                warn!(%tenant_id, %group_id, %date, %key, "Row cache write conflict, retrying once");
                let existing = self.store.cached_rows(tenant_id, group_id, date)?;
                if !existing.is_empty() {
                    return Ok(existing);
                }
                self.store.replace_rows(tenant_id, group_id, date, &rows)?;
                Ok(rows)
            }
            Err(error) => Err(error.into()),
        }
    }
}

fn lock_for<K: Eq + Hash>(locks: &Mutex<HashMap<K, Arc<Mutex<()>>>>, key: K) -> Arc<Mutex<()>> {
    locks.lock().entry(key).or_default().clone()
}

fn materialize_date(
    tenant_id: TenantId,
    group_id: GroupId,
    date: NaiveDate,
    sources: &GroupSources,
) -> EngineResult<Vec<CalendarRow>> {
    let cached_at = Utc::now();
    let mut rows = Vec::new();

    for child_sources in sources.children.values() {
        let child = &child_sources.child;
        let candidates = child_sources
            .candidates
            .get(&date)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let resolution = resolve_day(
            child.id,
            date,
            candidates,
            &sources.closures,
            &child_sources.end_marks,
            &child_sources.absences,
        )?;

        let (Some(assignment), Some(status)) = (resolution.assignment(), resolution.status())
        else {
            continue;
        };
        if assignment.group_id != group_id {
            continue;
        }
        let Some(slot) = sources.slots.get(&assignment.time_slot_id) else {
            warn!(
                %tenant_id,
                child_id = %child.id,
                time_slot_id = %assignment.time_slot_id,
                "Schedule references unknown time slot"
            );
            continue;
        };

        rows.push(CalendarRow {
            tenant_id,
            group_id,
            child_id: child.id,
            date,
            slot_id: slot.id,
            slot_name: slot.name.clone(),
            start_time: slot.start_time,
            end_time: slot.end_time,
            status,
            reason: resolution.reason().map(str::to_string),
            age_years: child.age_in_years(date),
            birthday: child.birthday,
            cached_at,
        });
    }

    Ok(rows)
}
