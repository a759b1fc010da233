//! Compliance snapshot capture and history.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::assessment::assess_staffing;
use crate::calendar::{CalendarMaterializer, SlotAggregation};
use crate::error::{EngineError, EngineResult};
use crate::models::{CacheHint, ComplianceSnapshot, GroupId, StaffLevelObservation, TenantId};
use crate::store::EngineStore;

/// Captures immutable staffing compliance snapshots and serves their history.
///
/// Each snapshot is derived on its own from the group's attendance at the
/// capture instant and the latest recorded staff level; there is no state
/// carried between snapshots.
pub struct ComplianceService<S: EngineStore + ?Sized> {
    store: Arc<S>,
    materializer: Arc<CalendarMaterializer<S>>,
}

impl<S: EngineStore + ?Sized> ComplianceService<S> {
    /// Creates a service sharing `store` with `materializer`.
    pub fn new(store: Arc<S>, materializer: Arc<CalendarMaterializer<S>>) -> Self {
        Self {
            store,
            materializer,
        }
    }

    /// Assesses the group at `at` and appends the result as a new snapshot.
    ///
    /// `at` is resolved to a facility-local date and time. The assessed slot
    /// is the one running at that time; outside every slot, the slot needing
    /// the most staff that day is assessed instead. Qualified staff is the
    /// latest staff level recorded at or before `at`, or zero if none.
    ///
    /// # Errors
    ///
    /// Propagates materialization and storage errors.
    pub fn capture_snapshot(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        at: DateTime<Utc>,
        hint: CacheHint,
    ) -> EngineResult<ComplianceSnapshot> {
        let started = Instant::now();
        let config = self.materializer.config();
        let local = at.with_timezone(&config.utc_offset());
        let (date, time) = (local.date_naive(), local.time());

        let slots = self
            .materializer
            .get_aggregations(tenant_id, group_id, date, date, hint)?;
        let assessed = select_slot(&slots, time);
        let observation = self.store.latest_staff_level(tenant_id, group_id, at)?;

        let present = assessed.map_or(0, |slot| slot.present_count);
        let required = assessed.map_or(0, |slot| slot.required_staff);
        let qualified = observation.as_ref().map_or(0, |obs| obs.staff_count);
        let assessment = assess_staffing(required, qualified, config.warning_threshold());

        let snapshot = ComplianceSnapshot {
            id: Uuid::new_v4(),
            tenant_id,
            group_id,
            captured_at: at,
            recorded_at: Utc::now(),
            present_children_count: present,
            required_staff_count: required,
            qualified_staff_count: qualified,
            buffer_percent: assessment.buffer_percent,
            status: assessment.status,
            notes: describe(assessed, time, &date.to_string(), observation.as_ref()),
        };

        self.store.append_snapshot(tenant_id, snapshot.clone())?;

        info!(
            %tenant_id,
            %group_id,
            snapshot_id = %snapshot.id,
            %at,
            present,
            required,
            qualified,
            status = %snapshot.status,
            duration_us = started.elapsed().as_micros() as u64,
            "Captured compliance snapshot"
        );

        Ok(snapshot)
    }

    /// Captures a snapshot at `at`, or now when `at` is `None`.
    pub fn get_snapshot(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        at: Option<DateTime<Utc>>,
        hint: CacheHint,
    ) -> EngineResult<ComplianceSnapshot> {
        self.capture_snapshot(tenant_id, group_id, at.unwrap_or_else(Utc::now), hint)
    }

    /// Returns the group's snapshots captured within `[from, to]`, oldest first.
    ///
    /// Nothing is recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTimeRange`] if `to` precedes `from`.
    pub fn list_snapshots(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<ComplianceSnapshot>> {
        if to < from {
            warn!(%tenant_id, %group_id, %from, %to, "Rejected inverted snapshot range");
            return Err(EngineError::InvalidTimeRange { from, to });
        }
        Ok(self
            .store
            .snapshots_between(tenant_id, group_id, from, to)?)
    }

    /// Appends a staff level observation and returns its id.
    ///
    /// Does not capture a snapshot.
    pub fn record_staff_level(
        &self,
        tenant_id: TenantId,
        group_id: GroupId,
        staff_count: u32,
        at: DateTime<Utc>,
    ) -> EngineResult<Uuid> {
        let observation = StaffLevelObservation {
            id: Uuid::new_v4(),
            group_id,
            staff_count,
            observed_at: at,
        };
        let id = observation.id;
        self.store.append_staff_level(tenant_id, observation)?;

        info!(%tenant_id, %group_id, staff_count, %at, "Recorded staff level");
        Ok(id)
    }
}

fn select_slot(slots: &[SlotAggregation], time: NaiveTime) -> Option<&SlotAggregation> {
    let running = slots
        .iter()
        .filter(|slot| time >= slot.start_time && time < slot.end_time)
        .max_by_key(|slot| slot.required_staff);

    running.or_else(|| {
        slots
            .iter()
            .max_by_key(|slot| (slot.required_staff, slot.present_count))
    })
}

fn describe(
    assessed: Option<&SlotAggregation>,
    time: NaiveTime,
    date: &str,
    observation: Option<&StaffLevelObservation>,
) -> String {
    let mut notes = Vec::new();

    match assessed {
        Some(slot) if time >= slot.start_time && time < slot.end_time => notes.push(format!(
            "Assessed slot {} ({}-{}) running at {}",
            slot.slot_name,
            slot.start_time.format("%H:%M"),
            slot.end_time.format("%H:%M"),
            time.format("%H:%M")
        )),
        Some(slot) => notes.push(format!(
            "No slot running at {}; assessed peak slot {} ({}-{})",
            time.format("%H:%M"),
            slot.slot_name,
            slot.start_time.format("%H:%M"),
            slot.end_time.format("%H:%M")
        )),
        None => notes.push(format!("No scheduled slots on {}", date)),
    }

    if observation.is_none() {
        notes.push("no staff level recorded".to_string());
    }

    notes.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgeBand, CalendarConfig, ConfigLoader, EngineConfig, StaffingConfig};
    use crate::models::{Child, ComplianceStatus, EndMarkSettings, Schedule, ScheduleRule, TimeSlot};
    use crate::store::{ComplianceStore, InMemoryStore};
    use chrono::{NaiveDate, TimeZone, Weekday};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: ComplianceService<InMemoryStore>,
        tenant: TenantId,
        group: GroupId,
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    /// Four infants attend the 08:00-12:00 slot on Mondays from 2024-01-01.
    fn fixture_with(config: EngineConfig) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let materializer = Arc::new(CalendarMaterializer::new(store.clone(), Arc::new(config)));
        let service = ComplianceService::new(store.clone(), materializer.clone());
        let (tenant, group) = (Uuid::new_v4(), Uuid::new_v4());

        let slot = TimeSlot {
            id: Uuid::new_v4(),
            name: "Morning".to_string(),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        };
        store.insert_time_slot(tenant, slot.clone());

        for index in 0..4 {
            let child = Child {
                id: Uuid::new_v4(),
                name: format!("Infant {}", index),
                birthday: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            };
            store.insert_child(tenant, child.clone());
            materializer
                .register_schedule(
                    tenant,
                    Schedule {
                        id: Uuid::new_v4(),
                        child_id: child.id,
                        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                        end_date: None,
                        rules: vec![ScheduleRule {
                            weekday: Weekday::Mon,
                            time_slot_id: slot.id,
                            group_id: group,
                        }],
                    },
                )
                .unwrap();
        }

        Fixture {
            store,
            service,
            tenant,
            group,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(ConfigLoader::load("./config/default").unwrap().into_config())
    }

    #[test]
    fn test_matching_staff_is_compliant_with_zero_buffer() {
        let f = fixture();
        f.service
            .record_staff_level(f.tenant, f.group, 2, at(1, 7, 30))
            .unwrap();

        let snapshot = f
            .service
            .capture_snapshot(f.tenant, f.group, at(1, 9, 0), CacheHint::Bypass)
            .unwrap();

        assert_eq!(snapshot.present_children_count, 4);
        assert_eq!(snapshot.required_staff_count, 2);
        assert_eq!(snapshot.qualified_staff_count, 2);
        assert_eq!(snapshot.buffer_percent, Decimal::ZERO);
        assert_eq!(snapshot.status, ComplianceStatus::Compliant);
        assert_eq!(snapshot.captured_at, at(1, 9, 0));
        assert!(snapshot.notes.contains("running at 09:00"));
    }

    #[test]
    fn test_backdated_capture_records_write_time() {
        let f = fixture();
        let before = Utc::now();

        let snapshot = f
            .service
            .capture_snapshot(f.tenant, f.group, at(1, 9, 0), CacheHint::Bypass)
            .unwrap();

        assert_eq!(snapshot.captured_at, at(1, 9, 0));
        assert!(snapshot.recorded_at >= before);
        assert!(snapshot.recorded_at <= Utc::now());

        let stored = f
            .store
            .snapshots_between(f.tenant, f.group, at(1, 0, 0), at(2, 0, 0))
            .unwrap();
        assert_eq!(stored, vec![snapshot]);
    }

    #[test]
    fn test_later_staff_levels_are_ignored() {
        let f = fixture();
        f.service
            .record_staff_level(f.tenant, f.group, 1, at(1, 7, 0))
            .unwrap();
        f.service
            .record_staff_level(f.tenant, f.group, 3, at(1, 10, 0))
            .unwrap();

        let snapshot = f
            .service
            .capture_snapshot(f.tenant, f.group, at(1, 9, 0), CacheHint::PreferCache)
            .unwrap();
        assert_eq!(snapshot.qualified_staff_count, 1);
        assert_eq!(snapshot.status, ComplianceStatus::NonCompliant);
        assert_eq!(snapshot.buffer_percent, Decimal::from(-50));
    }

    #[test]
    fn test_missing_staff_level_counts_as_zero() {
        let f = fixture();
        let snapshot = f
            .service
            .capture_snapshot(f.tenant, f.group, at(1, 9, 0), CacheHint::PreferCache)
            .unwrap();
        assert_eq!(snapshot.qualified_staff_count, 0);
        assert_eq!(snapshot.status, ComplianceStatus::NonCompliant);
        assert!(snapshot.notes.contains("no staff level recorded"));
    }

    #[test]
    fn test_outside_slot_hours_assesses_peak_slot() {
        let f = fixture();
        let snapshot = f
            .service
            .capture_snapshot(f.tenant, f.group, at(1, 15, 0), CacheHint::PreferCache)
            .unwrap();
        assert_eq!(snapshot.required_staff_count, 2);
        assert!(snapshot.notes.contains("assessed peak slot Morning"));
    }

    #[test]
    fn test_unscheduled_day_needs_no_staff() {
        let f = fixture();
        let snapshot = f
            .service
            .capture_snapshot(f.tenant, f.group, at(2, 9, 0), CacheHint::PreferCache)
            .unwrap();
        assert_eq!(snapshot.present_children_count, 0);
        assert_eq!(snapshot.required_staff_count, 0);
        assert_eq!(snapshot.buffer_percent, Decimal::ONE_HUNDRED);
        assert_eq!(snapshot.status, ComplianceStatus::Compliant);
        assert!(snapshot.notes.contains("No scheduled slots on 2024-01-02"));
    }

    #[test]
    fn test_capture_uses_facility_local_date() {
        let band = |name: &str, min, max, ratio| AgeBand {
            name: name.to_string(),
            min_age_months: min,
            max_age_months: max,
            children_per_staff: ratio,
        };
        let config = EngineConfig::new(
            StaffingConfig {
                age_bands: vec![band("infant", 0, Some(12), 3), band("older", 12, None, 8)],
                warning_threshold: Decimal::from_str("0.8").unwrap(),
            },
            CalendarConfig {
                max_range_days: 31,
                utc_offset_minutes: 600,
            },
            EndMarkSettings {
                enabled: false,
                years_after_birth: 4,
                description: "School".to_string(),
            },
        )
        .unwrap();
        let f = fixture_with(config);

        // Sunday 22:30 UTC is Monday 08:30 at UTC+10
        let snapshot = f
            .service
            .capture_snapshot(f.tenant, f.group, at(7, 22, 30), CacheHint::PreferCache)
            .unwrap();
        assert_eq!(snapshot.present_children_count, 4);
        assert_eq!(snapshot.required_staff_count, 2);
    }

    #[test]
    fn test_snapshots_are_appended_and_listed_oldest_first() {
        let f = fixture();
        for hour in [11, 9, 10] {
            f.service
                .capture_snapshot(f.tenant, f.group, at(1, hour, 0), CacheHint::PreferCache)
                .unwrap();
        }

        let history = f
            .service
            .list_snapshots(f.tenant, f.group, at(1, 0, 0), at(1, 23, 0))
            .unwrap();
        let captured: Vec<DateTime<Utc>> = history.iter().map(|s| s.captured_at).collect();
        assert_eq!(captured, vec![at(1, 9, 0), at(1, 10, 0), at(1, 11, 0)]);

        let other_tenant = f
            .service
            .list_snapshots(Uuid::new_v4(), f.group, at(1, 0, 0), at(1, 23, 0))
            .unwrap();
        assert!(other_tenant.is_empty());
    }

    #[test]
    fn test_recording_staff_level_does_not_capture() {
        let f = fixture();
        f.service
            .record_staff_level(f.tenant, f.group, 2, at(1, 8, 0))
            .unwrap();
        let history = f
            .service
            .list_snapshots(f.tenant, f.group, at(1, 0, 0), at(1, 23, 0))
            .unwrap();
        assert!(history.is_empty());
        assert!(
            f.store
                .latest_staff_level(f.tenant, f.group, at(1, 9, 0))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_inverted_history_range_is_rejected() {
        let f = fixture();
        let result = f
            .service
            .list_snapshots(f.tenant, f.group, at(2, 0, 0), at(1, 0, 0));
        assert!(matches!(result, Err(EngineError::InvalidTimeRange { .. })));
    }
}
