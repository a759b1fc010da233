//! Attendance aggregation.
//!
//! Buckets materialized [`CalendarRow`]s by date and time slot, counts each
//! status, and splits present children into the configured age bands so the
//! ratio policy can price the slot in staff.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::ratio::{AgeBandCount, required_staff};
use crate::config::EngineConfig;
use crate::models::{AttendanceStatus, CalendarRow, TimeSlotId, completed_months};

/// Summary of one time slot on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAggregation {
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
    /// Children expected in the slot.
    pub present_count: u32,
    /// Scheduled children covered by an absence.
    pub absent_count: u32,
    /// Scheduled children on a closure day.
    pub closed_count: u32,
    /// Present children per age band, youngest band first.
    pub age_bands: Vec<AgeBandCount>,
    /// Staff needed for the present children.
    pub required_staff: u32,
}

/// Aggregates rows of any number of dates and slots.
///
/// Output is ordered by date, then slot start time, then slot id.
pub fn aggregate_rows(rows: &[CalendarRow], config: &EngineConfig) -> Vec<SlotAggregation> {
    let mut buckets: BTreeMap<(NaiveDate, NaiveTime, TimeSlotId), Vec<&CalendarRow>> =
        BTreeMap::new();
    for row in rows {
        buckets
            .entry((row.date, row.start_time, row.slot_id))
            .or_default()
            .push(row);
    }

    buckets
        .into_values()
        .filter_map(|slot_rows| aggregate_slot(&slot_rows, config))
        .collect()
}

/// Aggregates the rows of a single date and slot.
///
/// Returns `None` for an empty slice. Only Present rows contribute to the
/// age-band counts and the staff requirement; ages are taken in completed
/// months on the row date.
///
/// # Example
///
/// ```
/// use childcare_attendance::calendar::aggregate_slot;
/// use childcare_attendance::config::ConfigLoader;
/// use childcare_attendance::models::{AttendanceStatus, CalendarRow};
/// use chrono::{NaiveDate, NaiveTime, Utc};
/// use uuid::Uuid;
///
/// let config = ConfigLoader::load("./config/default").unwrap().into_config();
/// let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let rows: Vec<CalendarRow> = (0..4)
///     .map(|_| CalendarRow {
///         tenant_id: Uuid::nil(),
///         group_id: Uuid::nil(),
///         child_id: Uuid::new_v4(),
///         date,
///         slot_id: Uuid::nil(),
///         slot_name: "Morning".to_string(),
///         start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
///         end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
///         status: AttendanceStatus::Present,
///         reason: None,
///         age_years: 0,
///         birthday: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
///         cached_at: Utc::now(),
///     })
///     .collect();
/// let refs: Vec<&CalendarRow> = rows.iter().collect();
///
/// let summary = aggregate_slot(&refs, &config).unwrap();
/// assert_eq!(summary.present_count, 4);
/// assert_eq!(summary.required_staff, 2); // 4 infants at 1:3
/// ```
pub fn aggregate_slot(rows: &[&CalendarRow], config: &EngineConfig) -> Option<SlotAggregation> {
    let first = rows.first()?;

    let mut age_bands: Vec<AgeBandCount> = config
        .age_bands()
        .iter()
        .map(|band| AgeBandCount {
            band: band.name.clone(),
            children_per_staff: band.children_per_staff,
            count: 0,
        })
        .collect();

    let (mut present_count, mut absent_count, mut closed_count) = (0, 0, 0);
    for row in rows {
        match row.status {
            AttendanceStatus::Present => {
                present_count += 1;
                let age_months = completed_months(row.birthday, row.date);
                let index = config
                    .age_bands()
                    .iter()
                    .position(|band| band.contains(age_months));
                if let Some(index) = index {
                    age_bands[index].count += 1;
                }
            }
            AttendanceStatus::Absent => absent_count += 1,
            AttendanceStatus::Closed => closed_count += 1,
        }
    }

    Some(SlotAggregation {
        date: first.date,
        slot_id: first.slot_id,
        slot_name: first.slot_name.clone(),
        start_time: first.start_time,
        end_time: first.end_time,
        present_count,
        absent_count,
        closed_count,
        required_staff: required_staff(&age_bands),
        age_bands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgeBand, CalendarConfig, StaffingConfig};
    use crate::models::EndMarkSettings;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    fn make_date(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    fn time(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    fn config() -> EngineConfig {
        let band = |name: &str, min, max, ratio| AgeBand {
            name: name.to_string(),
            min_age_months: min,
            max_age_months: max,
            children_per_staff: ratio,
        };
        EngineConfig::new(
            StaffingConfig {
                age_bands: vec![
                    band("infant", 0, Some(12), 3),
                    band("toddler", 12, Some(36), 5),
                    band("preschool", 36, None, 10),
                ],
                warning_threshold: Decimal::from_str("0.8").unwrap(),
            },
            CalendarConfig::default(),
            EndMarkSettings {
                enabled: false,
                years_after_birth: 4,
                description: "School".to_string(),
            },
        )
        .unwrap()
    }

    fn row(
        date: &str,
        slot_id: TimeSlotId,
        start_hour: u32,
        status: AttendanceStatus,
        birthday: &str,
    ) -> CalendarRow {
        CalendarRow {
            tenant_id: Uuid::nil(),
            group_id: Uuid::nil(),
            child_id: Uuid::new_v4(),
            date: make_date(date),
            slot_id,
            slot_name: format!("Slot {}", start_hour),
            start_time: time(start_hour),
            end_time: time(start_hour + 4),
            status,
            reason: None,
            age_years: 0,
            birthday: make_date(birthday),
            cached_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_present_rows_are_banded() {
        let slot = Uuid::new_v4();
        let rows = vec![
            row("2024-01-01", slot, 8, AttendanceStatus::Present, "2023-06-01"),
            row("2024-01-01", slot, 8, AttendanceStatus::Present, "2022-06-01"),
            row("2024-01-01", slot, 8, AttendanceStatus::Absent, "2023-06-01"),
        ];
        let summaries = aggregate_rows(&rows, &config());
        assert_eq!(summaries.len(), 1);

        let summary = &summaries[0];
        assert_eq!(summary.present_count, 2);
        assert_eq!(summary.absent_count, 1);
        assert_eq!(summary.closed_count, 0);
        let counts: Vec<u32> = summary.age_bands.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 0]);
        assert_eq!(summary.required_staff, 2);
    }

    #[test]
    fn test_band_boundary_uses_completed_months() {
        let slot = Uuid::new_v4();
        // Turns 12 months on 2024-01-02
        let rows = vec![
            row("2024-01-01", slot, 8, AttendanceStatus::Present, "2023-01-02"),
            row("2024-01-02", slot, 8, AttendanceStatus::Present, "2023-01-02"),
        ];
        let summaries = aggregate_rows(&rows, &config());
        assert_eq!(summaries[0].age_bands[0].count, 1);
        assert_eq!(summaries[1].age_bands[1].count, 1);
    }

    #[test]
    fn test_closed_slot_needs_no_staff() {
        let slot = Uuid::new_v4();
        let rows = vec![
            row("2024-01-08", slot, 8, AttendanceStatus::Closed, "2023-06-01"),
            row("2024-01-08", slot, 8, AttendanceStatus::Closed, "2023-06-01"),
        ];
        let summary = &aggregate_rows(&rows, &config())[0];
        assert_eq!(summary.closed_count, 2);
        assert_eq!(summary.present_count, 0);
        assert_eq!(summary.required_staff, 0);
    }

    #[test]
    fn test_buckets_are_ordered_by_date_then_start_time() {
        let morning = Uuid::new_v4();
        let afternoon = Uuid::new_v4();
        let rows = vec![
            row("2024-01-02", morning, 8, AttendanceStatus::Present, "2021-01-01"),
            row("2024-01-01", afternoon, 13, AttendanceStatus::Present, "2021-01-01"),
            row("2024-01-01", morning, 8, AttendanceStatus::Present, "2021-01-01"),
        ];
        let order: Vec<(NaiveDate, TimeSlotId)> = aggregate_rows(&rows, &config())
            .iter()
            .map(|s| (s.date, s.slot_id))
            .collect();
        assert_eq!(
            order,
            vec![
                (make_date("2024-01-01"), morning),
                (make_date("2024-01-01"), afternoon),
                (make_date("2024-01-02"), morning),
            ]
        );
    }

    #[test]
    fn test_empty_slot_has_no_summary() {
        assert!(aggregate_slot(&[], &config()).is_none());
        assert!(aggregate_rows(&[], &config()).is_empty());
    }
}
