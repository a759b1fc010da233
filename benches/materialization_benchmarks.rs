//! Performance benchmarks for calendar materialization.
//!
//! Covers the hot paths of the attendance engine:
//! - Materializing a group over several weeks from source records
//! - Serving the same range from the row cache
//! - Aggregating a range into staffing requirements
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Weekday};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use uuid::Uuid;

use childcare_attendance::calendar::CalendarMaterializer;
use childcare_attendance::config::ConfigLoader;
use childcare_attendance::models::{
    Absence, CacheHint, Child, ClosurePeriod, Schedule, ScheduleRule, TimeSlot,
};
use childcare_attendance::store::InMemoryStore;

const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

struct Fixture {
    materializer: CalendarMaterializer<InMemoryStore>,
    tenant: Uuid,
    group: Uuid,
    start: NaiveDate,
}

/// Creates a group of `child_count` children attending every weekday, with
/// one closure and a sprinkling of absences.
fn create_fixture(child_count: usize) -> Fixture {
    let config = ConfigLoader::load("./config/default").expect("Failed to load config");
    let store = Arc::new(InMemoryStore::new());
    let materializer = CalendarMaterializer::new(store.clone(), Arc::new(config.into_config()));

    let tenant = Uuid::new_v4();
    let group = Uuid::new_v4();
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let slots: Vec<TimeSlot> = [(8, 12, "Morning"), (13, 17, "Afternoon")]
        .into_iter()
        .map(|(from, to, name)| TimeSlot {
            id: Uuid::new_v4(),
            name: name.to_string(),
            start_time: NaiveTime::from_hms_opt(from, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(to, 0, 0).unwrap(),
        })
        .collect();
    for slot in &slots {
        store.insert_time_slot(tenant, slot.clone());
    }

    store.insert_closure(
        tenant,
        ClosurePeriod {
            id: Uuid::new_v4(),
            start_date: start + Duration::days(14),
            end_date: start + Duration::days(15),
            reason: Some("Staff training".to_string()),
        },
    );

    for i in 0..child_count {
        let child = Child {
            id: Uuid::new_v4(),
            name: format!("child_{:03}", i),
            birthday: NaiveDate::from_ymd_opt(2020 + (i % 4) as i32, 3, 15).unwrap(),
        };
        store.insert_child(tenant, child.clone());

        let slot = &slots[i % slots.len()];
        let schedule = Schedule {
            id: Uuid::new_v4(),
            child_id: child.id,
            start_date: start,
            end_date: None,
            rules: WEEKDAYS
                .iter()
                .map(|weekday| ScheduleRule {
                    weekday: *weekday,
                    time_slot_id: slot.id,
                    group_id: group,
                })
                .collect(),
        };
        materializer
            .register_schedule(tenant, schedule)
            .expect("Failed to register schedule");

        if i % 5 == 0 {
            let absent_from = start + Duration::days((i % 20) as i64);
            store.insert_absence(
                tenant,
                Absence {
                    id: Uuid::new_v4(),
                    child_id: child.id,
                    start_date: absent_from,
                    end_date: absent_from + Duration::days(2),
                    reason: None,
                },
            );
        }
    }

    Fixture {
        materializer,
        tenant,
        group,
        start,
    }
}

/// Benchmark: Recomputing a range from source records.
fn bench_materialize_bypass(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize_bypass");

    for weeks in [1i64, 4, 12] {
        let fixture = create_fixture(30);
        let end = fixture.start + Duration::days(weeks * 7 - 1);
        group.throughput(Throughput::Elements((weeks * 7) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(weeks), &end, |b, end| {
            b.iter(|| {
                let rows = fixture
                    .materializer
                    .get_rows(
                        fixture.tenant,
                        fixture.group,
                        fixture.start,
                        *end,
                        CacheHint::Bypass,
                    )
                    .unwrap();
                black_box(rows)
            })
        });
    }

    group.finish();
}

/// Benchmark: Serving a warm range from the row cache.
fn bench_materialize_cached(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize_cached");

    for weeks in [1i64, 4, 12] {
        let fixture = create_fixture(30);
        let end = fixture.start + Duration::days(weeks * 7 - 1);
        fixture
            .materializer
            .get_rows(
                fixture.tenant,
                fixture.group,
                fixture.start,
                end,
                CacheHint::PreferCache,
            )
            .unwrap();

        group.throughput(Throughput::Elements((weeks * 7) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(weeks), &end, |b, end| {
            b.iter(|| {
                let rows = fixture
                    .materializer
                    .get_rows(
                        fixture.tenant,
                        fixture.group,
                        fixture.start,
                        *end,
                        CacheHint::PreferCache,
                    )
                    .unwrap();
                black_box(rows)
            })
        });
    }

    group.finish();
}

/// Benchmark: Aggregating a month of cached rows by slot.
fn bench_aggregations(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregations");

    for child_count in [10usize, 50, 100] {
        let fixture = create_fixture(child_count);
        let end = fixture.start + Duration::days(27);
        group.throughput(Throughput::Elements(child_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(child_count),
            &end,
            |b, end| {
                b.iter(|| {
                    let summaries = fixture
                        .materializer
                        .get_aggregations(
                            fixture.tenant,
                            fixture.group,
                            fixture.start,
                            *end,
                            CacheHint::PreferCache,
                        )
                        .unwrap();
                    black_box(summaries)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_materialize_bypass,
    bench_materialize_cached,
    bench_aggregations
);
criterion_main!(benches);
