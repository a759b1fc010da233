//! Calendar row materialization.
//!
//! This module contains the pure interval resolution, schedule expansion,
//! aggregation, and ratio functions, plus the [`CalendarMaterializer`] that
//! ties them to a [`CalendarStore`](crate::store::CalendarStore) and its row
//! cache.

mod aggregator;
mod end_marks;
mod expander;
mod materializer;
mod ratio;
mod resolver;

pub use aggregator::{SlotAggregation, aggregate_rows, aggregate_slot};
pub use end_marks::plan_system_end_marks;
pub use expander::{WeekdayRuleMap, candidates_by_date, expand_schedule};
pub use materializer::CalendarMaterializer;
pub use ratio::{AgeBandCount, required_staff};
pub use resolver::{DayResolution, SlotAssignment, resolve_day};
