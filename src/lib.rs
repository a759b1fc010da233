//! Childcare attendance engine.
//!
//! This crate materializes per-child, per-day, per-slot attendance rows for
//! childcare groups from recurring schedules, absences, facility closures,
//! and enrollment end marks, caches them, and derives append-only staffing
//! ratio compliance snapshots from them.

#![warn(missing_docs)]

pub mod api;
pub mod calendar;
pub mod compliance;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
