//! Error types for the attendance engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the calendar and compliance components can report.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use thiserror::Error;
use uuid::Uuid;

/// The main error type for the attendance engine.
///
/// All core operations return this error type. Validation variants are
/// raised before any computation happens and are never retried.
///
/// # Example
///
/// ```
/// use childcare_attendance::error::EngineError;
/// use chrono::NaiveDate;
///
/// let error = EngineError::InvalidRange {
///     start: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
///     end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Invalid date range: end 2024-01-01 is before start 2024-01-15"
/// );
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested end date precedes the start date.
    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidRange {
        /// The requested start date.
        start: NaiveDate,
        /// The requested end date.
        end: NaiveDate,
    },

    /// The requested end instant precedes the start instant.
    #[error("Invalid time range: {to} is before {from}")]
    InvalidTimeRange {
        /// The requested start instant.
        from: DateTime<Utc>,
        /// The requested end instant.
        to: DateTime<Utc>,
    },

    /// The requested range spans more days than a single query may cover.
    #[error("Date range of {days} days exceeds the maximum of {max_days} days")]
    RangeTooLarge {
        /// The number of days requested (inclusive).
        days: i64,
        /// The configured upper bound.
        max_days: u32,
    },

    /// No tenant identity accompanied the request.
    #[error("Tenant context is missing")]
    MissingTenant,

    /// More than one schedule rule applies to the same child on the same day.
    #[error("Ambiguous schedule for child {child_id}: several rules match {weekday} on {date}")]
    AmbiguousSchedule {
        /// The child whose schedules overlap.
        child_id: Uuid,
        /// The weekday shared by the overlapping rules.
        weekday: Weekday,
        /// The first date on which the overlap takes effect.
        date: NaiveDate,
    },

    /// A schedule was malformed.
    #[error("Invalid schedule '{schedule_id}': {message}")]
    InvalidSchedule {
        /// The ID of the invalid schedule.
        schedule_id: Uuid,
        /// A description of what made the schedule invalid.
        message: String,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Configuration parsed but holds inconsistent values.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// A description of the inconsistency.
        message: String,
    },

    /// The persistence layer failed.
    #[error("Storage error: {message}")]
    Storage {
        /// A description of the storage failure.
        message: String,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by persistence implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A concurrent writer already holds rows for the same cache key.
    #[error("Write conflict on {key}")]
    Conflict {
        /// A description of the conflicting key.
        key: String,
    },

    /// The backing store could not serve the request.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// A description of the failure.
        message: String,
    },
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        EngineError::Storage {
            message: error.to_string(),
        }
    }
}
