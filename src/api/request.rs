//! Request types for the attendance API.
//!
//! Query strings and JSON bodies accepted by the group endpoints. Boolean
//! `force`/`refresh` flags are translated into a
//! [`CacheHint`](crate::models::CacheHint) by the handlers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

fn default_refresh() -> bool {
    true
}

/// Query for the rows and aggregations endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeQuery {
    /// First date (inclusive).
    pub start: NaiveDate,
    /// Last date (inclusive).
    pub end: NaiveDate,
    /// Recompute instead of serving cached rows.
    #[serde(default)]
    pub force: bool,
}

/// Query for the compliance snapshot endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotQuery {
    /// The instant to assess; defaults to now.
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
    /// Recompute the underlying rows; defaults to true.
    #[serde(default = "default_refresh")]
    pub refresh: bool,
}

/// Query for the compliance history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Earliest capture instant (inclusive).
    pub from: DateTime<Utc>,
    /// Latest capture instant (inclusive).
    pub to: DateTime<Utc>,
}

/// Request body for recording a staff level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffLevelRequest {
    /// The number of qualified staff on the floor.
    pub count: u32,
    /// When the count was observed.
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_query_defaults_to_refresh() {
        let query: SnapshotQuery = serde_json::from_str("{}").unwrap();
        assert!(query.refresh);
        assert!(query.at.is_none());
    }

    #[test]
    fn test_range_query_defaults_to_cache() {
        let query: RangeQuery =
            serde_json::from_str(r#"{"start": "2024-01-01", "end": "2024-01-31"}"#).unwrap();
        assert!(!query.force);
    }

    #[test]
    fn test_staff_level_request_parses_utc_instant() {
        let request: StaffLevelRequest =
            serde_json::from_str(r#"{"count": 3, "at": "2024-01-01T08:00:00Z"}"#).unwrap();
        assert_eq!(request.count, 3);
        assert_eq!(request.at.to_rfc3339(), "2024-01-01T08:00:00+00:00");
    }
}
