//! HTTP API module for the attendance engine.
//!
//! This module provides the REST endpoints for calendar rows, attendance
//! aggregations, compliance snapshots, and staff level recording.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::{TENANT_HEADER, create_router};
pub use request::{HistoryQuery, RangeQuery, SnapshotQuery, StaffLevelRequest};
pub use response::{ApiError, ApiErrorResponse, RowResponse, StaffLevelResponse};
pub use state::AppState;
