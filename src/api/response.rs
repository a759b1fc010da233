//! Response types for the attendance API.
//!
//! This module defines the response bodies, the error response structure,
//! and the mapping from engine errors to HTTP status codes.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{AttendanceStatus, CalendarRow, ChildId, GroupId, TimeSlotId};

/// One calendar row as returned by `GET /groups/:group_id/rows`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowResponse {
    /// The group.
    pub group_id: GroupId,
    /// The child.
    pub child_id: ChildId,
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
    /// The resolved status.
    pub status: AttendanceStatus,
    /// Reason from the absence or closure, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
}

impl From<CalendarRow> for RowResponse {
    fn from(row: CalendarRow) -> Self {
        Self {
            group_id: row.group_id,
            child_id: row.child_id,
            date: row.date,
            slot_id: row.slot_id,
            slot_name: row.slot_name,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status,
            reason: row.reason,
        }
    }
}

/// Response body for `POST /groups/:group_id/staff-levels`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffLevelResponse {
    /// The id of the recorded observation.
    pub id: Uuid,
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a missing tenant error response.
    pub fn missing_tenant() -> Self {
        Self::with_details(
            "MISSING_TENANT",
            "Tenant context is missing",
            "Send the tenant id as a UUID in the X-Tenant-Id header",
        )
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        match error {
            EngineError::InvalidRange { .. } | EngineError::InvalidTimeRange { .. } => {
                Self::bad_request(ApiError::new("INVALID_RANGE", message))
            }
            EngineError::RangeTooLarge { max_days, .. } => Self::bad_request(ApiError::with_details(
                "RANGE_TOO_LARGE",
                message,
                format!("Split the request into ranges of at most {} days", max_days),
            )),
            EngineError::MissingTenant => Self::bad_request(ApiError::missing_tenant()),
            EngineError::InvalidSchedule { .. } => {
                Self::bad_request(ApiError::new("INVALID_SCHEDULE", message))
            }
            EngineError::AmbiguousSchedule { .. } => ApiErrorResponse {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: ApiError::with_details(
                    "AMBIGUOUS_SCHEDULE",
                    message,
                    "Overlapping schedules must be corrected before attendance can be computed",
                ),
            },
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::InvalidConfig { .. } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
            },
            EngineError::Storage { .. } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details("STORAGE_ERROR", "Storage error", message),
            },
        }
    }
}

impl From<QueryRejection> for ApiErrorResponse {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(ApiError::validation_error(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiErrorResponse {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(ApiError::validation_error(rejection.body_text()))
    }
}

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        let error = match rejection {
            JsonRejection::JsonDataError(err) => {
                let body_text = err.body_text();
                if body_text.contains("missing field") {
                    ApiError::validation_error(body_text)
                } else {
                    ApiError::malformed_json(body_text)
                }
            }
            JsonRejection::JsonSyntaxError(err) => {
                ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
            }
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
            }
            _ => ApiError::malformed_json("Failed to parse request body"),
        };
        Self::bad_request(error)
    }
}
