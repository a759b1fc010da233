//! HTTP request handlers for the attendance API.
//!
//! Every endpoint requires the tenant id in the `X-Tenant-Id` header; it is
//! passed explicitly into the core operations.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calendar::SlotAggregation;
use crate::error::{EngineError, EngineResult};
use crate::models::{CacheHint, ComplianceSnapshot, GroupId, TenantId};

use super::request::{HistoryQuery, RangeQuery, SnapshotQuery, StaffLevelRequest};
use super::response::{ApiErrorResponse, RowResponse, StaffLevelResponse};
use super::state::AppState;

/// Header carrying the tenant id.
pub const TENANT_HEADER: &str = "x-tenant-id";

type HandlerResult<T> = Result<T, ApiErrorResponse>;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/groups/:group_id/rows", get(rows_handler))
        .route("/groups/:group_id/aggregations", get(aggregations_handler))
        .route("/groups/:group_id/compliance", get(compliance_handler))
        .route("/groups/:group_id/compliance/history", get(history_handler))
        .route("/groups/:group_id/staff-levels", post(staff_level_handler))
        .with_state(state)
}

/// Reads the tenant id from the request headers.
fn tenant_from_headers(headers: &HeaderMap) -> EngineResult<TenantId> {
    headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(EngineError::MissingTenant)
}

/// Logs the outcome of a request and wraps a successful body in JSON.
fn complete<T>(
    correlation_id: Uuid,
    operation: &'static str,
    started: Instant,
    result: HandlerResult<T>,
) -> HandlerResult<Json<T>> {
    let duration_us = started.elapsed().as_micros() as u64;
    match &result {
        Ok(_) => info!(
            correlation_id = %correlation_id,
            operation,
            duration_us,
            "Request completed"
        ),
        Err(error) => warn!(
            correlation_id = %correlation_id,
            operation,
            status = %error.status,
            code = %error.error.code,
            error = %error.error.message,
            duration_us,
            "Request failed"
        ),
    }
    result.map(Json)
}

/// Handler for GET /groups/:group_id/rows.
async fn rows_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<GroupId>, PathRejection>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> HandlerResult<Json<Vec<RowResponse>>> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing rows request");
    let started = Instant::now();

    let result = (|| -> HandlerResult<Vec<RowResponse>> {
        let tenant_id = tenant_from_headers(&headers)?;
        let Path(group_id) = path?;
        let Query(query) = query?;
        let rows = state.materializer().get_rows(
            tenant_id,
            group_id,
            query.start,
            query.end,
            CacheHint::from_force_flag(query.force),
        )?;
        Ok(rows.into_iter().map(RowResponse::from).collect())
    })();

    complete(correlation_id, "get_rows", started, result)
}

/// Handler for GET /groups/:group_id/aggregations.
async fn aggregations_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<GroupId>, PathRejection>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> HandlerResult<Json<Vec<SlotAggregation>>> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing aggregations request");
    let started = Instant::now();

    let result = (|| -> HandlerResult<Vec<SlotAggregation>> {
        let tenant_id = tenant_from_headers(&headers)?;
        let Path(group_id) = path?;
        let Query(query) = query?;
        Ok(state.materializer().get_aggregations(
            tenant_id,
            group_id,
            query.start,
            query.end,
            CacheHint::from_force_flag(query.force),
        )?)
    })();

    complete(correlation_id, "get_aggregations", started, result)
}

/// Handler for GET /groups/:group_id/compliance.
async fn compliance_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<GroupId>, PathRejection>,
    query: Result<Query<SnapshotQuery>, QueryRejection>,
) -> HandlerResult<Json<ComplianceSnapshot>> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing compliance snapshot request");
    let started = Instant::now();

    let result = (|| -> HandlerResult<ComplianceSnapshot> {
        let tenant_id = tenant_from_headers(&headers)?;
        let Path(group_id) = path?;
        let Query(query) = query?;
        Ok(state.compliance().get_snapshot(
            tenant_id,
            group_id,
            query.at,
            CacheHint::from_force_flag(query.refresh),
        )?)
    })();

    complete(correlation_id, "get_compliance_snapshot", started, result)
}

/// Handler for GET /groups/:group_id/compliance/history.
async fn history_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<GroupId>, PathRejection>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> HandlerResult<Json<Vec<ComplianceSnapshot>>> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing compliance history request");
    let started = Instant::now();

    let result = (|| -> HandlerResult<Vec<ComplianceSnapshot>> {
        let tenant_id = tenant_from_headers(&headers)?;
        let Path(group_id) = path?;
        let Query(query) = query?;
        Ok(state
            .compliance()
            .list_snapshots(tenant_id, group_id, query.from, query.to)?)
    })();

    complete(correlation_id, "list_compliance_snapshots", started, result)
}

/// Handler for POST /groups/:group_id/staff-levels.
async fn staff_level_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<GroupId>, PathRejection>,
    payload: Result<Json<StaffLevelRequest>, JsonRejection>,
) -> HandlerResult<(StatusCode, Json<StaffLevelResponse>)> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing staff level request");
    let started = Instant::now();

    let result = (|| -> HandlerResult<StaffLevelResponse> {
        let tenant_id = tenant_from_headers(&headers)?;
        let Path(group_id) = path?;
        let Json(request) = payload?;
        let id = state
            .compliance()
            .record_staff_level(tenant_id, group_id, request.count, request.at)?;
        Ok(StaffLevelResponse { id })
    })();

    complete(correlation_id, "record_staff_level", started, result)
        .map(|body| (StatusCode::CREATED, body))
}
