pub mod alerts;
pub mod pagination;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use riskwatch_engine::EngineError;
use riskwatch_storage::{AlertFilter, PageRequest};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Error envelope.
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// Business error code
    pub err_code: i32,
    pub err_msg: String,
    pub trace_id: String,
}

/// Response envelope shared by every endpoint.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 0 on success
    pub err_code: i32,
    pub err_msg: String,
    pub trace_id: String,
    pub data: Option<T>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedData<T>
where
    T: Serialize,
{
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Serialize, ToSchema)]
pub struct IdResponse {
    pub id: String,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_paginated_response<T>(
    status: StatusCode,
    trace_id: &str,
    items: Vec<T>,
    total: u64,
    limit: u64,
    offset: u64,
) -> Response
where
    T: Serialize,
{
    success_response(
        status,
        trace_id,
        PaginatedData {
            items,
            total,
            limit,
            offset,
        },
    )
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "unauthorized" => 1002,
        "token_expired" => 1003,
        "not_found" => 1004,
        "conflict" => 1005,
        "internal_error" => 1500,
        "storage_error" => 1501,
        "dispatch_failed" => 1502,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    error_response_with_data::<Value>(status, trace_id, code, msg, None)
}

pub fn error_response_with_data<T>(
    status: StatusCode,
    trace_id: &str,
    code: &str,
    msg: &str,
    data: Option<T>,
) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data,
        }),
    )
        .into_response()
}

/// Maps engine failures onto HTTP status and envelope code.
pub fn engine_error_response(trace_id: &str, err: &EngineError) -> Response {
    match err {
        EngineError::NotFound { .. } => {
            error_response(StatusCode::NOT_FOUND, trace_id, "not_found", &err.to_string())
        }
        EngineError::Validation(msg) => {
            error_response(StatusCode::BAD_REQUEST, trace_id, "bad_request", msg)
        }
        EngineError::Conflict { .. } => {
            error_response(StatusCode::CONFLICT, trace_id, "conflict", &err.to_string())
        }
        EngineError::Dispatch { alert_id, .. } => error_response_with_data(
            StatusCode::BAD_GATEWAY,
            trace_id,
            "dispatch_failed",
            &err.to_string(),
            Some(IdResponse {
                id: alert_id.clone(),
            }),
        ),
        EngineError::Storage(e) => {
            tracing::error!(trace_id, error = %e, "Storage failure");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    version: String,
    uptime_secs: i64,
    /// `ok` or `error`
    storage_status: String,
}

/// Service liveness. No authentication.
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    let storage_status = match state
        .engine
        .list_alerts(&AlertFilter::All, PageRequest::new(1, 0))
        .await
    {
        Ok(_) => "ok",
        Err(e) => {
            tracing::error!(error = %e, "Health check storage probe failed");
            "error"
        }
    };
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            storage_status: storage_status.to_string(),
        },
    )
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(health))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().merge(alerts::risk_alert_routes())
}
