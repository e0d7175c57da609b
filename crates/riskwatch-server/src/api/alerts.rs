use crate::api::pagination::{deserialize_optional_u64, page_request};
use crate::api::{
    engine_error_response, error_response, success_paginated_response, success_response,
    IdResponse,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use riskwatch_common::types::{AlertStatus, Identity, RiskAlert, Severity, SourceType};
use riskwatch_engine::NewAlert;
use riskwatch_storage::AlertFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// A risk alert as returned by the API.
#[derive(Serialize, ToSchema)]
pub struct RiskAlertResponse {
    pub id: String,
    pub alert_type: String,
    /// LOW / MEDIUM / HIGH / CRITICAL
    pub severity: String,
    /// ACTIVE / ACKNOWLEDGED / RESOLVED / DISMISSED
    pub status: String,
    pub title: String,
    pub description: String,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub risk_score: Option<i32>,
    pub impact_assessment: Option<String>,
    pub recommended_actions: Vec<String>,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub dismissed_by: Option<String>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RiskAlert> for RiskAlertResponse {
    fn from(a: RiskAlert) -> Self {
        Self {
            id: a.id,
            alert_type: a.alert_type,
            severity: a.severity.to_string(),
            status: a.status.to_string(),
            title: a.title,
            description: a.description,
            source_type: a.source_type.map(String::from),
            source_id: a.source_id,
            risk_score: a.risk_score,
            impact_assessment: a.impact_assessment,
            recommended_actions: a.recommended_actions,
            acknowledged_by: a.acknowledged_by.map(|u| u.0),
            acknowledged_at: a.acknowledged_at,
            resolved_by: a.resolved_by.map(|u| u.0),
            resolved_at: a.resolved_at,
            resolution_notes: a.resolution_notes,
            dismissed_by: a.dismissed_by.map(|u| u.0),
            dismissed_at: a.dismissed_at,
            version: a.version,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// List filters. At most one of the `__eq` filters may be given;
/// `source_id__eq` narrows `source_type__eq`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct ListRiskAlertsParams {
    /// ACTIVE / ACKNOWLEDGED / RESOLVED / DISMISSED
    #[param(required = false, rename = "status__eq")]
    #[serde(rename = "status__eq")]
    status_eq: Option<String>,
    /// LOW / MEDIUM / HIGH / CRITICAL
    #[param(required = false, rename = "severity__eq")]
    #[serde(rename = "severity__eq")]
    severity_eq: Option<String>,
    #[param(required = false, rename = "alert_type__eq")]
    #[serde(rename = "alert_type__eq")]
    alert_type_eq: Option<String>,
    /// SUPPLIER / SHIPMENT / any other source kind
    #[param(required = false, rename = "source_type__eq")]
    #[serde(rename = "source_type__eq")]
    source_type_eq: Option<String>,
    #[param(required = false, rename = "source_id__eq")]
    #[serde(rename = "source_id__eq")]
    source_id_eq: Option<String>,
    /// Page size (default 20, max 1000)
    #[param(required = false)]
    #[serde(default, deserialize_with = "deserialize_optional_u64")]
    limit: Option<u64>,
    #[param(required = false)]
    #[serde(default, deserialize_with = "deserialize_optional_u64")]
    offset: Option<u64>,
}

impl ListRiskAlertsParams {
    fn filter(&self) -> Result<AlertFilter, String> {
        let mut filters = Vec::new();
        if let Some(s) = &self.status_eq {
            filters.push(AlertFilter::Status(s.parse::<AlertStatus>()?));
        }
        if let Some(s) = &self.severity_eq {
            filters.push(AlertFilter::Severity(s.parse::<Severity>()?));
        }
        if let Some(t) = &self.alert_type_eq {
            filters.push(AlertFilter::AlertType(t.clone()));
        }
        match (&self.source_type_eq, &self.source_id_eq) {
            (Some(kind), id) => filters.push(AlertFilter::Source {
                source_type: SourceType::from(kind.as_str()),
                source_id: id.clone(),
            }),
            (None, Some(_)) => return Err("source_id__eq requires source_type__eq".into()),
            (None, None) => {}
        }

        if filters.len() > 1 {
            return Err("only one filter may be applied at a time".into());
        }
        Ok(filters.pop().unwrap_or_default())
    }
}

/// Paged risk alert listing, newest first.
#[utoipa::path(
    get,
    path = "/v1/risk-alerts",
    tag = "RiskAlerts",
    security(("bearer_auth" = [])),
    params(ListRiskAlertsParams),
    responses(
        (status = 200, description = "Paged risk alerts", body = Vec<RiskAlertResponse>),
        (status = 400, description = "Invalid filter", body = crate::api::ApiError),
        (status = 401, description = "Unauthenticated", body = crate::api::ApiError)
    )
)]
async fn list_risk_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<ListRiskAlertsParams>,
) -> Response {
    let filter = match params.filter() {
        Ok(f) => f,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg),
    };
    let page = page_request(params.limit, params.offset);

    match state.engine.list_alerts(&filter, page).await {
        Ok(page) => {
            let page = page.map(RiskAlertResponse::from);
            success_paginated_response(
                StatusCode::OK,
                &trace_id,
                page.items,
                page.total,
                page.limit,
                page.offset,
            )
        }
        Err(e) => engine_error_response(&trace_id, &e),
    }
}

#[utoipa::path(
    get,
    path = "/v1/risk-alerts/{id}",
    tag = "RiskAlerts",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Risk alert id")),
    responses(
        (status = 200, description = "Risk alert", body = RiskAlertResponse),
        (status = 404, description = "Unknown alert", body = crate::api::ApiError)
    )
)]
async fn get_risk_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.get_alert(&id).await {
        Ok(Some(alert)) => {
            success_response(StatusCode::OK, &trace_id, RiskAlertResponse::from(alert))
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Risk alert not found",
        ),
        Err(e) => engine_error_response(&trace_id, &e),
    }
}

/// ACTIVE alerts with CRITICAL severity.
#[utoipa::path(
    get,
    path = "/v1/risk-alerts/critical",
    tag = "RiskAlerts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active critical alerts", body = Vec<RiskAlertResponse>)
    )
)]
async fn critical_risk_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> Response {
    match state.engine.active_critical_alerts().await {
        Ok(alerts) => {
            let items: Vec<RiskAlertResponse> =
                alerts.into_iter().map(RiskAlertResponse::from).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => engine_error_response(&trace_id, &e),
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct SummaryParams {
    /// Look-back window in days (defaults to the configured window)
    #[param(required = false)]
    #[serde(default, deserialize_with = "deserialize_optional_u64")]
    window_days: Option<u64>,
}

#[derive(Serialize, ToSchema)]
struct RiskAlertSummary {
    window_days: u32,
    /// ACTIVE alerts created within the window
    active_count: u64,
    /// ACTIVE alerts per severity, all severities present
    by_severity: BTreeMap<String, u64>,
}

#[utoipa::path(
    get,
    path = "/v1/risk-alerts/summary",
    tag = "RiskAlerts",
    security(("bearer_auth" = [])),
    params(SummaryParams),
    responses(
        (status = 200, description = "Active alert summary", body = RiskAlertSummary)
    )
)]
async fn risk_alert_summary(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Response {
    let window_days = match params.window_days {
        None => state.config.engine.active_window_days,
        Some(days) => match u32::try_from(days) {
            Ok(days) => days,
            Err(_) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &trace_id,
                    "bad_request",
                    "window_days is too large",
                )
            }
        },
    };

    let active_count = match state.engine.active_alert_count_since(window_days).await {
        Ok(n) => n,
        Err(e) => return engine_error_response(&trace_id, &e),
    };
    let histogram = match state.engine.active_severity_histogram().await {
        Ok(h) => h,
        Err(e) => return engine_error_response(&trace_id, &e),
    };

    success_response(
        StatusCode::OK,
        &trace_id,
        RiskAlertSummary {
            window_days,
            active_count,
            by_severity: histogram
                .into_iter()
                .map(|(severity, count)| (severity.to_string(), count))
                .collect(),
        },
    )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRiskAlertRequest {
    pub alert_type: String,
    /// LOW / MEDIUM / HIGH / CRITICAL
    pub severity: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub impact_assessment: Option<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}

/// Creates an ACTIVE alert. HIGH and CRITICAL alerts are dispatched to the
/// configured notification channels; a dispatch failure returns 502 with
/// the id of the alert, which stays persisted.
#[utoipa::path(
    post,
    path = "/v1/risk-alerts",
    tag = "RiskAlerts",
    security(("bearer_auth" = [])),
    request_body = CreateRiskAlertRequest,
    responses(
        (status = 201, description = "Alert created", body = RiskAlertResponse),
        (status = 400, description = "Invalid request", body = crate::api::ApiError),
        (status = 502, description = "Alert saved, notification failed", body = crate::api::ApiError)
    )
)]
async fn create_risk_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateRiskAlertRequest>,
) -> Response {
    let severity = match req.severity.parse::<Severity>() {
        Ok(s) => s,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg),
    };

    let mut new = NewAlert::new(req.alert_type, severity, req.title, req.description)
        .recommended_actions(req.recommended_actions);
    new.source_type = req.source_type.map(SourceType::from);
    new.source_id = req.source_id;
    new.impact_assessment = req.impact_assessment;

    match state.engine.create_alert_with(new).await {
        Ok(alert) => success_response(
            StatusCode::CREATED,
            &trace_id,
            RiskAlertResponse::from(alert),
        ),
        Err(e) => engine_error_response(&trace_id, &e),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SupplierEvaluationRequest {
    pub supplier_id: String,
    /// 0..=100
    pub current_score: i32,
    pub previous_score: Option<i32>,
}

#[derive(Serialize, ToSchema)]
struct SupplierEvaluationResponse {
    triggered: bool,
    alert: Option<RiskAlertResponse>,
}

/// Evaluates a supplier risk score change and raises an alert when a rule
/// matches.
#[utoipa::path(
    post,
    path = "/v1/risk-alerts/supplier-evaluations",
    tag = "RiskAlerts",
    security(("bearer_auth" = [])),
    request_body = SupplierEvaluationRequest,
    responses(
        (status = 200, description = "Evaluation result", body = SupplierEvaluationResponse),
        (status = 400, description = "Score out of range", body = crate::api::ApiError),
        (status = 502, description = "Alert saved, notification failed", body = crate::api::ApiError)
    )
)]
async fn evaluate_supplier(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<SupplierEvaluationRequest>,
) -> Response {
    if req.supplier_id.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "supplier_id must not be empty",
        );
    }

    match state
        .engine
        .evaluate_supplier_risk(&req.supplier_id, req.current_score, req.previous_score)
        .await
    {
        Ok(alert) => success_response(
            StatusCode::OK,
            &trace_id,
            SupplierEvaluationResponse {
                triggered: alert.is_some(),
                alert: alert.map(RiskAlertResponse::from),
            },
        ),
        Err(e) => engine_error_response(&trace_id, &e),
    }
}

#[utoipa::path(
    post,
    path = "/v1/risk-alerts/{id}/acknowledge",
    tag = "RiskAlerts",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Risk alert id")),
    responses(
        (status = 200, description = "Alert acknowledged", body = RiskAlertResponse),
        (status = 404, description = "Unknown alert", body = crate::api::ApiError),
        (status = 409, description = "Transition not allowed", body = crate::api::ApiError)
    )
)]
async fn acknowledge_risk_alert(
    Extension(trace_id): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.acknowledge(&id, &identity.user_ref()).await {
        Ok(alert) => success_response(StatusCode::OK, &trace_id, RiskAlertResponse::from(alert)),
        Err(e) => engine_error_response(&trace_id, &e),
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ResolveRequest {
    #[serde(default)]
    pub resolution_notes: String,
}

#[utoipa::path(
    post,
    path = "/v1/risk-alerts/{id}/resolve",
    tag = "RiskAlerts",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Risk alert id")),
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "Alert resolved", body = RiskAlertResponse),
        (status = 404, description = "Unknown alert", body = crate::api::ApiError),
        (status = 409, description = "Transition not allowed", body = crate::api::ApiError)
    )
)]
async fn resolve_risk_alert(
    Extension(trace_id): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Response {
    match state
        .engine
        .resolve(&id, &identity.user_ref(), &req.resolution_notes)
        .await
    {
        Ok(alert) => success_response(StatusCode::OK, &trace_id, RiskAlertResponse::from(alert)),
        Err(e) => engine_error_response(&trace_id, &e),
    }
}

#[utoipa::path(
    post,
    path = "/v1/risk-alerts/{id}/dismiss",
    tag = "RiskAlerts",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Risk alert id")),
    responses(
        (status = 200, description = "Alert dismissed", body = IdResponse),
        (status = 404, description = "Unknown alert", body = crate::api::ApiError),
        (status = 409, description = "Transition not allowed", body = crate::api::ApiError)
    )
)]
async fn dismiss_risk_alert(
    Extension(trace_id): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.dismiss(&id, &identity.user_ref()).await {
        Ok(()) => success_response(StatusCode::OK, &trace_id, IdResponse { id }),
        Err(e) => engine_error_response(&trace_id, &e),
    }
}

pub fn risk_alert_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_risk_alerts, create_risk_alert))
        .routes(routes!(critical_risk_alerts))
        .routes(routes!(risk_alert_summary))
        .routes(routes!(evaluate_supplier))
        .routes(routes!(get_risk_alert))
        .routes(routes!(acknowledge_risk_alert))
        .routes(routes!(resolve_risk_alert))
        .routes(routes!(dismiss_risk_alert))
}
