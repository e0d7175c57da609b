#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use riskwatch_common::types::{Identity, RiskAlert};
use riskwatch_engine::{EngineConfig, RiskAlertEngine};
use riskwatch_notify::error::NotifyError;
use riskwatch_notify::NotificationDispatcher;
use riskwatch_server::app;
use riskwatch_server::auth::JwtIdentityProvider;
use riskwatch_server::config::{AuthConfig, ServerConfig};
use riskwatch_server::state::AppState;
use riskwatch_storage::AlertDb;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
    pub dispatched: Arc<RecordingDispatcher>,
    pub token: String,
}

#[derive(Default)]
pub struct RecordingDispatcher {
    pub alerts: Mutex<Vec<RiskAlert>>,
}

impl RecordingDispatcher {
    pub fn count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, alert: &RiskAlert) -> riskwatch_notify::error::Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

pub struct FailingDispatcher;

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn dispatch(&self, _alert: &RiskAlert) -> riskwatch_notify::error::Result<()> {
        Err(NotifyError::Delivery {
            failed: vec!["ops-webhook".into()],
        })
    }
}

fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret".to_string(),
        issuer: None,
        token_expire_secs: 3600,
    }
}

pub async fn build_test_context() -> Result<TestContext> {
    build_test_context_with(None).await
}

/// `dispatcher` replaces the recording dispatcher when given.
pub async fn build_test_context_with(
    dispatcher: Option<Arc<dyn NotificationDispatcher>>,
) -> Result<TestContext> {
    riskwatch_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let config = ServerConfig {
        data_dir: temp_dir.path().to_string_lossy().to_string(),
        auth: auth_config(),
        ..ServerConfig::default()
    };

    let store = Arc::new(AlertDb::open(&config.database_url(), temp_dir.path()).await?);
    let recording = Arc::new(RecordingDispatcher::default());
    let dispatcher =
        dispatcher.unwrap_or_else(|| recording.clone() as Arc<dyn NotificationDispatcher>);
    let engine = Arc::new(RiskAlertEngine::new(store, dispatcher, EngineConfig::default()));

    let provider = JwtIdentityProvider::new(&config.auth);
    let token = provider.issue_token(
        &Identity {
            subject: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            display_name: Some("Alice".to_string()),
        },
        3600,
    )?;

    let state = AppState {
        engine,
        identity: Arc::new(provider),
        config: Arc::new(config),
        start_time: Utc::now(),
    };
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
        dispatched: recording,
        token,
    })
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder = builder.header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let req = builder.body(Body::empty()).expect("request should build");
    send(app, req).await
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub fn assert_ok_envelope(body: &Value) {
    assert_eq!(body["err_code"], 0, "unexpected envelope: {body}");
    assert_eq!(body["err_msg"], "success");
    assert!(body["trace_id"].is_string());
}

pub fn assert_err_envelope(body: &Value, err_code: i64) {
    assert_eq!(body["err_code"], err_code, "unexpected envelope: {body}");
    assert!(body["err_msg"].is_string());
}

/// Creates an alert over HTTP and returns its id.
pub async fn create_alert(ctx: &TestContext, severity: &str, title: &str) -> String {
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/risk-alerts",
        Some(&ctx.token),
        Some(serde_json::json!({
            "alert_type": "GENERIC",
            "severity": severity,
            "title": title,
            "description": "created by test",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body["data"]["id"]
        .as_str()
        .expect("id should exist")
        .to_string()
}
