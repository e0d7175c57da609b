//! HTTP surface of the risk alert service.
//!
//! [`app::build_http_app`] assembles the axum router: public health check,
//! JWT-protected `/v1/risk-alerts` routes and the generated OpenAPI document.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod logging;
pub mod openapi;
pub mod state;
