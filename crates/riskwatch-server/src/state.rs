use crate::auth::IdentityProvider;
use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use riskwatch_engine::RiskAlertEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RiskAlertEngine>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}
