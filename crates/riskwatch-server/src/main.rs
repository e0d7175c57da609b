use anyhow::Result;
use chrono::Utc;
use riskwatch_common::types::Identity;
use riskwatch_engine::RiskAlertEngine;
use riskwatch_notify::manager::NotificationManager;
use riskwatch_notify::plugin::ChannelRegistry;
use riskwatch_storage::AlertDb;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use riskwatch_server::app;
use riskwatch_server::auth::JwtIdentityProvider;
use riskwatch_server::config::ServerConfig;
use riskwatch_server::state::AppState;

const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  riskwatch-server [config.toml]                               Start the server");
    eprintln!("  riskwatch-server issue-token <config.toml> <subject> [email] Print a bearer token");
    eprintln!("  riskwatch-server --help                                      Show this message");
}

#[tokio::main]
async fn main() -> Result<()> {
    riskwatch_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("riskwatch=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some("issue-token") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("issue-token requires <config.toml> and <subject> arguments")
            })?;
            let subject = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("issue-token requires <config.toml> and <subject> arguments")
            })?;
            issue_token(config_path, subject, args.get(4).cloned())
        }
        path => run_server(path.unwrap_or(DEFAULT_CONFIG_PATH)).await,
    }
}

#[allow(clippy::print_stdout)]
fn issue_token(config_path: &str, subject: &str, email: Option<String>) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let provider = JwtIdentityProvider::new(&config.auth);
    let identity = Identity {
        subject: subject.to_string(),
        email,
        display_name: None,
    };
    let token = provider.issue_token(&identity, config.auth.token_expire_secs)?;
    println!("{token}");
    Ok(())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config {config_path}: {e}"))?;
    tracing::info!(config = %config_path, "Loaded configuration");

    let store = Arc::new(AlertDb::open(&config.database_url(), Path::new(&config.data_dir)).await?);
    let notifier = Arc::new(NotificationManager::from_config(
        &config.notification,
        &ChannelRegistry::default(),
    )?);
    let engine = Arc::new(RiskAlertEngine::new(
        store,
        notifier,
        config.engine.clone(),
    ));
    tracing::info!(
        transition_policy = ?config.engine.transition_policy,
        dedup_active = config.engine.dedup_active,
        rules = engine.rules().len(),
        "Risk alert engine ready"
    );

    let state = AppState {
        engine,
        identity: Arc::new(JwtIdentityProvider::new(&config.auth)),
        config: Arc::new(config.clone()),
        start_time: Utc::now(),
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_app = app::build_http_app(state);

    tracing::info!(http = %http_addr, "Server started");

    axum::serve(listener, http_app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
