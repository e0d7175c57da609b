use riskwatch_engine::EngineConfig;
use riskwatch_notify::config::DispatcherConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub notification: DispatcherConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full SeaORM connection URL. Falls back to a SQLite file in `data_dir`.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// When set, tokens must carry this `iss` claim.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Lifetime of tokens minted by `issue-token`.
    #[serde(default = "default_token_expire_secs")]
    pub token_expire_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            issuer: None,
            token_expire_secs: default_token_expire_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            data_dir: default_data_dir(),
            database: DatabaseConfig::default(),
            engine: EngineConfig::default(),
            notification: DispatcherConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_jwt_secret() -> String {
    "change-me".to_string()
}

fn default_token_expire_secs() -> u64 {
    86400
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn database_url(&self) -> String {
        match &self.database.url {
            Some(url) => url.clone(),
            None => riskwatch_storage::AlertDb::sqlite_url(Path::new(&self.data_dir)),
        }
    }
}
