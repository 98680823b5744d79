use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Secret used to validate the HS256 auth tokens
    pub auth_jwt_secret: Option<String>,

    /// Directory holding one sub-directory per project
    #[serde(default = "default_projects_dir")]
    pub projects_dir: String,

    /// Seconds without a heartbeat before an editor or waiter is considered gone
    #[serde(default = "default_edit_timeout_secs")]
    pub edit_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        load_env_files();

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn edit_timeout(&self) -> Duration {
        Duration::from_secs(self.edit_timeout_secs)
    }

    /// Parsed list of CORS origins, empty when none are configured
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            auth_jwt_secret: None,
            projects_dir: default_projects_dir(),
            edit_timeout_secs: default_edit_timeout_secs(),
        }
    }
}

/// Client configuration, read from `WORKSHOP_`-prefixed variables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Base URL of the workshop server, e.g. `http://127.0.0.1:8000`
    pub server_url: String,

    /// Ready-made bearer token. Takes precedence over minting one.
    pub auth_token: Option<String>,

    /// Username, role and shared secret used to mint a token in dev setups
    pub user: Option<String>,
    #[serde(default = "default_client_role")]
    pub role: String,
    pub jwt_secret: Option<String>,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,

    /// Maximum characters per save chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Read-only content refresh while queued or viewing; off when unset
    pub view_refresh_ms: Option<u64>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        load_env_files();

        match envy::prefixed("WORKSHOP_").from_env::<ClientConfig>() {
            Ok(config) => {
                info!("✅ Client configuration loaded for {}", config.server_url);
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load client configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
    #[error("Missing credentials: set WORKSHOP_AUTH_TOKEN or WORKSHOP_USER with WORKSHOP_JWT_SECRET")]
    MissingCredentials,
    #[error("Client setup failed: {0}")]
    Client(String),
}

// Try app.env first, then fall back to .env
fn load_env_files() {
    if std::path::Path::new("app.env").exists() {
        dotenvy::from_filename("app.env").ok();
    } else {
        dotenvy::dotenv().ok();
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_projects_dir() -> String {
    "projects".to_string()
}

fn default_edit_timeout_secs() -> u64 {
    30
}

fn default_client_role() -> String {
    "user".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    3_000
}

fn default_autosave_delay_ms() -> u64 {
    3_000
}

fn default_chunk_size() -> usize {
    100 * 1024
}

fn default_request_timeout_secs() -> u64 {
    10
}
