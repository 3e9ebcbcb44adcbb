use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_DATABASE_URL: &str = "sqlite://restock.db?mode=rwc";
const CONFIG_DIR: &str = "config";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Maximum number of database connections in the pool
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Minimum number of database connections in the pool
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Database connect timeout in seconds
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    /// Database idle timeout in seconds
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    /// Capacity of the in-process event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Creates a new configuration with defaults for the remaining fields
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Constraints that span multiple fields, checked after deserialization
    pub fn validate_runtime_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.db_min_connections > self.db_max_connections {
            errors.add(
                "db_min_connections",
                ValidationError::new("min_connections_exceed_max"),
            );
        }

        if self.event_channel_capacity == 0 {
            errors.add(
                "event_channel_capacity",
                ValidationError::new("zero_channel_capacity"),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_max_connections() -> u32 {
    100
}

fn default_db_min_connections() -> u32 {
    5
}

fn default_db_connect_timeout_secs() -> u64 {
    10
}

fn default_db_idle_timeout_secs() -> u64 {
    300
}

fn default_event_channel_capacity() -> usize {
    1024
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` overrides the configured level when set; otherwise the service
/// crate logs at `level` and tower_http at debug.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("restock_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
/// 5. Plain DATABASE_URL, when set
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let mut app_config: AppConfig = config.try_deserialize()?;

    // A bare DATABASE_URL wins over everything, matching deployment tooling
    if let Ok(url) = env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            app_config.database_url = url;
        }
    }

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_runtime_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite://restock.db?mode=memory".into(),
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn base_config_passes_validation() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_runtime_constraints().is_ok());
        assert!(cfg.is_production());
    }

    #[test]
    fn empty_database_url_fails_validation() {
        let mut cfg = base_config();
        cfg.database_url = String::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_pool_bounds_fail_validation() {
        let mut cfg = base_config();
        cfg.db_min_connections = 50;
        cfg.db_max_connections = 10;
        assert!(cfg.validate_runtime_constraints().is_err());
    }

    #[test]
    fn zero_event_capacity_fails_validation() {
        let mut cfg = base_config();
        cfg.event_channel_capacity = 0;
        assert!(cfg.validate_runtime_constraints().is_err());
    }
}
