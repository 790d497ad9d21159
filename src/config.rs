use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_SESSION_SECRET: &str =
    "development_only_session_secret_shared_with_the_identity_provider_stub";

/// Static allow-list of identity-provider user ids granted admin privileges.
///
/// Parsed once at startup from a comma-separated config value and then only
/// read, so authorization checks never touch the database.
#[derive(Clone, Debug, Default)]
pub struct AdminAllowList(HashSet<String>);

impl AdminAllowList {
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.0.contains(user_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
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

    /// Create missing tables from entity definitions on startup (dev/test)
    #[serde(default)]
    pub auto_create_schema: bool,

    /// Shared secret used to verify identity-provider session tokens
    #[validate(length(min = 32), custom = "validate_session_secret")]
    pub session_secret: String,

    /// Expected issuer of identity-provider session tokens
    #[serde(default = "default_session_issuer")]
    pub session_issuer: String,

    /// Expected audience of identity-provider session tokens
    #[serde(default = "default_session_audience")]
    pub session_audience: String,

    /// Comma-separated identity-provider user ids granted admin access
    #[serde(default)]
    pub admin_user_ids: String,

    /// Parsed admin allow-list (derived from `admin_user_ids` at load time)
    #[serde(skip)]
    pub admin_allow_list: AdminAllowList,

    /// Payment gateway REST endpoint
    #[serde(default = "default_payment_base_url")]
    pub payment_base_url: String,

    /// Payment gateway key id (basic-auth username)
    #[serde(default)]
    pub payment_key_id: String,

    /// Payment gateway key secret; also signs payment confirmations
    #[serde(default)]
    pub payment_key_secret: String,

    /// Shipping collaborator REST endpoint (advisory cancellations)
    #[serde(default = "default_shipping_base_url")]
    pub shipping_base_url: String,

    /// Shipping collaborator API token
    #[serde(default)]
    pub shipping_api_token: Option<String>,

    /// Asset host upload endpoint
    #[serde(default = "default_asset_base_url")]
    pub asset_base_url: String,

    /// Asset host API key (basic-auth username)
    #[serde(default)]
    pub asset_api_key: String,

    /// Asset host API secret
    #[serde(default)]
    pub asset_api_secret: String,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB connect timeout (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    /// TTL for cached storefront views (seconds)
    #[serde(default = "default_view_cache_ttl_secs")]
    pub view_cache_ttl_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_session_issuer() -> String {
    "storefront-identity".to_string()
}

fn default_session_audience() -> String {
    "storefront-api".to_string()
}

fn default_payment_base_url() -> String {
    "https://api.payment-gateway.example.com/v1".to_string()
}

fn default_shipping_base_url() -> String {
    "https://api.shipping.example.com/v1".to_string()
}

fn default_asset_base_url() -> String {
    "https://api.asset-host.example.com/v1".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    10
}

fn default_view_cache_ttl_secs() -> u64 {
    300
}

fn validate_session_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();
    if trimmed.len() < 32 {
        let mut err = ValidationError::new("session_secret");
        err.message = Some("Session secret must be at least 32 characters".into());
        return Err(err);
    }

    const DISALLOWED: [&str; 3] = [
        "CHANGE_THIS_SECRET_IN_PRODUCTION",
        "your-secret-key",
        "default-secret-key",
    ];
    if DISALLOWED
        .iter()
        .any(|&bad| trimmed.eq_ignore_ascii_case(bad))
    {
        let mut err = ValidationError::new("session_secret");
        err.message = Some("Session secret must be overridden with a secure random value".into());
        return Err(err);
    }

    Ok(())
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        matches!(
            self.environment.to_ascii_lowercase().as_str(),
            "development" | "dev" | "test"
        )
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Cross-field checks that `validator` cannot express
    fn validate_runtime(&self) -> Result<(), AppConfigError> {
        if !self.is_development() && self.session_secret.trim() == DEV_DEFAULT_SESSION_SECRET {
            return Err(AppConfigError::Invalid(
                "session_secret must not use the development default outside development"
                    .to_string(),
            ));
        }
        if !self.is_development() && self.admin_allow_list.is_empty() {
            return Err(AppConfigError::Invalid(
                "admin_user_ids must list at least one admin outside development".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
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

    let builder = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("session_secret", DEV_DEFAULT_SESSION_SECRET)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let mut app_config: AppConfig = config.try_deserialize()?;
    app_config.admin_allow_list = AdminAllowList::parse(&app_config.admin_user_ids);
    app_config.validate()?;
    app_config.validate_runtime()?;

    info!(
        admins = app_config.admin_allow_list.len(),
        "Configuration loaded"
    );

    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_parses_comma_separated_ids() {
        let list = AdminAllowList::parse("user_a, user_b ,,user_c");
        assert_eq!(list.len(), 3);
        assert!(list.contains("user_a"));
        assert!(list.contains("user_b"));
        assert!(list.contains("user_c"));
        assert!(!list.contains("user_d"));
    }

    #[test]
    fn empty_allow_list_grants_nobody() {
        let list = AdminAllowList::parse("");
        assert!(list.is_empty());
        assert!(!list.contains(""));
    }

    #[test]
    fn session_secret_rejects_known_placeholders() {
        assert!(validate_session_secret("your-secret-key").is_err());
        assert!(validate_session_secret("short").is_err());
        assert!(
            validate_session_secret("a_sufficiently_long_and_boring_random_value_123456").is_ok()
        );
    }
}
