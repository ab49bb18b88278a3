//! Configuration for the Auth API service.

use std::str::FromStr;
use std::time::Duration;

use perch_auth_core::{AuthConfig, DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL};
use perch_store::redis_store::DEFAULT_KEY_PREFIX;

/// Session store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Shared redis instance (required for more than one replica)
    Redis,
    /// In-process cache, lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("SESSION_STORE")),
        }
    }
}

/// Auth API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,

    /// Session store backend
    pub store_backend: StoreBackend,

    /// Redis address, required for the redis backend
    pub redis_dsn: Option<String>,

    /// Prefix for session keys in redis
    pub redis_key_prefix: String,

    /// Auth core configuration
    pub auth: AuthConfig,

    /// Request timeout for API routes
    pub request_timeout: Duration,

    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Configuration with defaults around an auth config
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            http_port: 8080,
            store_backend: StoreBackend::Memory,
            redis_dsn: None,
            redis_key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            auth,
            request_timeout: Duration::from_secs(30),
            metrics_enabled: false,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        let http_port = parse_or(&lookup, "HTTP_PORT", 8080u16)?;

        // Session store
        let store_backend = match lookup("SESSION_STORE") {
            Some(value) => value.parse()?,
            None => StoreBackend::Redis,
        };
        let redis_dsn = lookup("REDIS_DSN").filter(|dsn| !dsn.trim().is_empty());
        if store_backend == StoreBackend::Redis && redis_dsn.is_none() {
            return Err(ConfigError::Missing("REDIS_DSN"));
        }
        let redis_key_prefix =
            lookup("REDIS_KEY_PREFIX").unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());

        // Credential secrets (minimum 32 bytes, distinct)
        let access_secret = lookup("ACCESS_SECRET").ok_or(ConfigError::Missing("ACCESS_SECRET"))?;
        let refresh_secret =
            lookup("REFRESH_SECRET").ok_or(ConfigError::Missing("REFRESH_SECRET"))?;

        // Lifetimes (default 15 minutes / 7 days)
        let access_ttl_secs = parse_or(&lookup, "ACCESS_TTL_SECS", DEFAULT_ACCESS_TTL.as_secs())?;
        let refresh_ttl_secs =
            parse_or(&lookup, "REFRESH_TTL_SECS", DEFAULT_REFRESH_TTL.as_secs())?;

        let revoke_refresh_on_logout = parse_or(&lookup, "REVOKE_REFRESH_ON_LOGOUT", true)?;

        // Request timeout (default 30 seconds)
        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;

        // Metrics
        let metrics_enabled = parse_or(&lookup, "METRICS_ENABLED", true)?;

        let auth = AuthConfig::try_new(access_secret, refresh_secret)
            .map_err(|e| ConfigError::AuthConfig(e.to_string()))?
            .with_access_ttl(Duration::from_secs(access_ttl_secs))
            .with_refresh_ttl(Duration::from_secs(refresh_ttl_secs))
            .with_revoke_refresh_on_logout(revoke_refresh_on_logout);
        auth.validate()
            .map_err(|e| ConfigError::AuthConfig(e.to_string()))?;

        Ok(Self {
            http_port,
            store_backend,
            redis_dsn,
            redis_key_prefix,
            auth,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Auth config error: {0}")]
    AuthConfig(String),
}
