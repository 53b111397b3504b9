//! Configuration for the Subscription API service.

use std::time::Duration;

use tiffin_lifecycle::GatewayConfig;

/// Subscription API configuration
#[derive(Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Maximum database connections
    pub db_max_connections: u32,
    /// Razorpay credentials
    pub gateway: GatewayConfig,
    /// Shared secret the scheduler presents on `/internal` routes
    pub internal_token: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Database
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("DB_MAX_CONNECTIONS"))?;

        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Razorpay configuration
        let key_id = std::env::var("RAZORPAY_KEY_ID")
            .map_err(|_| ConfigError::Missing("RAZORPAY_KEY_ID"))?;

        let key_secret = std::env::var("RAZORPAY_KEY_SECRET")
            .map_err(|_| ConfigError::Missing("RAZORPAY_KEY_SECRET"))?;

        let webhook_secret = std::env::var("RAZORPAY_WEBHOOK_SECRET")
            .map_err(|_| ConfigError::Missing("RAZORPAY_WEBHOOK_SECRET"))?;

        let mut gateway = GatewayConfig::new(key_id, key_secret, webhook_secret);
        if let Ok(api_base) = std::env::var("RAZORPAY_API_BASE") {
            gateway = gateway.with_api_base(api_base);
        }

        let internal_token = std::env::var("INTERNAL_API_TOKEN")
            .map_err(|_| ConfigError::Missing("INTERNAL_API_TOKEN"))?;
        if internal_token.len() < 32 {
            return Err(ConfigError::Invalid("INTERNAL_API_TOKEN"));
        }

        // Request timeout
        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        // Metrics
        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            http_port,
            database_url,
            db_max_connections,
            gateway,
            internal_token,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_port", &self.http_port)
            .field("db_max_connections", &self.db_max_connections)
            .field("gateway_api_base", &self.gateway.api_base)
            .field("request_timeout", &self.request_timeout)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish_non_exhaustive()
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
