//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use secrecy::SecretString;

/// HTTP header name for the push ingest key.
pub const INGEST_KEY_HEADER: &str = "X-Ingest-Key";

/// Development default values - NEVER use in production.
pub mod defaults {
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const DEV_JOBS_API_URL: &str = "http://localhost:7010";
    pub const DEV_INGEST_KEY: &str = "dev-ingest-key-do-not-use-in-production";
    pub const POLL_INTERVAL_SECS: u64 = 10;
    pub const API_TIMEOUT_SECS: u64 = 30;
    pub const FEED_CAPACITY: usize = 1000;
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Base URL of the backend jobs API
    pub jobs_api_url: String,
    /// Subscription key sent to the jobs API (optional)
    pub jobs_api_key: Option<SecretString>,
    /// Key the jobs service presents when pushing records
    pub ingest_key: Option<SecretString>,
    /// How often subscriptions without push are polled
    pub poll_interval: Duration,
    /// Timeout for jobs API requests
    pub api_timeout: Duration,
    /// Records buffered per session before a slow session starts lagging
    pub feed_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In development mode (RUST_ENV=development):
    /// - All variables have sensible defaults
    /// - Only RUST_ENV is required
    ///
    /// In production mode (RUST_ENV=production):
    /// - FJN_JOBS_API_URL and FJN_INGEST_KEY are required
    /// - Server will NOT start if using development defaults
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `FJN_HOST`: Server host (default: 127.0.0.1)
    /// - `FJN_PORT`: Server port (default: 8080)
    /// - `FJN_JOBS_API_URL`: Jobs API base URL (required in production)
    /// - `FJN_JOBS_API_KEY`: Jobs API subscription key (optional)
    /// - `FJN_INGEST_KEY`: Key required on push ingress (required in production)
    /// - `FJN_POLL_INTERVAL_SECS`: Poll fallback interval (default: 10)
    /// - `FJN_API_TIMEOUT_SECS`: Jobs API request timeout (default: 30)
    /// - `FJN_FEED_CAPACITY`: Push feed buffer per session (default: 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("FJN_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = env::var("FJN_PORT")
            .unwrap_or_else(|_| defaults::DEV_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("FJN_PORT must be a valid port number"))?;

        let jobs_api_url = match env::var("FJN_JOBS_API_URL") {
            Ok(url) => url,
            Err(_) if environment.is_development() => defaults::DEV_JOBS_API_URL.to_string(),
            Err(_) => return Err(ConfigError::MissingEnvVar("FJN_JOBS_API_URL")),
        };

        let jobs_api_key = env::var("FJN_JOBS_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(SecretString::from);

        let ingest_key = if environment.is_development() {
            Some(env::var("FJN_INGEST_KEY").unwrap_or_else(|_| defaults::DEV_INGEST_KEY.to_string()))
        } else {
            env::var("FJN_INGEST_KEY").ok()
        }
        .map(SecretString::from);

        let poll_interval_secs = env::var("FJN_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| defaults::POLL_INTERVAL_SECS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidValue(
                "FJN_POLL_INTERVAL_SECS must be a positive number",
            ))?;

        let api_timeout_secs = env::var("FJN_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| defaults::API_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue("FJN_API_TIMEOUT_SECS must be a valid number"))?;

        let feed_capacity = env::var("FJN_FEED_CAPACITY")
            .unwrap_or_else(|_| defaults::FEED_CAPACITY.to_string())
            .parse::<usize>()
            .ok()
            .filter(|capacity| *capacity > 0)
            .ok_or(ConfigError::InvalidValue(
                "FJN_FEED_CAPACITY must be a positive number",
            ))?;

        let config = Config {
            environment,
            host,
            port,
            jobs_api_url,
            jobs_api_key,
            ingest_key,
            poll_interval: Duration::from_secs(poll_interval_secs),
            api_timeout: Duration::from_secs(api_timeout_secs),
            feed_capacity,
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate that production configuration does not use development defaults.
    fn validate_production(&self) -> Result<(), ConfigError> {
        use secrecy::ExposeSecret;

        let mut errors = Vec::new();

        if self.jobs_api_url == defaults::DEV_JOBS_API_URL {
            errors.push(format!(
                "FJN_JOBS_API_URL is using development default '{}'. Set the production jobs API URL.",
                defaults::DEV_JOBS_API_URL
            ));
        }

        match &self.ingest_key {
            None => errors.push(
                "FJN_INGEST_KEY is not set. Push ingress cannot be authenticated.".to_string(),
            ),
            Some(key) if key.expose_secret() == defaults::DEV_INGEST_KEY => errors.push(
                "FJN_INGEST_KEY is using development default. Set a secure ingest key.".to_string(),
            ),
            Some(_) => {}
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
