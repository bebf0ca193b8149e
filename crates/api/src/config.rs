//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use events::{HttpSinkConfig, PublisherConfig};
use thiserror::Error;

/// Development signing secret used when `JWT_SECRET` is unset outside production.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Errors found while reading the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("{0} must be set when TLS_ENABLED is true")]
    MissingTlsFile(&'static str),
}

/// Certificate and key used to serve HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// PEM certificate chain.
    pub cert_file: PathBuf,
    /// PEM private key.
    pub key_file: PathBuf,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default: `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `JWT_SECRET`, `AUTH_USERNAME`, `AUTH_PASSWORD`: sign-in settings
/// - `EVENT_SINK_URL`, `EVENT_TOPIC`: event destination; unset URL discards events
/// - `EVENT_DELIVERY_TIMEOUT_MS`, `EVENT_MAX_CONCURRENCY`, `EVENT_MAX_PENDING`,
///   `EVENT_MAX_ATTEMPTS`: publisher tuning
/// - `STORAGE_TIMEOUT_MS`, `SHUTDOWN_TIMEOUT_SECS`: service time limits
/// - `PRODUCTION`: refuses the development JWT secret when `true`
/// - `TLS_ENABLED`, `TLS_CERT_FILE`, `TLS_KEY_FILE`: serve HTTPS from PEM files
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub auth_username: String,
    pub auth_password: String,
    pub event_sink_url: Option<String>,
    pub event_topic: String,
    pub event_delivery_timeout: Duration,
    pub event_max_concurrency: usize,
    pub event_max_pending: usize,
    pub event_max_attempts: u32,
    pub storage_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub production: bool,
    pub tls: Option<TlsConfig>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let production = parse_or(&lookup, "PRODUCTION", false)?;
        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if production => return Err(ConfigError::Missing("JWT_SECRET")),
            None => defaults.jwt_secret,
        };

        let tls = if parse_or(&lookup, "TLS_ENABLED", false)? {
            Some(TlsConfig {
                cert_file: var("TLS_CERT_FILE")
                    .ok_or(ConfigError::MissingTlsFile("TLS_CERT_FILE"))?
                    .into(),
                key_file: var("TLS_KEY_FILE")
                    .ok_or(ConfigError::MissingTlsFile("TLS_KEY_FILE"))?
                    .into(),
            })
        } else {
            None
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?,
            database_url: var("DATABASE_URL"),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            jwt_secret,
            auth_username: var("AUTH_USERNAME").unwrap_or(defaults.auth_username),
            auth_password: var("AUTH_PASSWORD").unwrap_or(defaults.auth_password),
            event_sink_url: var("EVENT_SINK_URL"),
            event_topic: var("EVENT_TOPIC").unwrap_or(defaults.event_topic),
            event_delivery_timeout: Duration::from_millis(parse_or(
                &lookup,
                "EVENT_DELIVERY_TIMEOUT_MS",
                5_000,
            )?),
            event_max_concurrency: parse_or(
                &lookup,
                "EVENT_MAX_CONCURRENCY",
                defaults.event_max_concurrency,
            )?,
            event_max_pending: parse_or(&lookup, "EVENT_MAX_PENDING", defaults.event_max_pending)?,
            event_max_attempts: parse_or(
                &lookup,
                "EVENT_MAX_ATTEMPTS",
                defaults.event_max_attempts,
            )?,
            storage_timeout: Duration::from_millis(parse_or(
                &lookup,
                "STORAGE_TIMEOUT_MS",
                10_000,
            )?),
            shutdown_timeout: Duration::from_secs(parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30)?),
            production,
            tls,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when tokens are signed with the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Publisher tuning derived from the event settings.
    ///
    /// The drain grace is shorter than the shutdown timeout so a stuck sink is
    /// cancelled before the service gives up waiting.
    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            delivery_timeout: self.event_delivery_timeout,
            max_concurrency: self.event_max_concurrency,
            max_pending: self.event_max_pending,
            max_attempts: self.event_max_attempts,
            drain_timeout: self.shutdown_timeout.mul_f32(0.8),
            ..PublisherConfig::default()
        }
    }

    /// HTTP sink settings, if a sink URL is configured.
    pub fn sink_config(&self) -> Option<HttpSinkConfig> {
        self.event_sink_url.as_ref().map(|url| HttpSinkConfig {
            base_url: url.clone(),
            topic: self.event_topic.clone(),
            request_timeout: self.event_delivery_timeout,
            ..HttpSinkConfig::default()
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| ConfigError::Invalid { name, value })
        }
        _ => Ok(default),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            auth_username: "demo".to_string(),
            auth_password: "demo".to_string(),
            event_sink_url: None,
            event_topic: "companies".to_string(),
            event_delivery_timeout: Duration::from_secs(5),
            event_max_concurrency: 32,
            event_max_pending: 10_000,
            event_max_attempts: 1,
            storage_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(30),
            production: false,
            tls: None,
        }
    }
}
