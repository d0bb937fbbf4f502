//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub relay: RelayConfig,
    pub bus_startup: BusStartupConfig,
    pub snowflake: SnowflakeConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// HTTP / WebSocket listener
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis (message bus) configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
}

impl RedisConfig {
    #[must_use]
    pub fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

/// Fan-out tuning for local connections
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Upper bound for a single write to one client
    pub write_timeout: Duration,
    /// Outbound queue capacity per connection
    pub connection_buffer: usize,
}

/// Bus connectivity check performed once at startup
#[derive(Debug, Clone)]
pub struct BusStartupConfig {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

/// Snowflake ID generator configuration
#[derive(Debug, Clone)]
pub struct SnowflakeConfig {
    pub worker_id: u16,
}

// Default value functions
fn default_app_name() -> String {
    "chat-relay".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_write_timeout_ms() -> u64 {
    5000
}

fn default_connection_buffer() -> usize {
    100
}

fn default_bus_max_attempts() -> u32 {
    10
}

fn default_bus_retry_delay_ms() -> u64 {
    5000
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `DATABASE_URL` is missing or a variable does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        Ok(Self {
            app: AppSettings {
                name: vars.string("APP_NAME").unwrap_or_else(default_app_name),
                env: vars
                    .string("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            server: ServerConfig {
                host: vars.string("SERVER_HOST").unwrap_or_else(default_host),
                port: vars.parsed("SERVER_PORT")?.unwrap_or_else(default_port),
            },
            database: DatabaseConfig {
                url: vars
                    .string("DATABASE_URL")
                    .ok_or(ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: vars
                    .parsed("DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: vars
                    .parsed("DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
            },
            redis: RedisConfig {
                host: vars.string("REDIS_HOST").unwrap_or_else(default_redis_host),
                port: vars.parsed("REDIS_PORT")?.unwrap_or_else(default_redis_port),
                max_connections: vars
                    .parsed("REDIS_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_redis_max_connections),
            },
            relay: RelayConfig {
                write_timeout: Duration::from_millis(
                    vars.parsed("RELAY_WRITE_TIMEOUT_MS")?
                        .unwrap_or_else(default_write_timeout_ms),
                ),
                connection_buffer: vars
                    .parsed("RELAY_CONNECTION_BUFFER")?
                    .unwrap_or_else(default_connection_buffer)
                    .max(1),
            },
            bus_startup: BusStartupConfig {
                max_attempts: vars
                    .parsed("BUS_STARTUP_MAX_ATTEMPTS")?
                    .unwrap_or_else(default_bus_max_attempts)
                    .max(1),
                retry_delay: Duration::from_millis(
                    vars.parsed("BUS_STARTUP_RETRY_DELAY_MS")?
                        .unwrap_or_else(default_bus_retry_delay_ms),
                ),
            },
            snowflake: SnowflakeConfig {
                worker_id: vars.parsed("WORKER_ID")?.unwrap_or(0),
            },
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &'static str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn parsed<T: FromStr>(&self, name: &'static str) -> Result<Option<T>, ConfigError> {
        self.string(name)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(name, raw))
            })
            .transpose()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
