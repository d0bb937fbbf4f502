//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, BusStartupConfig, ConfigError, DatabaseConfig, Environment,
    RedisConfig, RelayConfig, ServerConfig, SnowflakeConfig,
};
