//! Redis connection pool using deadpool-redis.
//!
//! Provides a managed pool of Redis connections for publishing and health checks.

use deadpool_redis::{Config, Pool, Runtime};
use relay_core::DomainError;
use std::sync::Arc;

/// Redis pool configuration
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    /// Redis connection URL (e.g., `redis://localhost:6379`)
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: usize,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            max_connections: 10,
        }
    }
}

impl From<&relay_common::RedisConfig> for RedisPoolConfig {
    fn from(config: &relay_common::RedisConfig) -> Self {
        Self {
            url: config.url(),
            max_connections: config.max_connections as usize,
        }
    }
}

/// Error type for Redis pool operations
#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("Failed to get connection from pool: {0}")]
    GetConnection(#[from] deadpool_redis::PoolError),

    #[error("Redis command error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected PING reply: {0}")]
    UnexpectedReply(String),
}

/// Result type for Redis pool operations
pub type RedisResult<T> = Result<T, RedisPoolError>;

impl From<RedisPoolError> for DomainError {
    fn from(err: RedisPoolError) -> Self {
        match err {
            RedisPoolError::Serialization(e) => DomainError::InternalError(e.to_string()),
            other => DomainError::BusUnavailable(other.to_string()),
        }
    }
}

/// Managed Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl RedisPool {
    /// Create a new Redis pool; no connection is opened until first use
    pub fn new(config: RedisPoolConfig) -> RedisResult<Self> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?;

        // Redact credentials from URL for logging
        let safe_url = config.url.split('@').next_back().unwrap_or(&config.url);
        tracing::info!(
            url = %safe_url,
            max_connections = config.max_connections,
            "Redis pool created"
        );

        Ok(Self { pool })
    }

    pub fn from_config(config: &relay_common::RedisConfig) -> RedisResult<Self> {
        Self::new(RedisPoolConfig::from(config))
    }

    /// Get a connection from the pool
    pub async fn get(&self) -> RedisResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(RedisPoolError::GetConnection)
    }

    #[must_use]
    pub fn status(&self) -> deadpool_redis::Status {
        self.pool.status()
    }

    /// Ping Redis through a pooled connection
    pub async fn health_check(&self) -> RedisResult<()> {
        let mut conn = self.get().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(RedisPoolError::UnexpectedReply(reply))
        }
    }
}

/// Shared Redis pool wrapped in Arc for easy cloning
pub type SharedRedisPool = Arc<RedisPool>;

pub fn create_shared_pool(config: RedisPoolConfig) -> RedisResult<SharedRedisPool> {
    Ok(Arc::new(RedisPool::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_redis_config() {
        let redis_config = relay_common::RedisConfig {
            host: "bus.internal".to_string(),
            port: 6380,
            max_connections: 32,
        };
        let pool_config = RedisPoolConfig::from(&redis_config);
        assert_eq!(pool_config.url, "redis://bus.internal:6380");
        assert_eq!(pool_config.max_connections, 32);
    }

    #[test]
    fn test_errors_map_to_bus_unavailable() {
        let err: DomainError = RedisPoolError::UnexpectedReply("LOADING".into()).into();
        assert!(matches!(err, DomainError::BusUnavailable(_)));
        assert_eq!(err.code(), "BUS_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_pool_creation_is_lazy() {
        // Nothing listens on this port; building the pool must still succeed.
        let pool = RedisPool::new(RedisPoolConfig {
            url: "redis://127.0.0.1:1".to_string(),
            max_connections: 2,
        })
        .unwrap();
        assert_eq!(pool.status().size, 0);
        assert!(pool.health_check().await.is_err());
    }
}
