//! Gateway state
//!
//! Shared dependencies for HTTP handlers and room sockets.

use crate::connection::ConnectionRegistry;
use crate::relay::InboundRelay;
use relay_bus::RedisPool;
use relay_common::AppConfig;
use relay_db::PgPool;
use relay_service::ServiceContext;
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    service_context: Arc<ServiceContext>,
    registry: Arc<ConnectionRegistry>,
    relay: Arc<InboundRelay>,
    db_pool: PgPool,
    redis_pool: RedisPool,
    config: Arc<AppConfig>,
}

impl GatewayState {
    pub fn new(
        service_context: ServiceContext,
        registry: Arc<ConnectionRegistry>,
        relay: Arc<InboundRelay>,
        db_pool: PgPool,
        redis_pool: RedisPool,
        config: AppConfig,
    ) -> Self {
        Self {
            service_context: Arc::new(service_context),
            registry,
            relay,
            db_pool,
            redis_pool,
            config: Arc::new(config),
        }
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Local room connections
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Bus-to-socket relay
    pub fn relay(&self) -> &Arc<InboundRelay> {
        &self.relay
    }

    pub fn db_pool(&self) -> &PgPool {
        &self.db_pool
    }

    pub fn redis_pool(&self) -> &RedisPool {
        &self.redis_pool
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("service_context", &self.service_context)
            .field("registry", &self.registry)
            .field("relay", &self.relay)
            .field("config", &"AppConfig")
            .finish()
    }
}
