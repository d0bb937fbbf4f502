//! Gateway server setup
//!
//! Routes, middleware and the startup sequence.

mod middleware;
mod routes;
mod state;

pub use middleware::{apply_middleware, REQUEST_ID_HEADER};
pub use routes::create_router;
pub use state::GatewayState;

use crate::connection::ConnectionRegistry;
use crate::relay::{InboundRelay, DEFAULT_LANE_BUFFER};
use axum::Router;
use relay_bus::{BusSupervisor, Publisher, RedisPool, RetryPolicy, SubscriberConfig};
use relay_common::{AppConfig, AppError};
use relay_core::SnowflakeGenerator;
use relay_db::{DatabaseConfig, PgMessageStore, PgRoomRepository};
use relay_service::ServiceContext;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    apply_middleware(create_router()).with_state(state)
}

/// Connect storage and the bus, then wire the services and the relay
///
/// Fails if the bus is still unreachable once the startup retry policy is
/// exhausted.
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    info!("Connecting to PostgreSQL...");
    let db_pool = relay_db::create_pool(&DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    relay_db::run_migrations(&db_pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    info!("Connecting to Redis...");
    let redis_pool = RedisPool::from_config(&config.redis).map_err(|e| AppError::Bus(e.to_string()))?;
    let attempts = BusSupervisor::new(RetryPolicy::from(&config.bus_startup))
        .wait_until_ready(&redis_pool)
        .await
        .map_err(|e| AppError::Bus(e.to_string()))?;
    info!(attempts, "Redis connection established");

    let service_context = ServiceContext::builder()
        .room_repo(Arc::new(PgRoomRepository::new(db_pool.clone())))
        .message_store(Arc::new(PgMessageStore::new(db_pool.clone())))
        .publisher(Arc::new(Publisher::new(redis_pool.clone())))
        .snowflake_generator(Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id)))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let registry = ConnectionRegistry::new_shared(config.relay.write_timeout);

    let relay = InboundRelay::new(Arc::clone(&registry), DEFAULT_LANE_BUFFER);
    relay
        .start(SubscriberConfig {
            redis_url: config.redis.url(),
            ..SubscriberConfig::default()
        })
        .map_err(AppError::internal)?;

    Ok(GatewayState::new(
        service_context,
        registry,
        relay,
        db_pool,
        redis_pool,
        config,
    ))
}

/// Serve until ctrl-c
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Relay gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the complete gateway with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .server
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid server address: {e}")))?;

    let state = create_gateway_state(config).await?;
    let relay = Arc::clone(state.relay());

    let result = run_server(create_app(state), addr).await;

    relay.shutdown().await;

    result
}
