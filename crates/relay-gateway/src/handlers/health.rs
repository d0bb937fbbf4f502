//! Health check handlers
//!
//! Endpoints for liveness and readiness probes.

use axum::{extract::State, http::StatusCode, Json};
use relay_service::{HealthResponse, ReadinessResponse};

use crate::server::GatewayState;

/// Basic health check (liveness probe)
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Readiness check with dependency health
///
/// GET /health/ready
pub async fn readiness_check(State(state): State<GatewayState>) -> (StatusCode, Json<ReadinessResponse>) {
    let db_healthy = state.db_pool().acquire().await.is_ok();
    let redis_healthy = state.redis_pool().health_check().await.is_ok();

    let response = ReadinessResponse::ready(db_healthy, redis_healthy);
    let status = if response.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
