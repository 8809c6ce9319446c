//! Health check handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use charisma_core::traits::cache::CacheProvider;

use crate::dto::response::{ApiResponse, ComponentHealth, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

/// GET /api/health/detailed
///
/// Responds 503 when any dependency is down so load balancers can act on
/// the status code alone.
pub async fn health_detailed(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<DetailedHealthResponse>>) {
    let database = database_health(&state).await;
    let backend = state.cache.provider_name();

    let queue = match state.queue.queue().health_check().await {
        Ok(()) => ComponentHealth::up(backend, None),
        Err(e) => ComponentHealth::down(backend, e.message),
    };
    let cache = match state.cache.health_check().await {
        Ok(true) => ComponentHealth::up(backend, None),
        Ok(false) => ComponentHealth::down(backend, "Health probe failed"),
        Err(e) => ComponentHealth::down(backend, e.message),
    };
    let pubsub = match state.pubsub.health_check().await {
        Ok(()) => ComponentHealth::up(backend, None),
        Err(e) => ComponentHealth::down(backend, e.message),
    };

    let healthy = [&database, &queue, &cache, &pubsub]
        .iter()
        .all(|c| c.is_up());
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = DetailedHealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        database,
        queue,
        cache,
        pubsub,
        streams: state.streams.registry().snapshot(),
    };
    (status, Json(ApiResponse::ok(body)))
}

async fn database_health(state: &AppState) -> ComponentHealth {
    let provider = state.stores.provider_name();
    match &state.stores.pool {
        Some(pool) => match pool.ping().await {
            Ok(latency) => ComponentHealth::up(provider, Some(latency.as_millis() as u64)),
            Err(e) => ComponentHealth::down(provider, e.message),
        },
        None => match state.stores.jobs.health_check().await {
            Ok(()) => ComponentHealth::up(provider, None),
            Err(e) => ComponentHealth::down(provider, e.message),
        },
    }
}
