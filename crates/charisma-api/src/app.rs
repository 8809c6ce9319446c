//! Application builder: wires router, middleware, and state into an Axum
//! app, and runs the server.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware::from_fn;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use charisma_cache::CacheBackends;
use charisma_core::config::AppConfig;
use charisma_core::error::AppError;
use charisma_database::Stores;
use charisma_worker::CronScheduler;

use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(from_fn(request_logging))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Runs the server until Ctrl+C.
///
/// Open event streams get `server.shutdown_grace_seconds` to end on their
/// own after the signal; then the process stops serving regardless.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting CharismaAI job and notification service...");

    // ── Step 1: Stores ───────────────────────────────────────────
    tracing::info!(provider = %config.database.provider, "Initializing stores");
    let stores = Stores::from_config(&config.database).await?;

    // ── Step 2: Cache, queue, pub/sub ────────────────────────────
    tracing::info!(provider = %config.cache.provider, "Initializing cache backends");
    let backends = CacheBackends::from_config(&config.cache, &config.realtime).await?;
    let maintenance = CancellationToken::new();
    let sweeper = backends.spawn_sweeper(maintenance.clone());

    // ── Step 3: Services ─────────────────────────────────────────
    let state = AppState::new(config.clone(), stores.clone(), backends);

    // ── Step 4: In-process cron ──────────────────────────────────
    let scheduler = if config.cron.in_process {
        let scheduler = CronScheduler::new(Arc::clone(&state.drainer), &config.cron.schedule).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("In-process cron disabled; expecting external calls to /api/cron/process-jobs");
        None
    };

    // ── Step 5: HTTP server ──────────────────────────────────────
    let app = build_app(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Listening on {}", addr);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let served = tokio::select! {
        result = async { server.await } => {
            result.map_err(|e| AppError::internal(format!("Server error: {e}")))
        }
        _ = async {
            let _ = shutdown_rx.wait_for(|stopping| *stopping).await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(grace_seconds = grace.as_secs(), "Grace period elapsed, closing open connections");
            Ok(())
        }
    };

    // ── Step 6: Teardown ─────────────────────────────────────────
    maintenance.cancel();
    if let Some(sweeper) = sweeper {
        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "Cache sweeper task failed");
        }
    }
    if let Some(scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Cron scheduler did not shut down cleanly");
        }
    }
    if let Some(pool) = &stores.pool {
        pool.close().await;
    }

    tracing::info!("Server stopped");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C; shutting down");
    }
    tracing::info!("Shutdown signal received");
}
