//! Route definitions for the HTTP API.
//!
//! All routes are mounted under `/api`. The router receives `AppState`
//! and passes it to handlers via Axum's `State` extractor.

use axum::Router;
use axum::routing::{get, post, put};

use crate::handlers;
use crate::state::AppState;

/// Build the Axum router with every route. Middleware is added by
/// [`build_app`](crate::app::build_app).
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(cron_routes())
        .merge(notification_routes())
        .merge(admin_routes())
        .merge(health_routes());

    Router::new().nest("/api", api_routes).with_state(state)
}

/// Cron drain entry; hosted schedulers use either verb.
fn cron_routes() -> Router<AppState> {
    Router::new().route(
        "/cron/process-jobs",
        get(handlers::cron::process_jobs).post(handlers::cron::process_jobs),
    )
}

/// Notification listing, delivery, read state, and the event stream
fn notification_routes() -> Router<AppState> {
    use handlers::notification as n;

    Router::new()
        .route("/notifications", get(n::list_notifications))
        .route("/notifications/send", post(n::send_notification))
        .route("/notifications/read-all", put(n::mark_all_read))
        .route("/notifications/{id}/read", put(n::mark_read))
        .route("/notifications/stream", get(handlers::stream::stream))
}

fn admin_routes() -> Router<AppState> {
    use handlers::admin::jobs;

    Router::new()
        .route("/admin/jobs/stats", get(jobs::job_stats))
        .route("/admin/jobs/{id}", get(jobs::get_job))
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
