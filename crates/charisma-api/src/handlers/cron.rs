//! Cron drain entry.
//!
//! Hosted schedulers call this every minute with the shared secret. The
//! secret is checked before any store is touched.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use tracing::info;

use charisma_worker::DrainReport;

use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// GET|POST /api/cron/process-jobs
pub async fn process_jobs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ApiResponse<DrainReport>>> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    state.cron_verifier.verify_header(header)?;

    let report = state.drainer.drain().await?;
    info!(
        processed = report.processed,
        failed = report.failed(),
        duration_ms = report.duration_ms,
        "Cron drain request served"
    );
    Ok(Json(ApiResponse::ok(report)))
}
