//! Job queue inspection for operators.

use axum::Json;
use axum::extract::{Path, State};

use charisma_core::error::AppError;
use charisma_core::types::id::JobId;
use charisma_entity::job::{Job, QueueStats};

use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::middleware::rbac::require_admin;
use crate::state::AppState;

/// GET /api/admin/jobs/stats
pub async fn job_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<QueueStats>>> {
    require_admin(&auth)?;
    let stats = state.queue.get_stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/admin/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<JobId>,
) -> ApiResult<Json<ApiResponse<Job>>> {
    require_admin(&auth)?;
    let job = state
        .queue
        .jobs()
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))?;
    Ok(Json(ApiResponse::ok(job)))
}
