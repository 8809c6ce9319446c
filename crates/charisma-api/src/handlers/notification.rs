//! Notification handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use charisma_core::types::id::NotificationId;
use charisma_realtime::notification::{DeliveryResult, NotificationList};

use crate::dto::request::SendNotificationRequest;
use crate::dto::response::{ApiResponse, MessageResponse, UpdatedResponse};
use crate::error::ApiResult;
use crate::extractors::{AuthUser, NotificationQuery};
use crate::middleware::rbac::require_admin;
use crate::state::AppState;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<ApiResponse<NotificationList>>> {
    let list = state
        .notifications
        .get_user_notifications(auth.user_id, query.limit(), query.unread_only)
        .await?;
    Ok(Json(ApiResponse::ok(list)))
}

/// POST /api/notifications/send
///
/// Admin only. Without `recipient_id` the notification is broadcast.
pub async fn send_notification(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SendNotificationRequest>,
) -> ApiResult<Json<ApiResponse<DeliveryResult>>> {
    require_admin(&auth)?;
    let result = state.notifications.send(body.into_create()?).await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<NotificationId>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    state.notifications.mark_as_read(auth.user_id, id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Marked as read"))))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<UpdatedResponse>>> {
    let updated = state.notifications.mark_all_as_read(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(UpdatedResponse { updated })))
}
