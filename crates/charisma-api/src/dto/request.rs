//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use charisma_core::error::AppError;
use charisma_core::types::id::UserId;
use charisma_entity::notification::{CreateNotification, NotificationKind, Recipient};

/// `POST /api/notifications/send` body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendNotificationRequest {
    /// Target user. Absent means broadcast.
    #[serde(default)]
    pub recipient_id: Option<UserId>,
    /// Notification kind.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
    /// Free-form JSON attached to the notification.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Store the notification (default: true).
    #[serde(default)]
    pub persist: Option<bool>,
}

impl SendNotificationRequest {
    /// Validate and convert into a fan-out request.
    pub fn into_create(self) -> Result<CreateNotification, AppError> {
        self.validate()
            .map_err(|e| AppError::validation(format!("Invalid notification: {e}")))?;

        let base = match self.recipient_id {
            Some(user_id) => CreateNotification::to_user(user_id, self.kind, self.title, self.message),
            None => CreateNotification::broadcast(self.kind, self.title, self.message),
        };
        let base = match self.metadata {
            Some(metadata) => base.with_metadata(metadata),
            None => base,
        };
        Ok(match self.persist {
            Some(false) => base.transient(),
            _ => base,
        })
    }

    /// Who this request targets.
    pub fn recipient(&self) -> Recipient {
        Recipient::from_option(self.recipient_id)
    }
}
