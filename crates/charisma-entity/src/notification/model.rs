//! Notification entity model.

use charisma_core::types::id::{NotificationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::kind::NotificationKind;
use super::recipient::Recipient;

/// A notification as seen by one reader.
///
/// For broadcasts (`user_id` is `None`) the `is_read`/`read_at` fields are
/// the reader's own receipt, not a shared flag.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// Recipient user; `None` for a broadcast.
    pub user_id: Option<UserId>,
    /// Notification kind.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Additional structured data.
    pub metadata: serde_json::Value,
    /// Whether the reader has read it.
    pub is_read: bool,
    /// When the reader read it.
    pub read_at: Option<DateTime<Utc>>,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Recipient scope of this notification.
    pub fn recipient(&self) -> Recipient {
        Recipient::from_option(self.user_id)
    }

    /// Whether this is a broadcast.
    pub fn is_broadcast(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Data required to create a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    pub recipient: Recipient,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Store the notification; when false it is only published live.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

impl CreateNotification {
    /// Create a persisted notification for one user.
    pub fn to_user(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient: Recipient::User(user_id),
            kind,
            title: title.into(),
            message: message.into(),
            metadata: serde_json::Value::Object(Default::default()),
            persist: true,
        }
    }

    /// Create a persisted broadcast.
    pub fn broadcast(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient: Recipient::Broadcast,
            kind,
            title: title.into(),
            message: message.into(),
            metadata: serde_json::Value::Object(Default::default()),
            persist: true,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Publish live only, without persisting.
    pub fn transient(mut self) -> Self {
        self.persist = false;
        self
    }

    /// Materialize the unread row this request produces.
    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::new(),
            user_id: self.recipient.user_id(),
            kind: self.kind,
            title: self.title,
            message: self.message,
            metadata: self.metadata,
            is_read: false,
            read_at: None,
            created_at: now,
        }
    }
}

fn default_persist() -> bool {
    true
}
