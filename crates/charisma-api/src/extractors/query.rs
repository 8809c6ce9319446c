//! Notification listing query parameters.

use serde::{Deserialize, Serialize};

/// Largest page a caller may ask for.
pub const MAX_LIMIT: usize = 100;

/// `GET /api/notifications?limit=&unread_only=`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationQuery {
    /// Items to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Only unread notifications (default: false).
    #[serde(default)]
    pub unread_only: bool,
}

fn default_limit() -> usize {
    50
}

impl NotificationQuery {
    /// Limit clamped to `1..=MAX_LIMIT`.
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIMIT)
    }
}
