//! Notification recipient.

use charisma_core::types::id::UserId;
use serde::{Deserialize, Serialize};

/// Who a notification is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "user_id", rename_all = "snake_case")]
pub enum Recipient {
    /// A single user.
    User(UserId),
    /// Every user; stored once with no owner.
    Broadcast,
}

impl Recipient {
    /// Map an optional user id; `None` means broadcast.
    pub fn from_option(user_id: Option<UserId>) -> Self {
        user_id.map_or(Self::Broadcast, Self::User)
    }

    /// The owning user, if any.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Broadcast => None,
        }
    }

    /// Whether this notification is visible to `user_id`.
    pub fn includes(&self, user_id: UserId) -> bool {
        match self {
            Self::User(id) => *id == user_id,
            Self::Broadcast => true,
        }
    }
}
