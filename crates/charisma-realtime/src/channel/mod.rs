//! The channel set a stream session subscribes to.

use charisma_cache::keys;
use charisma_core::types::id::UserId;

/// Channels relayed to a session owned by `user_id`.
pub fn subscriber_channels(user_id: UserId) -> Vec<String> {
    vec![
        keys::user_notifications_channel(user_id),
        keys::JOB_UPDATES_CHANNEL.to_string(),
        keys::ANALYSIS_COMPLETE_CHANNEL.to_string(),
        keys::SYSTEM_ANNOUNCEMENTS_CHANNEL.to_string(),
    ]
}
