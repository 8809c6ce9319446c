//! Key and channel name builders.
//!
//! Centralising construction keeps the Redis layout in one place. Keys
//! are relative; the Redis client applies `cache.redis.key_prefix`.

use charisma_core::types::id::UserId;

// ── Queue keys ─────────────────────────────────────────────

/// LIST of JSON queue entries waiting for a worker.
pub const QUEUE_PENDING: &str = "queue:pending";

/// SET of job ids currently held by the queue (pending, processing, or
/// waiting for a retry). Guards against double enqueue.
pub const QUEUE_MEMBERS: &str = "queue:members";

/// ZSET of claimed job ids scored by claim time (ms).
pub const QUEUE_PROCESSING: &str = "queue:processing";

/// ZSET of job ids scored by retry-at time (ms).
pub const QUEUE_RETRY: &str = "queue:retry";

/// HASH of job id → JSON entry for scheduled retries.
pub const QUEUE_RETRY_ENTRIES: &str = "queue:retry:entries";

// ── Notification keys ──────────────────────────────────────

/// Marker bumped on every broadcast. Unread counts are cached per
/// generation, so a broadcast invalidates every user's count at once.
pub const BROADCAST_GENERATION: &str = "notif:broadcast:generation";

/// Cache key for a user's unread notification count.
pub fn unread_notification_count(user_id: UserId, generation: &str) -> String {
    format!("notif:unread:{user_id}:{generation}")
}

// ── Pub/sub channels ───────────────────────────────────────

/// Channel carrying notifications for one user.
pub fn user_notifications_channel(user_id: UserId) -> String {
    format!("notifications:{user_id}")
}

/// Channel carrying job status changes.
pub const JOB_UPDATES_CHANNEL: &str = "jobs:updates";

/// Channel carrying finished analyses.
pub const ANALYSIS_COMPLETE_CHANNEL: &str = "analysis:complete";

/// Channel carrying broadcasts to every user.
pub const SYSTEM_ANNOUNCEMENTS_CHANNEL: &str = "system:announcements";
