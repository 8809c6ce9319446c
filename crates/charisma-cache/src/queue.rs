//! Queue store trait.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use charisma_core::result::AppResult;
use charisma_core::types::id::JobId;
use charisma_entity::job::{QueueCounts, QueueEntry};

/// Storage for queued job references.
///
/// Holds no job state beyond routing; the job store stays the source of
/// truth. A job id is a *member* from the moment it is claimed for
/// enqueue until it is released after completion, final failure, or
/// stuck-job cleanup.
#[async_trait]
pub trait QueueStore: Send + Sync + Debug + 'static {
    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<()>;

    /// Add `job_id` to the member set. Returns `false` if it was already a member.
    async fn try_claim(&self, job_id: JobId) -> AppResult<bool>;

    /// Drop membership and any processing marker for `job_id`.
    async fn release(&self, job_id: JobId) -> AppResult<()>;

    /// Append an entry to the pending list.
    async fn push(&self, entry: &QueueEntry) -> AppResult<()>;

    /// Take the oldest pending entry.
    async fn pop(&self) -> AppResult<Option<QueueEntry>>;

    /// Record that a worker claimed `job_id` at `started_at`.
    async fn mark_processing(&self, job_id: JobId, started_at: DateTime<Utc>) -> AppResult<()>;

    /// Move `entry` from processing into the retry set, due at `retry_at`.
    async fn schedule_retry(&self, entry: &QueueEntry, retry_at: DateTime<Utc>) -> AppResult<()>;

    /// Retry entries due at or before `now`, earliest first.
    async fn due_retries(&self, now: DateTime<Utc>, limit: usize) -> AppResult<Vec<QueueEntry>>;

    /// Remove `job_id` from the retry set. Only one concurrent caller gets `true`.
    async fn remove_retry(&self, job_id: JobId) -> AppResult<bool>;

    /// Entry counts by state.
    async fn counts(&self) -> AppResult<QueueCounts>;
}
