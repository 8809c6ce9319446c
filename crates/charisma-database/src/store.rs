//! Store traits for jobs and notifications.
//!
//! Status-changing methods are conditional: they only apply when the row
//! is in the expected source status and report whether they did, so two
//! concurrent callers can never both move the same job.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use charisma_core::result::AppResult;
use charisma_core::types::id::{JobId, NotificationId, UserId};
use charisma_entity::job::{CreateJob, Job, JobStatusCounts};
use charisma_entity::notification::Notification;

/// Source of truth for job records.
#[async_trait]
pub trait JobStore: Send + Sync + Debug + 'static {
    /// Check that the store is reachable.
    async fn health_check(&self) -> AppResult<()>;

    /// Insert a new `pending` job.
    async fn create(&self, data: CreateJob) -> AppResult<Job>;

    /// Find a job by ID.
    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>>;

    /// Oldest `pending` jobs first, at most `limit`.
    async fn find_pending(&self, limit: usize) -> AppResult<Vec<Job>>;

    /// `processing` jobs claimed before `started_before`.
    async fn find_stuck(&self, started_before: DateTime<Utc>) -> AppResult<Vec<Job>>;

    /// `pending → queued`. Returns `false` if the job was not pending.
    async fn mark_queued(&self, id: JobId) -> AppResult<bool>;

    /// `queued → processing`, stamping `started_at`.
    async fn mark_processing(&self, id: JobId) -> AppResult<Option<Job>>;

    /// `processing → completed` with the result payload.
    async fn mark_completed(&self, id: JobId, result: serde_json::Value)
    -> AppResult<Option<Job>>;

    /// `processing → failed` with the error text.
    async fn mark_failed(&self, id: JobId, error: &str) -> AppResult<Option<Job>>;

    /// `processing | failed → queued`, consuming one retry.
    ///
    /// Only applies while `retry_count < max_retries`.
    async fn requeue_for_retry(&self, id: JobId) -> AppResult<Option<Job>>;

    /// `pending | queued → canceled`.
    async fn cancel(&self, id: JobId) -> AppResult<bool>;

    /// Row counts per status.
    async fn count_by_status(&self) -> AppResult<JobStatusCounts>;
}

/// Persistence for notifications and broadcast read receipts.
#[async_trait]
pub trait NotificationStore: Send + Sync + Debug + 'static {
    /// Check that the store is reachable.
    async fn health_check(&self) -> AppResult<()>;

    /// Persist a notification row.
    async fn insert(&self, notification: &Notification) -> AppResult<()>;

    /// Raw row lookup; `is_read` is the owner flag, receipts are ignored.
    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>>;

    /// The reader's own notifications plus broadcasts, newest first.
    async fn list_for_user(
        &self,
        user_id: UserId,
        limit: usize,
        unread_only: bool,
    ) -> AppResult<Vec<Notification>>;

    /// Unread owned notifications plus broadcasts without a receipt.
    async fn count_unread(&self, user_id: UserId) -> AppResult<u64>;

    /// Set the read flag on a notification owned by `user_id`.
    async fn mark_owned_read(&self, id: NotificationId, user_id: UserId) -> AppResult<()>;

    /// Record that `user_id` read a broadcast. Repeats are ignored.
    async fn insert_receipt(&self, id: NotificationId, user_id: UserId) -> AppResult<()>;

    /// Mark everything visible to `user_id` as read; returns rows touched.
    async fn mark_all_read(&self, user_id: UserId) -> AppResult<u64>;
}
