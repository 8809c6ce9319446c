//! Queue entry value object.

use charisma_core::types::id::{JobId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::JobType;
use super::model::Job;

/// Reference to a job held by the queue store.
///
/// The job row stays the source of truth; the entry only carries enough
/// to route the work and is dropped on completion or stuck-job cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub job_id: JobId,
    pub user_id: UserId,
    pub job_type: JobType,
    pub enqueued_at: DateTime<Utc>,
    /// 1 for the first run, incremented per retry.
    pub attempt: u32,
}

impl QueueEntry {
    /// Build an entry for the job's next attempt.
    pub fn for_job(job: &Job, now: DateTime<Utc>) -> Self {
        Self {
            job_id: job.id,
            user_id: job.user_id,
            job_type: job.job_type,
            enqueued_at: now,
            attempt: u32::try_from(job.retry_count).unwrap_or(0) + 1,
        }
    }
}
