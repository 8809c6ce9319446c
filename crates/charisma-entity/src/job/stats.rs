//! Queue and job statistics.

use serde::{Deserialize, Serialize};

use super::status::JobStatus;

/// Entry counts held by the queue store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Entries waiting for a worker.
    pub pending: u64,
    /// Entries claimed by a worker.
    pub processing: u64,
    /// Entries waiting for their retry window.
    pub retrying: u64,
}

/// Job row counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusCounts {
    pub pending: u64,
    pub queued: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub canceled: u64,
}

impl JobStatusCounts {
    /// Add `count` rows of `status`.
    pub fn add(&mut self, status: JobStatus, count: u64) {
        let slot = match status {
            JobStatus::Pending => &mut self.pending,
            JobStatus::Queued => &mut self.queued,
            JobStatus::Processing => &mut self.processing,
            JobStatus::Completed => &mut self.completed,
            JobStatus::Failed => &mut self.failed,
            JobStatus::Canceled => &mut self.canceled,
        };
        *slot += count;
    }

    /// Total number of rows.
    pub fn total(&self) -> u64 {
        self.pending + self.queued + self.processing + self.completed + self.failed + self.canceled
    }
}

/// Combined queue and store statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queue: QueueCounts,
    pub jobs: JobStatusCounts,
}
