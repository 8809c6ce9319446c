//! Job status enumeration and lifecycle rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a background job.
///
/// Forward lifecycle: `pending → queued → processing → completed | failed`.
/// `canceled` is reachable from `pending` and `queued` only. The single
/// backwards edge is a retry re-queue into `queued`, checked separately
/// by [`JobStatus::can_requeue_for_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, waiting for the drainer.
    Pending,
    /// Placed in the queue, waiting for a worker.
    Queued,
    /// Claimed by a worker.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Withdrawn before a worker claimed it.
    Canceled,
}

impl JobStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [JobStatus; 6] = [
        Self::Pending,
        Self::Queued,
        Self::Processing,
        Self::Completed,
        Self::Failed,
        Self::Canceled,
    ];

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// Whether a forward transition to `next` is allowed.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Queued)
                | (Self::Pending, Self::Canceled)
                | (Self::Queued, Self::Processing)
                | (Self::Queued, Self::Canceled)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Whether a retry may move the job back into `queued`.
    pub fn can_requeue_for_retry(&self) -> bool {
        matches!(self, Self::Processing | Self::Failed)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path_is_allowed() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Queued));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_backwards_edges_are_rejected() {
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn test_cancel_only_before_claim() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Canceled));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Canceled));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Canceled));
    }

    #[test]
    fn test_retry_edge() {
        assert!(JobStatus::Failed.can_requeue_for_retry());
        assert!(JobStatus::Processing.can_requeue_for_retry());
        assert!(!JobStatus::Completed.can_requeue_for_retry());
        assert!(!JobStatus::Pending.can_requeue_for_retry());
    }

    #[test]
    fn test_parse() {
        assert_eq!("processing".parse::<JobStatus>().unwrap(), JobStatus::Processing);
        assert!("running".parse::<JobStatus>().is_err());
    }
}
