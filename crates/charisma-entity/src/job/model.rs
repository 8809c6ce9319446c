//! Job entity model.

use charisma_core::types::id::{JobId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::kind::JobType;
use super::payload::AnalysisPayload;
use super::status::JobStatus;

/// A background analysis job; the `jobs` table row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Owning user.
    pub user_id: UserId,
    /// Kind of analysis.
    pub job_type: JobType,
    /// Current status.
    pub status: JobStatus,
    /// Analysis input (JSON form of [`AnalysisPayload`]).
    pub payload: serde_json::Value,
    /// Result data on completion.
    pub result: Option<serde_json::Value>,
    /// Last error message.
    pub error: Option<String>,
    /// Retries already consumed.
    pub retry_count: i32,
    /// Retry budget.
    pub max_retries: i32,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When a worker last claimed the job.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the row last changed.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether another retry fits in the budget.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Decode the typed analysis payload.
    pub fn analysis_payload(&self) -> Result<AnalysisPayload, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Seconds spent processing so far, if the job has been claimed.
    pub fn processing_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.started_at.map(|started| (now - started).num_seconds())
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    /// Owning user.
    pub user_id: UserId,
    /// Kind of analysis.
    pub job_type: JobType,
    /// Analysis input.
    pub payload: AnalysisPayload,
    /// Retry budget.
    pub max_retries: i32,
}

impl CreateJob {
    /// Build the initial `pending` row for this request.
    pub fn into_job(self, now: DateTime<Utc>) -> Result<Job, serde_json::Error> {
        Ok(Job {
            id: JobId::new(),
            user_id: self.user_id,
            job_type: self.job_type,
            status: JobStatus::Pending,
            payload: serde_json::to_value(&self.payload)?,
            result: None,
            error: None,
            retry_count: 0,
            max_retries: self.max_retries,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::payload::AnalysisProvider;

    fn create() -> CreateJob {
        CreateJob {
            user_id: UserId::new(),
            job_type: JobType::ConversationAnalysis,
            payload: AnalysisPayload {
                file_content: Some("A: hi\nB: hello".into()),
                file_name: Some("chat.txt".into()),
                template_id: None,
                model: Some("claude".into()),
                provider: AnalysisProvider::Anthropic,
            },
            max_retries: 2,
        }
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = create().into_job(Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 0);
        assert!(job.can_retry());
        assert_eq!(
            job.analysis_payload().unwrap().provider,
            AnalysisProvider::Anthropic
        );
    }

    #[test]
    fn test_retry_budget_exhausted() {
        let mut job = create().into_job(Utc::now()).unwrap();
        job.retry_count = 2;
        assert!(!job.can_retry());
    }
}
