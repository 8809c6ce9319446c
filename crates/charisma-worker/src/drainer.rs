//! Cron drainer: one pass of retry handling, stuck-job cleanup, and
//! enqueueing pending jobs.
//!
//! Callers authenticate the trigger before calling [`CronDrainer::drain`];
//! the drainer itself only checks that the job store is reachable.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use charisma_core::config::queue::QueueConfig;
use charisma_core::error::AppError;
use charisma_core::result::AppResult;
use charisma_core::types::id::JobId;
use charisma_entity::job::QueueStats;

use crate::queue::{EnqueueOutcome, QueueAdapter};

/// Per-job result of a drain pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Queued,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobOutcome {
    fn queued(job_id: JobId, message: Option<String>) -> Self {
        Self {
            job_id,
            status: OutcomeStatus::Queued,
            message,
        }
    }

    fn error(job_id: JobId, message: String) -> Self {
        Self {
            job_id,
            status: OutcomeStatus::Error,
            message: Some(message),
        }
    }
}

/// Aggregate result of a drain pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainReport {
    /// Pending jobs handled in this pass.
    pub processed: usize,
    pub results: Vec<JobOutcome>,
    pub retries_requeued: usize,
    pub stuck_failed: usize,
    /// Non-fatal failures of the retry and cleanup steps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub stats: Option<QueueStats>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl DrainReport {
    /// Outcomes with status `error`.
    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == OutcomeStatus::Error)
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct CronDrainer {
    adapter: QueueAdapter,
    batch_size: usize,
}

impl CronDrainer {
    pub fn new(adapter: QueueAdapter, config: &QueueConfig) -> Self {
        Self {
            adapter,
            batch_size: config.batch_size.max(1),
        }
    }

    pub fn adapter(&self) -> &QueueAdapter {
        &self.adapter
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run one pass.
    ///
    /// Fails with `ServiceUnavailable` before touching anything when the
    /// job store is unreachable. A job that cannot be enqueued is recorded
    /// in the report and the batch continues.
    pub async fn drain(&self) -> AppResult<DrainReport> {
        let started_at = Utc::now();
        let timer = Instant::now();

        if let Err(e) = self.adapter.jobs().health_check().await {
            error!(error = %e, "Job store unreachable, skipping drain");
            return Err(AppError::service_unavailable(format!(
                "Database not connected: {}",
                e.message
            )));
        }

        let mut errors = Vec::new();

        let retries_requeued = match self.adapter.process_retries(self.batch_size).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Retry processing failed");
                errors.push(format!("Retry processing failed: {}", e.message));
                0
            }
        };

        let stuck_failed = match self.adapter.cleanup_stuck_jobs().await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Stuck job cleanup failed");
                errors.push(format!("Stuck job cleanup failed: {}", e.message));
                0
            }
        };

        let pending = self.adapter.jobs().find_pending(self.batch_size).await?;
        let mut results = Vec::with_capacity(pending.len());
        for job in &pending {
            let outcome = match self.adapter.enqueue(job).await {
                Ok(EnqueueOutcome::Queued) => JobOutcome::queued(job.id, None),
                Ok(EnqueueOutcome::AlreadyQueued) => {
                    JobOutcome::queued(job.id, Some("Already queued".to_string()))
                }
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "Failed to enqueue job");
                    JobOutcome::error(job.id, e.message)
                }
            };
            results.push(outcome);
        }

        let stats = match self.adapter.get_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %e, "Failed to collect queue stats");
                errors.push(format!("Stats unavailable: {}", e.message));
                None
            }
        };

        let report = DrainReport {
            processed: results.len(),
            results,
            retries_requeued,
            stuck_failed,
            errors,
            stats,
            started_at,
            duration_ms: u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        info!(
            processed = report.processed,
            failed = report.failed(),
            retries_requeued,
            stuck_failed,
            duration_ms = report.duration_ms,
            "Drain pass finished"
        );
        Ok(report)
    }
}
