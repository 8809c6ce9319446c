//! Queue adapter: the only component that moves job references in and out
//! of the queue store.
//!
//! The job store stays the source of truth for status; the queue store
//! only routes. Every step checks the job store's conditional update
//! before touching the queue, so concurrent drainers or workers cannot
//! double-enqueue or double-claim a job.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use charisma_cache::queue::QueueStore;
use charisma_core::config::queue::QueueConfig;
use charisma_core::error::AppError;
use charisma_core::result::AppResult;
use charisma_core::types::id::JobId;
use charisma_database::store::JobStore;
use charisma_entity::job::{Job, JobStatus, QueueEntry, QueueStats};
use charisma_entity::notification::{CreateNotification, NotificationKind};
use charisma_realtime::notification::NotificationFanout;
use charisma_realtime::publisher::EventPublisher;

/// How often a failed job is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            base_delay: Duration::from_secs(config.retry_base_delay_seconds),
            max_delay: Duration::from_secs(config.retry_max_delay_seconds),
        }
    }

    /// `base × 2^retry_count`, capped at `max_delay`.
    pub fn delay_for(&self, retry_count: i32) -> Duration {
        let exponent = u32::try_from(retry_count).unwrap_or(0);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Result of [`QueueAdapter::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnqueueOutcome {
    /// A new queue entry was written.
    Queued,
    /// The job already had an entry; nothing was written.
    AlreadyQueued,
}

/// What happened to a job handed to [`QueueAdapter::fail`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// A retry is scheduled for `retry_at`.
    RetryScheduled { retry_at: DateTime<Utc> },
    /// Retries are exhausted; the job stays failed.
    Failed,
}

#[derive(Debug, Clone)]
pub struct QueueAdapter {
    jobs: Arc<dyn JobStore>,
    queue: Arc<dyn QueueStore>,
    publisher: EventPublisher,
    notifications: Option<NotificationFanout>,
    retry: RetryPolicy,
    stuck_timeout: Duration,
}

impl QueueAdapter {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        queue: Arc<dyn QueueStore>,
        publisher: EventPublisher,
        config: &QueueConfig,
    ) -> Self {
        Self {
            jobs,
            queue,
            publisher,
            notifications: None,
            retry: RetryPolicy::from_config(config),
            stuck_timeout: Duration::from_secs(config.stuck_timeout_seconds),
        }
    }

    /// Notify job owners when analyses finish or jobs fail for good.
    pub fn with_notifications(mut self, fanout: NotificationFanout) -> Self {
        self.notifications = Some(fanout);
        self
    }

    pub fn jobs(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    pub fn queue(&self) -> &Arc<dyn QueueStore> {
        &self.queue
    }

    // ── Producer side ──────────────────────────────────────

    /// Put a pending job on the queue and mark it `queued`.
    ///
    /// A job that already has a queue entry is reported as
    /// [`EnqueueOutcome::AlreadyQueued`] without writing a second one.
    pub async fn enqueue(&self, job: &Job) -> AppResult<EnqueueOutcome> {
        if !self.queue.try_claim(job.id).await? {
            debug!(job_id = %job.id, "Job already queued");
            return Ok(EnqueueOutcome::AlreadyQueued);
        }

        let entry = QueueEntry::for_job(job, Utc::now());
        if let Err(e) = self.queue.push(&entry).await {
            if let Err(release_err) = self.queue.release(job.id).await {
                warn!(job_id = %job.id, error = %release_err, "Failed to release queue claim");
            }
            return Err(e);
        }

        // The entry is already visible to workers. If the status change
        // does not apply, `claim` skips and releases the orphan.
        if !self.jobs.mark_queued(job.id).await? {
            return Err(AppError::conflict(format!(
                "Job {} is no longer pending",
                job.id
            )));
        }

        info!(job_id = %job.id, job_type = %job.job_type, "Job enqueued");
        Ok(EnqueueOutcome::Queued)
    }

    /// Move retries whose delay has elapsed back onto the queue.
    ///
    /// Returns how many jobs were re-queued. A retry that cannot be
    /// completed keeps its retry record, so the next pass picks it up.
    pub async fn process_retries(&self, limit: usize) -> AppResult<usize> {
        let now = Utc::now();
        let due = self.queue.due_retries(now, limit).await?;
        let mut requeued = 0;

        for entry in due {
            // Removing the retry record is the per-job lock between
            // concurrent drainers.
            if !self.queue.remove_retry(entry.job_id).await? {
                continue;
            }
            match self.requeue(&entry, now).await {
                Ok(true) => requeued += 1,
                Ok(false) => {}
                Err(e) => {
                    if let Err(restore_err) = self.queue.schedule_retry(&entry, now).await {
                        warn!(
                            job_id = %entry.job_id,
                            error = %restore_err,
                            "Failed to restore retry record"
                        );
                    }
                    return Err(e);
                }
            }
        }

        Ok(requeued)
    }

    async fn requeue(&self, entry: &QueueEntry, now: DateTime<Utc>) -> AppResult<bool> {
        let job = match self.jobs.requeue_for_retry(entry.job_id).await? {
            Some(job) => job,
            None => match self.jobs.find_by_id(entry.job_id).await? {
                // Requeued on an earlier pass whose push never landed.
                Some(job) if job.status == JobStatus::Queued => job,
                _ => {
                    warn!(job_id = %entry.job_id, "Retry no longer applicable, releasing");
                    self.queue.release(entry.job_id).await?;
                    return Ok(false);
                }
            },
        };

        self.queue.push(&QueueEntry::for_job(&job, now)).await?;
        self.publish_update(&job).await;
        info!(job_id = %job.id, attempt = job.retry_count + 1, "Job re-queued for retry");
        Ok(true)
    }

    /// Fail `processing` jobs that exceeded the processing-time threshold.
    ///
    /// Returns how many jobs were failed.
    pub async fn cleanup_stuck_jobs(&self) -> AppResult<usize> {
        let cutoff = shift(Utc::now(), self.stuck_timeout, false);
        let stuck = self.jobs.find_stuck(cutoff).await?;
        let mut failed = 0;

        for job in stuck {
            let message = format!(
                "Job exceeded the processing time limit of {}s",
                self.stuck_timeout.as_secs()
            );
            if let Some(job) = self.jobs.mark_failed(job.id, &message).await? {
                self.queue.release(job.id).await?;
                self.publish_update(&job).await;
                warn!(job_id = %job.id, "Stuck job marked failed");
                failed += 1;
            }
        }

        Ok(failed)
    }

    /// Queue and job-store counts.
    pub async fn get_stats(&self) -> AppResult<QueueStats> {
        let queue = self.queue.counts().await?;
        let jobs = self.jobs.count_by_status().await?;
        Ok(QueueStats { queue, jobs })
    }

    // ── Worker side ────────────────────────────────────────

    /// Take the next runnable job, marking it `processing`.
    ///
    /// Entries whose job is no longer `queued` are released and skipped.
    pub async fn claim(&self) -> AppResult<Option<(QueueEntry, Job)>> {
        while let Some(entry) = self.queue.pop().await? {
            match self.jobs.mark_processing(entry.job_id).await? {
                Some(job) => {
                    let started_at = job.started_at.unwrap_or_else(Utc::now);
                    self.queue.mark_processing(job.id, started_at).await?;
                    self.publish_update(&job).await;
                    debug!(job_id = %job.id, attempt = entry.attempt, "Job claimed");
                    return Ok(Some((entry, job)));
                }
                None => {
                    debug!(job_id = %entry.job_id, "Skipping stale queue entry");
                    self.queue.release(entry.job_id).await?;
                }
            }
        }
        Ok(None)
    }

    /// Record a successful run.
    pub async fn complete(&self, job_id: JobId, result: serde_json::Value) -> AppResult<Job> {
        let job = self
            .jobs
            .mark_completed(job_id, result)
            .await?
            .ok_or_else(|| AppError::conflict(format!("Job {job_id} is not processing")))?;
        self.queue.release(job_id).await?;

        self.publish_update(&job).await;
        if job.job_type.produces_analysis() {
            if let Err(e) = self.publisher.analysis_complete(&job).await {
                warn!(job_id = %job_id, error = %e, "Failed to publish analysis completion");
            }
            self.notify_owner(
                &job,
                NotificationKind::AnalysisComplete,
                "Analysis complete",
                "Your conversation analysis is ready.".to_string(),
            )
            .await;
        }

        info!(job_id = %job_id, job_type = %job.job_type, "Job completed");
        Ok(job)
    }

    /// Record a failed run, scheduling a retry while the budget allows.
    pub async fn fail(&self, job_id: JobId, error: &str) -> AppResult<FailureOutcome> {
        let job = self
            .jobs
            .mark_failed(job_id, error)
            .await?
            .ok_or_else(|| AppError::conflict(format!("Job {job_id} is not processing")))?;

        let outcome = if job.can_retry() {
            let delay = self.retry.delay_for(job.retry_count);
            let retry_at = shift(Utc::now(), delay, true);
            let entry = QueueEntry::for_job(&job, Utc::now());
            match self.queue.schedule_retry(&entry, retry_at).await {
                Ok(()) => {
                    info!(
                        job_id = %job_id,
                        retry_count = job.retry_count,
                        delay_secs = delay.as_secs(),
                        "Job failed, retry scheduled"
                    );
                    FailureOutcome::RetryScheduled { retry_at }
                }
                Err(e) => {
                    // Without a retry record nothing would pick the job up again.
                    warn!(job_id = %job_id, error = %e, "Could not schedule retry, failing job");
                    self.fail_permanently(&job, error).await?
                }
            }
        } else {
            self.fail_permanently(&job, error).await?
        };

        self.publish_update(&job).await;
        Ok(outcome)
    }

    async fn fail_permanently(&self, job: &Job, error: &str) -> AppResult<FailureOutcome> {
        self.queue.release(job.id).await?;
        warn!(job_id = %job.id, error, "Job failed permanently");
        self.notify_owner(
            job,
            NotificationKind::JobFailed,
            "Analysis failed",
            format!("Your analysis could not be completed: {error}"),
        )
        .await;
        Ok(FailureOutcome::Failed)
    }

    async fn publish_update(&self, job: &Job) {
        if let Err(e) = self.publisher.job_update(job).await {
            warn!(job_id = %job.id, error = %e, "Failed to publish job update");
        }
    }

    async fn notify_owner(&self, job: &Job, kind: NotificationKind, title: &str, message: String) {
        let Some(fanout) = &self.notifications else {
            return;
        };
        let request = CreateNotification::to_user(job.user_id, kind, title, message)
            .with_metadata(serde_json::json!({
                "job_id": job.id,
                "job_type": job.job_type,
            }));
        match fanout.send_to_user(job.user_id, request).await {
            Ok(result) if !result.success => {
                warn!(job_id = %job.id, error = ?result.error, "Job notification not delivered");
            }
            Ok(_) => {}
            Err(e) => warn!(job_id = %job.id, error = %e, "Job notification rejected"),
        }
    }
}

/// Move `at` by `by`, saturating at the representable range.
fn shift(at: DateTime<Utc>, by: Duration, forward: bool) -> DateTime<Utc> {
    let shifted = chrono::Duration::from_std(by).ok().and_then(|by| {
        if forward {
            at.checked_add_signed(by)
        } else {
            at.checked_sub_signed(by)
        }
    });
    match (shifted, forward) {
        (Some(at), _) => at,
        (None, true) => DateTime::<Utc>::MAX_UTC,
        (None, false) => DateTime::<Utc>::MIN_UTC,
    }
}
