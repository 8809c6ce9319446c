//! In-memory job store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use charisma_core::result::AppResult;
use charisma_core::types::id::JobId;
use charisma_entity::job::{CreateJob, Job, JobStatus, JobStatusCounts};

use super::Availability;
use crate::store::JobStore;

/// Job rows kept in a map.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    availability: Availability,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend going away or coming back.
    pub fn set_available(&self, available: bool) {
        self.availability.set(available);
    }

    /// Insert a fully formed row, bypassing `create`.
    pub async fn insert_raw(&self, job: Job) {
        self.jobs.write().await.insert(job.id, job);
    }

    /// Apply `f` to the job if its status satisfies `allowed`.
    async fn transition(
        &self,
        id: JobId,
        allowed: impl Fn(&Job) -> bool,
        f: impl FnOnce(&mut Job, DateTime<Utc>),
    ) -> AppResult<Option<Job>> {
        self.availability.check()?;
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        if !allowed(job) {
            return Ok(None);
        }
        let now = Utc::now();
        f(job, now);
        job.updated_at = now;
        Ok(Some(job.clone()))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn health_check(&self) -> AppResult<()> {
        self.availability.check()
    }

    async fn create(&self, data: CreateJob) -> AppResult<Job> {
        self.availability.check()?;
        let job = data.into_job(Utc::now())?;
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        self.availability.check()?;
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn find_pending(&self, limit: usize) -> AppResult<Vec<Job>> {
        self.availability.check()?;
        let jobs = self.jobs.read().await;
        let mut pending: Vec<Job> = jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|job| job.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn find_stuck(&self, started_before: DateTime<Utc>) -> AppResult<Vec<Job>> {
        self.availability.check()?;
        let jobs = self.jobs.read().await;
        let mut stuck: Vec<Job> = jobs
            .values()
            .filter(|job| {
                job.status == JobStatus::Processing
                    && job.started_at.is_some_and(|t| t < started_before)
            })
            .cloned()
            .collect();
        stuck.sort_by_key(|job| job.started_at);
        Ok(stuck)
    }

    async fn mark_queued(&self, id: JobId) -> AppResult<bool> {
        let moved = self
            .transition(
                id,
                |job| job.status.can_transition_to(JobStatus::Queued),
                |job, _| job.status = JobStatus::Queued,
            )
            .await?;
        Ok(moved.is_some())
    }

    async fn mark_processing(&self, id: JobId) -> AppResult<Option<Job>> {
        self.transition(
            id,
            |job| job.status.can_transition_to(JobStatus::Processing),
            |job, now| {
                job.status = JobStatus::Processing;
                job.started_at = Some(now);
            },
        )
        .await
    }

    async fn mark_completed(
        &self,
        id: JobId,
        result: serde_json::Value,
    ) -> AppResult<Option<Job>> {
        self.transition(
            id,
            |job| job.status.can_transition_to(JobStatus::Completed),
            |job, now| {
                job.status = JobStatus::Completed;
                job.result = Some(result);
                job.error = None;
                job.completed_at = Some(now);
            },
        )
        .await
    }

    async fn mark_failed(&self, id: JobId, error: &str) -> AppResult<Option<Job>> {
        self.transition(
            id,
            |job| job.status.can_transition_to(JobStatus::Failed),
            |job, now| {
                job.status = JobStatus::Failed;
                job.error = Some(error.to_string());
                job.completed_at = Some(now);
            },
        )
        .await
    }

    async fn requeue_for_retry(&self, id: JobId) -> AppResult<Option<Job>> {
        self.transition(
            id,
            |job| job.status.can_requeue_for_retry() && job.can_retry(),
            |job, _| {
                job.status = JobStatus::Queued;
                job.retry_count += 1;
                job.started_at = None;
                job.completed_at = None;
            },
        )
        .await
    }

    async fn cancel(&self, id: JobId) -> AppResult<bool> {
        let moved = self
            .transition(
                id,
                |job| job.status.can_transition_to(JobStatus::Canceled),
                |job, now| {
                    job.status = JobStatus::Canceled;
                    job.completed_at = Some(now);
                },
            )
            .await?;
        Ok(moved.is_some())
    }

    async fn count_by_status(&self) -> AppResult<JobStatusCounts> {
        self.availability.check()?;
        let mut counts = JobStatusCounts::default();
        for job in self.jobs.read().await.values() {
            counts.add(job.status, 1);
        }
        Ok(counts)
    }
}
