//! Job repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use charisma_core::error::{AppError, ErrorKind};
use charisma_core::result::AppResult;
use charisma_core::types::id::JobId;
use charisma_entity::job::{CreateJob, Job, JobStatus, JobStatusCounts};

use crate::store::JobStore;

/// Repository for job rows and their status transitions.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}

#[async_trait]
impl JobStore for JobRepository {
    async fn health_check(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::ServiceUnavailable, "Database is not reachable", e)
            })?;
        Ok(())
    }

    async fn create(&self, data: CreateJob) -> AppResult<Job> {
        let job = data.into_job(Utc::now())?;
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (id, user_id, job_type, status, payload, retry_count, max_retries, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(job.id)
        .bind(job.user_id)
        .bind(job.job_type)
        .bind(job.status)
        .bind(&job.payload)
        .bind(job.retry_count)
        .bind(job.max_retries)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to create job"))
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find job"))
    }

    async fn find_pending(&self, limit: usize) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE status = 'pending' ORDER BY created_at ASC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to fetch pending jobs"))
    }

    async fn find_stuck(&self, started_before: DateTime<Utc>) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE status = 'processing' AND started_at < $1 \
             ORDER BY started_at ASC",
        )
        .bind(started_before)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to fetch stuck jobs"))
    }

    async fn mark_queued(&self, id: JobId) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'queued', updated_at = NOW() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to mark job queued"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_processing(&self, id: JobId) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'processing', started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'queued' RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to mark job processing"))
    }

    async fn mark_completed(
        &self,
        id: JobId,
        result: serde_json::Value,
    ) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'completed', result = $2, error = NULL, \
             completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'processing' RETURNING *",
        )
        .bind(id)
        .bind(result)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to complete job"))
    }

    async fn mark_failed(&self, id: JobId, error: &str) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'failed', error = $2, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'processing' RETURNING *",
        )
        .bind(id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to mark job failed"))
    }

    async fn requeue_for_retry(&self, id: JobId) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'queued', retry_count = retry_count + 1, \
             started_at = NULL, completed_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status IN ('processing', 'failed') \
             AND retry_count < max_retries RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to requeue job"))
    }

    async fn cancel(&self, id: JobId) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'canceled', completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status IN ('pending', 'queued')",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to cancel job"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn count_by_status(&self) -> AppResult<JobStatusCounts> {
        let rows = sqlx::query_as::<_, (JobStatus, i64)>(
            "SELECT status, COUNT(*) FROM jobs GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to count jobs"))?;

        let mut counts = JobStatusCounts::default();
        for (status, count) in rows {
            counts.add(status, count.max(0) as u64);
        }
        Ok(counts)
    }
}
