//! In-memory queue store.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use charisma_core::result::AppResult;
use charisma_core::types::id::JobId;
use charisma_entity::job::{QueueCounts, QueueEntry};

use crate::queue::QueueStore;

#[derive(Debug, Default)]
struct Inner {
    pending: VecDeque<QueueEntry>,
    members: HashSet<JobId>,
    processing: HashMap<JobId, DateTime<Utc>>,
    retry: HashMap<JobId, (DateTime<Utc>, QueueEntry)>,
}

/// Queue store kept in process memory. All operations take one lock.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    inner: Mutex<Inner>,
}

impl MemoryQueueStore {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    async fn try_claim(&self, job_id: JobId) -> AppResult<bool> {
        Ok(self.inner.lock().await.members.insert(job_id))
    }

    async fn release(&self, job_id: JobId) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        inner.members.remove(&job_id);
        inner.processing.remove(&job_id);
        Ok(())
    }

    async fn push(&self, entry: &QueueEntry) -> AppResult<()> {
        self.inner.lock().await.pending.push_back(entry.clone());
        Ok(())
    }

    async fn pop(&self) -> AppResult<Option<QueueEntry>> {
        Ok(self.inner.lock().await.pending.pop_front())
    }

    async fn mark_processing(&self, job_id: JobId, started_at: DateTime<Utc>) -> AppResult<()> {
        self.inner.lock().await.processing.insert(job_id, started_at);
        Ok(())
    }

    async fn schedule_retry(&self, entry: &QueueEntry, retry_at: DateTime<Utc>) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        inner.processing.remove(&entry.job_id);
        inner.retry.insert(entry.job_id, (retry_at, entry.clone()));
        Ok(())
    }

    async fn due_retries(&self, now: DateTime<Utc>, limit: usize) -> AppResult<Vec<QueueEntry>> {
        let inner = self.inner.lock().await;
        let mut due: Vec<&(DateTime<Utc>, QueueEntry)> =
            inner.retry.values().filter(|(at, _)| *at <= now).collect();
        due.sort_by_key(|(at, _)| *at);
        Ok(due
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn remove_retry(&self, job_id: JobId) -> AppResult<bool> {
        Ok(self.inner.lock().await.retry.remove(&job_id).is_some())
    }

    async fn counts(&self) -> AppResult<QueueCounts> {
        let inner = self.inner.lock().await;
        Ok(QueueCounts {
            pending: inner.pending.len() as u64,
            processing: inner.processing.len() as u64,
            retrying: inner.retry.len() as u64,
        })
    }
}
