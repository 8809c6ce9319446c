//! Redis queue store.
//!
//! Layout (all keys prefixed):
//!
//! | key                    | type | content                               |
//! |------------------------|------|---------------------------------------|
//! | `queue:pending`        | LIST | JSON entries, RPUSH / LPOP            |
//! | `queue:members`        | SET  | job ids held by the queue             |
//! | `queue:processing`     | ZSET | job id → claim time (ms)              |
//! | `queue:retry`          | ZSET | job id → retry-at time (ms)           |
//! | `queue:retry:entries`  | HASH | job id → JSON entry                   |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use charisma_core::result::AppResult;
use charisma_core::types::id::JobId;
use charisma_entity::job::{QueueCounts, QueueEntry};

use super::client::RedisClient;
use super::map_err;
use crate::keys;
use crate::queue::QueueStore;

/// Queue store over Redis lists, sets, and sorted sets.
#[derive(Debug, Clone)]
pub struct RedisQueueStore {
    client: RedisClient,
}

impl RedisQueueStore {
    /// Create a queue store on an existing client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn key(&self, key: &str) -> String {
        self.client.prefixed_key(key)
    }
}

fn decode(raw: &str) -> Option<QueueEntry> {
    match serde_json::from_str(raw) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(error = %e, "Dropping malformed queue entry");
            None
        }
    }
}

/// Pair retry ids with their stored entries. Ids whose entry is missing
/// or malformed come back in the second list.
fn split_retries(ids: &[String], raw: Vec<Option<String>>) -> (Vec<QueueEntry>, Vec<String>) {
    let mut entries = Vec::with_capacity(ids.len());
    let mut unreadable = Vec::new();
    for (id, value) in ids.iter().zip(raw) {
        match value.as_deref().and_then(decode) {
            Some(entry) => entries.push(entry),
            None => unreadable.push(id.clone()),
        }
    }
    (entries, unreadable)
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn health_check(&self) -> AppResult<()> {
        self.client.ping().await
    }

    async fn try_claim(&self, job_id: JobId) -> AppResult<bool> {
        let mut conn = self.client.conn();
        let added: i64 = redis::cmd("SADD")
            .arg(self.key(keys::QUEUE_MEMBERS))
            .arg(job_id.to_string())
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(added == 1)
    }

    async fn release(&self, job_id: JobId) -> AppResult<()> {
        let mut conn = self.client.conn();
        let id = job_id.to_string();
        redis::pipe()
            .atomic()
            .cmd("SREM")
            .arg(self.key(keys::QUEUE_MEMBERS))
            .arg(&id)
            .ignore()
            .cmd("ZREM")
            .arg(self.key(keys::QUEUE_PROCESSING))
            .arg(&id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_err)
    }

    async fn push(&self, entry: &QueueEntry) -> AppResult<()> {
        let mut conn = self.client.conn();
        let json = serde_json::to_string(entry)?;
        redis::cmd("RPUSH")
            .arg(self.key(keys::QUEUE_PENDING))
            .arg(json)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn pop(&self) -> AppResult<Option<QueueEntry>> {
        let mut conn = self.client.conn();
        loop {
            let raw: Option<String> = redis::cmd("LPOP")
                .arg(self.key(keys::QUEUE_PENDING))
                .query_async(&mut conn)
                .await
                .map_err(map_err)?;
            match raw {
                None => return Ok(None),
                Some(raw) => {
                    if let Some(entry) = decode(&raw) {
                        return Ok(Some(entry));
                    }
                }
            }
        }
    }

    async fn mark_processing(&self, job_id: JobId, started_at: DateTime<Utc>) -> AppResult<()> {
        let mut conn = self.client.conn();
        redis::cmd("ZADD")
            .arg(self.key(keys::QUEUE_PROCESSING))
            .arg(started_at.timestamp_millis())
            .arg(job_id.to_string())
            .query_async::<i64>(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn schedule_retry(&self, entry: &QueueEntry, retry_at: DateTime<Utc>) -> AppResult<()> {
        let mut conn = self.client.conn();
        let id = entry.job_id.to_string();
        let json = serde_json::to_string(entry)?;
        redis::pipe()
            .atomic()
            .cmd("ZREM")
            .arg(self.key(keys::QUEUE_PROCESSING))
            .arg(&id)
            .ignore()
            .cmd("HSET")
            .arg(self.key(keys::QUEUE_RETRY_ENTRIES))
            .arg(&id)
            .arg(json)
            .ignore()
            .cmd("ZADD")
            .arg(self.key(keys::QUEUE_RETRY))
            .arg(retry_at.timestamp_millis())
            .arg(&id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_err)
    }

    async fn due_retries(&self, now: DateTime<Utc>, limit: usize) -> AppResult<Vec<QueueEntry>> {
        let mut conn = self.client.conn();
        let ids: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(self.key(keys::QUEUE_RETRY))
            .arg("-inf")
            .arg(now.timestamp_millis())
            .arg("LIMIT")
            .arg(0)
            .arg(limit)
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(self.key(keys::QUEUE_RETRY_ENTRIES))
            .arg(&ids)
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        let (entries, unreadable) = split_retries(&ids, raw);
        if !unreadable.is_empty() {
            warn!(count = unreadable.len(), "Removing unreadable retry records");
            redis::pipe()
                .atomic()
                .cmd("ZREM")
                .arg(self.key(keys::QUEUE_RETRY))
                .arg(&unreadable)
                .ignore()
                .cmd("HDEL")
                .arg(self.key(keys::QUEUE_RETRY_ENTRIES))
                .arg(&unreadable)
                .ignore()
                .query_async::<()>(&mut conn)
                .await
                .map_err(map_err)?;
        }
        Ok(entries)
    }

    async fn remove_retry(&self, job_id: JobId) -> AppResult<bool> {
        let mut conn = self.client.conn();
        let id = job_id.to_string();
        let (removed,): (i64,) = redis::pipe()
            .atomic()
            .cmd("ZREM")
            .arg(self.key(keys::QUEUE_RETRY))
            .arg(&id)
            .cmd("HDEL")
            .arg(self.key(keys::QUEUE_RETRY_ENTRIES))
            .arg(&id)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(removed == 1)
    }

    async fn counts(&self) -> AppResult<QueueCounts> {
        let mut conn = self.client.conn();
        let (pending, processing, retrying): (u64, u64, u64) = redis::pipe()
            .cmd("LLEN")
            .arg(self.key(keys::QUEUE_PENDING))
            .cmd("ZCARD")
            .arg(self.key(keys::QUEUE_PROCESSING))
            .cmd("ZCARD")
            .arg(self.key(keys::QUEUE_RETRY))
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(QueueCounts {
            pending,
            processing,
            retrying,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charisma_core::types::id::UserId;
    use charisma_entity::job::JobType;

    #[test]
    fn test_split_retries_flags_missing_and_malformed() {
        let entry = QueueEntry {
            job_id: JobId::new(),
            user_id: UserId::new(),
            job_type: JobType::ConversationAnalysis,
            enqueued_at: Utc::now(),
            attempt: 2,
        };
        let ids = vec![
            entry.job_id.to_string(),
            "missing".to_string(),
            "garbled".to_string(),
        ];
        let raw = vec![
            Some(serde_json::to_string(&entry).unwrap()),
            None,
            Some("{not json".to_string()),
        ];

        let (entries, unreadable) = split_retries(&ids, raw);
        assert_eq!(entries, vec![entry]);
        assert_eq!(unreadable, vec!["missing".to_string(), "garbled".to_string()]);
    }
}
