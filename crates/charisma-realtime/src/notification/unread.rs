//! Cached unread notification counts.
//!
//! Counts live in the cache provider under a per-user key that embeds the
//! current broadcast generation. Sends and reads for one user delete that
//! user's key; a broadcast bumps the generation, which orphans every
//! user's key at once. Cache failures are logged and fall through to the
//! store.

use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use charisma_cache::CacheManager;
use charisma_cache::keys;
use charisma_core::traits::cache::CacheProvider;
use charisma_core::types::id::UserId;

/// Lifetime of a cached count.
const COUNT_TTL: Duration = Duration::from_secs(30);

/// Lifetime of the broadcast generation marker. Must exceed [`COUNT_TTL`]
/// so an expired marker can never resurrect a stale count.
const GENERATION_TTL: Duration = Duration::from_secs(3600);

const INITIAL_GENERATION: &str = "0";

#[derive(Debug, Clone)]
pub struct UnreadCounter {
    cache: CacheManager,
}

impl UnreadCounter {
    pub fn new(cache: CacheManager) -> Self {
        Self { cache }
    }

    /// Cached count for `user_id`, if any.
    pub async fn cached(&self, user_id: UserId) -> Option<u64> {
        let key = self.key(user_id).await;
        match self.cache.get(&key).await {
            Ok(value) => value.and_then(|raw| raw.parse().ok()),
            Err(e) => {
                warn!(error = %e, %user_id, "Unread count cache read failed");
                None
            }
        }
    }

    /// Remember `count` for `user_id`.
    pub async fn store(&self, user_id: UserId, count: u64) {
        let key = self.key(user_id).await;
        if let Err(e) = self.cache.set(&key, &count.to_string(), COUNT_TTL).await {
            warn!(error = %e, %user_id, "Unread count cache write failed");
        }
    }

    /// Drop the cached count for `user_id`.
    pub async fn invalidate(&self, user_id: UserId) {
        let key = self.key(user_id).await;
        if let Err(e) = self.cache.delete(&key).await {
            warn!(error = %e, %user_id, "Unread count cache invalidation failed");
        }
    }

    /// Invalidate every user's cached count.
    pub async fn invalidate_all(&self) {
        let generation = Uuid::now_v7().simple().to_string();
        if let Err(e) = self
            .cache
            .set(keys::BROADCAST_GENERATION, &generation, GENERATION_TTL)
            .await
        {
            warn!(error = %e, "Broadcast generation bump failed");
        }
    }

    async fn key(&self, user_id: UserId) -> String {
        let generation = match self.cache.get(keys::BROADCAST_GENERATION).await {
            Ok(Some(generation)) => generation,
            Ok(None) => INITIAL_GENERATION.to_string(),
            Err(e) => {
                warn!(error = %e, "Broadcast generation read failed");
                INITIAL_GENERATION.to_string()
            }
        };
        keys::unread_notification_count(user_id, &generation)
    }
}
