//! In-memory cache provider backed by [`BoundedTtlCache`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use charisma_core::config::cache::MemoryCacheConfig;
use charisma_core::result::AppResult;
use charisma_core::traits::cache::CacheProvider;

use super::bounded::BoundedTtlCache;

/// In-memory cache provider.
#[derive(Debug)]
pub struct MemoryCacheProvider {
    cache: Mutex<BoundedTtlCache<String, String>>,
    default_ttl: Duration,
    entry_cap: Duration,
    sweep_interval: Duration,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    ///
    /// `time_to_live_seconds` caps every entry, including those written
    /// with an explicit TTL; `default_ttl_seconds` is used by
    /// [`CacheProvider::set_default`].
    pub fn new(config: &MemoryCacheConfig, default_ttl_seconds: u64) -> Self {
        let entry_cap = Duration::from_secs(config.time_to_live_seconds);
        Self {
            cache: Mutex::new(BoundedTtlCache::new(config.max_capacity, entry_cap)),
            default_ttl: Duration::from_secs(default_ttl_seconds).min(entry_cap),
            entry_cap,
            sweep_interval: Duration::from_secs(config.sweep_interval_seconds.max(1)),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Entries currently held, expired or not.
    pub async fn entry_count(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Drop expired entries; returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let purged = self.cache.lock().await.purge_expired();
        if purged > 0 {
            debug!(purged, "Purged expired cache entries");
        }
        purged
    }

    /// Purge expired entries every [`sweep_interval`](Self::sweep_interval)
    /// until `shutdown` is cancelled.
    pub async fn run_sweeper(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = time::interval_at(
            time::Instant::now() + self.sweep_interval,
            self.sweep_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.purge_expired().await;
                }
            }
        }
        debug!("Cache sweeper stopped");
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut cache = self.cache.lock().await;
        cache.insert_with_ttl(key.to_string(), value.to_string(), ttl.min(self.entry_cap));
        Ok(())
    }

    async fn set_default(&self, key: &str, value: &str) -> AppResult<()> {
        self.set(key, value, self.default_ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.lock().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.lock().await.contains_key(key))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_provider(capacity: usize) -> MemoryCacheProvider {
        let config = MemoryCacheConfig {
            max_capacity: capacity,
            time_to_live_seconds: 60,
            sweep_interval_seconds: 10,
        };
        MemoryCacheProvider::new(&config, 30)
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_get_delete() {
        let provider = make_provider(100);
        provider.set_default("k", "v").await.unwrap();
        assert_eq!(provider.get("k").await.unwrap().as_deref(), Some("v"));
        provider.delete("k").await.unwrap();
        assert!(!provider.exists("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_applies() {
        let provider = make_provider(100);
        provider.set_default("k", "v").await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(provider.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_bound() {
        let provider = make_provider(2);
        provider.set_default("a", "1").await.unwrap();
        provider.set_default("b", "2").await.unwrap();
        provider.set_default("c", "3").await.unwrap();
        assert_eq!(provider.get("a").await.unwrap(), None);
        assert_eq!(provider.purge_expired().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_ttl_is_capped() {
        let provider = make_provider(100);
        provider
            .set("k", "v", Duration::from_secs(3600))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(provider.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_until_cancelled() {
        let provider = Arc::new(make_provider(100));
        provider.set("short", "1", Duration::from_secs(5)).await.unwrap();
        provider.set_default("long", "2").await.unwrap();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&provider).run_sweeper(shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(provider.entry_count().await, 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(provider.entry_count().await, 0);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
