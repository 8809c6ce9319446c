//! Backend selection from configuration.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use charisma_core::config::cache::CacheConfig;
use charisma_core::config::realtime::RealtimeConfig;
use charisma_core::error::AppError;
use charisma_core::result::AppResult;

use crate::memory::{MemoryCacheProvider, MemoryPubSub, MemoryQueueStore};
use crate::provider::CacheManager;
use crate::pubsub::PubSub;
use crate::queue::QueueStore;

/// The cache, queue store, and pub/sub bus chosen by `cache.provider`.
#[derive(Debug, Clone)]
pub struct CacheBackends {
    pub cache: CacheManager,
    pub queue: Arc<dyn QueueStore>,
    pub pubsub: Arc<dyn PubSub>,
    /// Set for the in-memory provider, which needs a periodic sweep.
    memory_cache: Option<Arc<MemoryCacheProvider>>,
}

impl CacheBackends {
    /// Build every backend from configuration.
    ///
    /// `"redis"` shares one connection manager across all three;
    /// `"memory"` keeps everything in this process.
    pub async fn from_config(cache: &CacheConfig, realtime: &RealtimeConfig) -> AppResult<Self> {
        match cache.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                use crate::redis::{RedisCacheProvider, RedisClient, RedisPubSub, RedisQueueStore};

                info!("Initializing Redis cache, queue, and pub/sub");
                let client = RedisClient::connect(&cache.redis).await?;
                Ok(Self {
                    cache: CacheManager::from_provider(Arc::new(RedisCacheProvider::new(
                        client.clone(),
                        cache.default_ttl_seconds,
                    ))),
                    queue: Arc::new(RedisQueueStore::new(client.clone())),
                    pubsub: Arc::new(RedisPubSub::new(client)),
                    memory_cache: None,
                })
            }
            "memory" => {
                info!("Initializing in-memory cache, queue, and pub/sub");
                Ok(Self::in_memory(cache, realtime))
            }
            other => Err(AppError::configuration(format!(
                "Unknown cache provider: '{other}'. Supported: memory, redis"
            ))),
        }
    }

    /// Fresh in-memory backends.
    pub fn in_memory(cache: &CacheConfig, realtime: &RealtimeConfig) -> Self {
        let provider = Arc::new(MemoryCacheProvider::new(
            &cache.memory,
            cache.default_ttl_seconds,
        ));
        Self {
            cache: CacheManager::from_provider(provider.clone()),
            queue: Arc::new(MemoryQueueStore::new()),
            pubsub: Arc::new(MemoryPubSub::new(realtime.channel_buffer_size)),
            memory_cache: Some(provider),
        }
    }

    /// Start the expiry sweep for the in-memory cache.
    ///
    /// Returns `None` when the provider expires keys itself. The task ends
    /// once `shutdown` is cancelled.
    pub fn spawn_sweeper(&self, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        let provider = self.memory_cache.clone()?;
        info!(
            interval_secs = provider.sweep_interval().as_secs(),
            "Starting in-memory cache sweeper"
        );
        Some(tokio::spawn(provider.run_sweeper(shutdown)))
    }
}
