//! Redis backends.

pub mod client;
pub mod operations;
pub mod pubsub;
pub mod queue;

pub use client::RedisClient;
pub use operations::RedisCacheProvider;
pub use pubsub::RedisPubSub;
pub use queue::RedisQueueStore;

use charisma_core::error::{AppError, ErrorKind};

/// Map a Redis error to an [`AppError`].
pub(crate) fn map_err(e: redis::RedisError) -> AppError {
    AppError::with_source(ErrorKind::Cache, format!("Redis error: {e}"), e)
}
