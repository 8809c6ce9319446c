//! # charisma-cache
//!
//! Key-value backends for the CharismaAI job and notification core:
//!
//! - **cache**: the [`CacheProvider`](charisma_core::traits::CacheProvider)
//!   used for short-lived values such as unread counts
//! - **queue**: the [`QueueStore`] holding job references, the processing
//!   set, and the retry set
//! - **pub/sub**: the [`PubSub`] bus carrying stream events between
//!   publishers and open stream sessions
//!
//! Each has a Redis implementation for multi-node deployments and an
//! in-memory one for single-node use and tests. [`CacheBackends`] picks
//! them from `cache.provider`.

pub mod backend;
pub mod keys;
pub mod memory;
pub mod provider;
pub mod pubsub;
pub mod queue;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use backend::CacheBackends;
pub use provider::CacheManager;
pub use pubsub::{PubSub, PubSubMessage, Subscription};
pub use queue::QueueStore;
