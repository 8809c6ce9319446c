//! In-process backends for single-node deployments and tests.

pub mod bounded;
pub mod cache;
pub mod pubsub;
pub mod queue;

pub use bounded::BoundedTtlCache;
pub use cache::MemoryCacheProvider;
pub use pubsub::MemoryPubSub;
pub use queue::MemoryQueueStore;
