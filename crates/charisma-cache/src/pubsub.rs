//! Pub/sub bus trait.

use std::fmt::Debug;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use charisma_core::result::AppResult;

/// A message received on a subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubSubMessage {
    /// Channel name without the backend key prefix.
    pub channel: String,
    /// Raw payload, JSON by convention.
    pub payload: String,
}

/// Live stream of messages for a set of channels.
///
/// Dropping it unsubscribes from every channel.
pub type Subscription = Pin<Box<dyn Stream<Item = PubSubMessage> + Send>>;

/// Fire-and-forget message bus.
#[async_trait]
pub trait PubSub: Send + Sync + Debug + 'static {
    /// Publish `payload` on `channel`, returning how many subscribers received it.
    async fn publish(&self, channel: &str, payload: String) -> AppResult<usize>;

    /// Subscribe to every channel in `channels` at once.
    async fn subscribe(&self, channels: &[String]) -> AppResult<Subscription>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<()>;
}
