//! In-memory pub/sub for single-node deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use charisma_core::result::AppResult;

use crate::pubsub::{PubSub, PubSubMessage, Subscription};

/// Pub/sub over one `tokio::sync::broadcast` channel per name.
#[derive(Debug)]
pub struct MemoryPubSub {
    channels: RwLock<HashMap<String, broadcast::Sender<PubSubMessage>>>,
    buffer_size: usize,
}

impl MemoryPubSub {
    /// Create a bus whose channels buffer `buffer_size` messages per subscriber.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Current subscriber count on `channel`.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .await
            .get(channel)
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Channels currently tracked.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

#[async_trait]
impl PubSub for MemoryPubSub {
    async fn publish(&self, channel: &str, payload: String) -> AppResult<usize> {
        let message = PubSubMessage {
            channel: channel.to_string(),
            payload,
        };
        let delivered = {
            let channels = self.channels.read().await;
            match channels.get(channel) {
                Some(tx) => tx.send(message).unwrap_or(0),
                None => return Ok(0),
            }
        };
        if delivered == 0 {
            // Every subscriber is gone; forget the channel.
            let mut channels = self.channels.write().await;
            if channels.get(channel).is_some_and(|tx| tx.receiver_count() == 0) {
                channels.remove(channel);
            }
        }
        Ok(delivered)
    }

    async fn subscribe(&self, names: &[String]) -> AppResult<Subscription> {
        let mut channels = self.channels.write().await;
        // Forget channels whose subscribers have all gone.
        channels.retain(|_, tx| tx.receiver_count() > 0);
        let streams = names.iter().map(|name| {
            let tx = channels
                .entry(name.clone())
                .or_insert_with(|| broadcast::channel(self.buffer_size).0);
            let name = name.clone();
            BroadcastStream::new(tx.subscribe()).filter_map(move |item| {
                let name = name.clone();
                async move {
                    match item {
                        Ok(message) => Some(message),
                        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                            warn!(channel = %name, skipped, "Subscriber lagged, messages dropped");
                            None
                        }
                    }
                }
            })
        });
        let merged = futures::stream::select_all(streams.map(Box::pin).collect::<Vec<_>>());
        Ok(Box::pin(merged))
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = MemoryPubSub::new(8);
        assert_eq!(bus.publish("nobody", "{}".into()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_messages_from_all_channels_merged() {
        let bus = MemoryPubSub::new(8);
        let mut sub = bus
            .subscribe(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(bus.publish("a", "1".into()).await.unwrap(), 1);
        assert_eq!(bus.publish("b", "2".into()).await.unwrap(), 1);
        assert_eq!(bus.publish("c", "3".into()).await.unwrap(), 0);

        let mut got = vec![sub.next().await.unwrap(), sub.next().await.unwrap()];
        got.sort_by(|x, y| x.channel.cmp(&y.channel));
        assert_eq!(got[0].payload, "1");
        assert_eq!(got[1].payload, "2");
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let bus = MemoryPubSub::new(8);
        let sub = bus.subscribe(&["a".to_string()]).await.unwrap();
        assert_eq!(bus.subscriber_count("a").await, 1);
        drop(sub);
        assert_eq!(bus.subscriber_count("a").await, 0);
        assert_eq!(bus.publish("a", "x".into()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_channels_pruned_on_subscribe() {
        let bus = MemoryPubSub::new(8);
        let first = bus.subscribe(&["notifications:a".to_string()]).await.unwrap();
        drop(first);
        assert_eq!(bus.channel_count().await, 1);

        let _second = bus.subscribe(&["notifications:b".to_string()]).await.unwrap();
        assert_eq!(bus.channel_count().await, 1);
        assert_eq!(bus.subscriber_count("notifications:b").await, 1);
    }
}
