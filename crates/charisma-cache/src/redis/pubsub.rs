//! Redis pub/sub for multi-node deployments.

use async_trait::async_trait;
use futures::StreamExt;
use tracing::warn;

use charisma_core::error::{AppError, ErrorKind};
use charisma_core::result::AppResult;

use super::client::RedisClient;
use super::map_err;
use crate::pubsub::{PubSub, PubSubMessage, Subscription};

/// Pub/sub over Redis `PUBLISH`/`SUBSCRIBE`.
///
/// Each subscription owns a dedicated connection, closed when the
/// subscription is dropped.
#[derive(Debug, Clone)]
pub struct RedisPubSub {
    client: RedisClient,
}

impl RedisPubSub {
    /// Create a bus on an existing client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PubSub for RedisPubSub {
    async fn publish(&self, channel: &str, payload: String) -> AppResult<usize> {
        let mut conn = self.client.conn();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(self.client.prefixed_key(channel))
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(receivers.max(0) as usize)
    }

    async fn subscribe(&self, channels: &[String]) -> AppResult<Subscription> {
        let mut pubsub = self.client.client().get_async_pubsub().await.map_err(|e| {
            AppError::with_source(ErrorKind::ServiceUnavailable, "Redis pub/sub unreachable", e)
        })?;
        for channel in channels {
            pubsub
                .subscribe(self.client.prefixed_key(channel))
                .await
                .map_err(map_err)?;
        }

        let client = self.client.clone();
        let stream = pubsub.into_on_message().filter_map(move |msg| {
            let channel = client.unprefixed(msg.get_channel_name()).to_string();
            let payload = msg.get_payload::<String>();
            async move {
                match payload {
                    Ok(payload) => Some(PubSubMessage { channel, payload }),
                    Err(e) => {
                        warn!(%channel, error = %e, "Dropping non-text pub/sub payload");
                        None
                    }
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> AppResult<()> {
        self.client.ping().await
    }
}
