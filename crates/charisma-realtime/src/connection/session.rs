//! Stream session lifecycle.
//!
//! A session moves `Connecting → Open → Closed`. While open, a relay task
//! forwards bus messages meant for the session's user and writes a
//! heartbeat every interval. The client side holds a [`StreamSession`];
//! dropping it cancels the relay synchronously, so no heartbeat is written
//! after the client has gone.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::Utc;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use charisma_cache::pubsub::{PubSub, Subscription};
use charisma_core::config::realtime::RealtimeConfig;
use charisma_core::error::AppError;
use charisma_core::result::AppResult;
use charisma_core::types::id::UserId;

use super::heartbeat;
use super::registry::{SessionInfo, SessionStats, StreamRegistry};
use crate::channel::subscriber_channels;
use crate::message::{ChannelEnvelope, StreamEvent};

/// Lifecycle of a stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

/// Opens stream sessions against the pub/sub bus.
#[derive(Debug, Clone)]
pub struct StreamHub {
    pubsub: Arc<dyn PubSub>,
    registry: Arc<StreamRegistry>,
    heartbeat_interval: Duration,
    buffer_size: usize,
}

impl StreamHub {
    pub fn new(pubsub: Arc<dyn PubSub>, config: &RealtimeConfig) -> Self {
        Self {
            pubsub,
            registry: Arc::new(StreamRegistry::new()),
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_seconds),
            buffer_size: config.channel_buffer_size.max(1),
        }
    }

    /// Open sessions, for health reporting.
    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Subscribe to the user's channel set and start relaying.
    ///
    /// The first event yielded is always `connected`.
    pub async fn open(&self, user_id: UserId) -> AppResult<StreamSession> {
        let session_id = Uuid::new_v4();
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);

        let subscription = match self.pubsub.subscribe(&subscriber_channels(user_id)).await {
            Ok(subscription) => subscription,
            Err(e) => {
                state_tx.send_replace(SessionState::Closed);
                warn!(%session_id, %user_id, error = %e, "Stream subscription failed");
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::channel(self.buffer_size);
        tx.send(StreamEvent::connected(session_id, user_id))
            .await
            .map_err(|_| AppError::internal("Stream closed before it opened"))?;

        let stats = Arc::new(SessionStats::default());
        self.registry.register(SessionInfo {
            id: session_id,
            user_id,
            opened_at: Utc::now(),
            stats: stats.clone(),
        });

        let cancel = CancellationToken::new();
        state_tx.send_replace(SessionState::Open);
        info!(%session_id, %user_id, "Stream session opened");

        tokio::spawn(
            Relay {
                session_id,
                user_id,
                subscription,
                tx,
                cancel: cancel.clone(),
                heartbeat_interval: self.heartbeat_interval,
                registry: self.registry.clone(),
                stats: stats.clone(),
                state: state_tx,
            }
            .run(),
        );

        Ok(StreamSession {
            id: session_id,
            user_id,
            events: ReceiverStream::new(rx),
            state: state_rx,
            stats,
            _cancel_on_drop: cancel.drop_guard(),
        })
    }
}

/// Client half of a session: a stream of events to write out.
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    user_id: UserId,
    events: ReceiverStream<StreamEvent>,
    state: watch::Receiver<SessionState>,
    stats: Arc<SessionStats>,
    _cancel_on_drop: DropGuard,
}

impl StreamSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch the lifecycle; outlives the session itself.
    pub fn state_watcher(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Counters for this session; outlive the session itself.
    pub fn stats(&self) -> Arc<SessionStats> {
        self.stats.clone()
    }
}

impl Stream for StreamSession {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }
}

struct Relay {
    session_id: Uuid,
    user_id: UserId,
    subscription: Subscription,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    heartbeat_interval: Duration,
    registry: Arc<StreamRegistry>,
    stats: Arc<SessionStats>,
    state: watch::Sender<SessionState>,
}

impl Relay {
    async fn run(mut self) {
        let mut ticker = heartbeat::ticker(self.heartbeat_interval);

        let reason = loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break "client disconnected",

                message = self.subscription.next() => {
                    let Some(message) = message else {
                        break "subscription ended";
                    };
                    let envelope = match ChannelEnvelope::decode(&message.payload) {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            warn!(
                                session_id = %self.session_id,
                                channel = %message.channel,
                                error = %e,
                                "Dropping malformed stream message"
                            );
                            continue;
                        }
                    };
                    if !envelope.is_for(self.user_id) {
                        continue;
                    }
                    if self.tx.send(envelope.event).await.is_err() {
                        break "client disconnected";
                    }
                    self.stats.record_relayed();
                }

                _ = ticker.tick() => {
                    if self.tx.send(StreamEvent::heartbeat()).await.is_err() {
                        break "client disconnected";
                    }
                    self.stats.record_heartbeat();
                    debug!(session_id = %self.session_id, "Heartbeat sent");
                }
            }
        };

        // Unsubscribe before reporting closed.
        drop(self.subscription);
        self.registry.remove(self.session_id);
        self.state.send_replace(SessionState::Closed);
        info!(
            session_id = %self.session_id,
            user_id = %self.user_id,
            reason,
            heartbeats = self.stats.heartbeats(),
            relayed = self.stats.relayed(),
            "Stream session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charisma_cache::keys;
    use charisma_cache::memory::MemoryPubSub;
    use charisma_entity::notification::{CreateNotification, NotificationKind};

    use crate::publisher::EventPublisher;

    fn hub(bus: Arc<MemoryPubSub>) -> StreamHub {
        StreamHub::new(bus, &RealtimeConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_then_heartbeat() {
        let hub = hub(Arc::new(MemoryPubSub::new(16)));
        let user = UserId::new();
        let mut session = hub.open(user).await.unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(hub.registry().count_for_user(user), 1);

        match session.next().await.unwrap() {
            StreamEvent::Connected { user_id, session_id, .. } => {
                assert_eq!(user_id, user);
                assert_eq!(session_id, session.id());
            }
            other => panic!("unexpected event {other:?}"),
        }

        let start = tokio::time::Instant::now();
        assert!(session.next().await.unwrap().is_heartbeat());
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_heartbeat_after_client_abort() {
        let bus = Arc::new(MemoryPubSub::new(16));
        let hub = hub(bus.clone());
        let user = UserId::new();
        let mut session = hub.open(user).await.unwrap();
        session.next().await.unwrap();
        assert!(session.next().await.unwrap().is_heartbeat());

        let stats = session.stats();
        let mut state = session.state_watcher();
        drop(session);

        state
            .wait_for(|s| *s == SessionState::Closed)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(stats.heartbeats(), 1);
        assert_eq!(hub.registry().total(), 0);
        assert_eq!(bus.subscriber_count(keys::JOB_UPDATES_CHANNEL).await, 0);
        assert_eq!(
            bus.subscriber_count(&keys::user_notifications_channel(user))
                .await,
            0
        );
    }

    #[tokio::test]
    async fn test_relays_only_own_and_untargeted_events() {
        let bus = Arc::new(MemoryPubSub::new(16));
        let hub = hub(bus.clone());
        let publisher = EventPublisher::new(bus.clone());
        let user = UserId::new();
        let mut session = hub.open(user).await.unwrap();
        session.next().await.unwrap();

        // Another user's notification on the shared announcement channel.
        let foreign = ChannelEnvelope::targeted(UserId::new(), StreamEvent::heartbeat());
        publisher
            .publish(keys::SYSTEM_ANNOUNCEMENTS_CHANNEL, &foreign)
            .await
            .unwrap();

        let own = CreateNotification::to_user(user, NotificationKind::Info, "Mine", "Hello")
            .into_notification(Utc::now());
        publisher.notification(&own, true).await.unwrap();

        match session.next().await.unwrap() {
            StreamEvent::Notification(event) => assert_eq!(event.title, "Mine"),
            other => panic!("unexpected event {other:?}"),
        }

        let broadcast =
            CreateNotification::broadcast(NotificationKind::SystemAnnouncement, "All", "Hi")
                .into_notification(Utc::now());
        publisher.notification(&broadcast, true).await.unwrap();
        assert_eq!(session.next().await.unwrap().name(), "system_announcement");
    }

    #[tokio::test]
    async fn test_malformed_messages_skipped() {
        let bus = Arc::new(MemoryPubSub::new(16));
        let hub = hub(bus.clone());
        let mut session = hub.open(UserId::new()).await.unwrap();
        session.next().await.unwrap();

        bus.publish(keys::JOB_UPDATES_CHANNEL, "garbage".into())
            .await
            .unwrap();
        let announcement = ChannelEnvelope::untargeted(StreamEvent::heartbeat());
        bus.publish(
            keys::SYSTEM_ANNOUNCEMENTS_CHANNEL,
            announcement.encode().unwrap(),
        )
        .await
        .unwrap();

        assert!(session.next().await.unwrap().is_heartbeat());
        assert_eq!(session.state(), SessionState::Open);
    }
}
