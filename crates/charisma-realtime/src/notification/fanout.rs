//! Notification fan-out: persist, publish, track read state.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use charisma_cache::CacheManager;
use charisma_core::error::AppError;
use charisma_core::result::AppResult;
use charisma_core::types::id::{NotificationId, UserId};
use charisma_database::store::NotificationStore;
use charisma_entity::notification::{CreateNotification, Notification, Recipient};

use super::unread::UnreadCounter;
use crate::publisher::EventPublisher;

/// Outcome of one send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    /// Every requested step succeeded.
    pub success: bool,
    /// Id of the stored row, when the notification was persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<NotificationId>,
    /// Live subscribers that received it.
    pub delivered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A page of notifications plus the reader's unread total.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
}

/// Delivers notifications to one user or to everyone.
///
/// Broadcasts are stored once and published once; users are never
/// enumerated. Read state of a broadcast is tracked per reader.
#[derive(Debug, Clone)]
pub struct NotificationFanout {
    store: Arc<dyn NotificationStore>,
    publisher: EventPublisher,
    unread: UnreadCounter,
}

impl NotificationFanout {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        publisher: EventPublisher,
        cache: CacheManager,
    ) -> Self {
        Self {
            store,
            publisher,
            unread: UnreadCounter::new(cache),
        }
    }

    /// Deliver to `user_id`, overriding the request's recipient.
    pub async fn send_to_user(
        &self,
        user_id: UserId,
        mut request: CreateNotification,
    ) -> AppResult<DeliveryResult> {
        request.recipient = Recipient::User(user_id);
        self.deliver(request).await
    }

    /// Deliver to every user, overriding the request's recipient.
    pub async fn send_to_all(&self, mut request: CreateNotification) -> AppResult<DeliveryResult> {
        request.recipient = Recipient::Broadcast;
        self.deliver(request).await
    }

    /// Deliver to whatever recipient the request names.
    pub async fn send(&self, request: CreateNotification) -> AppResult<DeliveryResult> {
        self.deliver(request).await
    }

    async fn deliver(&self, request: CreateNotification) -> AppResult<DeliveryResult> {
        if request.title.trim().is_empty() {
            return Err(AppError::validation("Notification title must not be empty"));
        }
        if request.message.trim().is_empty() {
            return Err(AppError::validation("Notification message must not be empty"));
        }

        let persist = request.persist;
        let notification = request.into_notification(Utc::now());
        let recipient = notification.recipient();

        if persist {
            if let Err(e) = self.store.insert(&notification).await {
                error!(error = %e, ?recipient, "Failed to persist notification");
                return Ok(DeliveryResult {
                    success: false,
                    notification_id: None,
                    delivered: 0,
                    error: Some(e.message),
                });
            }
            match recipient {
                Recipient::User(user_id) => self.unread.invalidate(user_id).await,
                Recipient::Broadcast => self.unread.invalidate_all().await,
            }
        }

        let notification_id = persist.then_some(notification.id);
        match self.publisher.notification(&notification, persist).await {
            Ok(delivered) => {
                info!(
                    notification_id = %notification.id,
                    ?recipient,
                    persisted = persist,
                    delivered,
                    "Notification sent"
                );
                Ok(DeliveryResult {
                    success: true,
                    notification_id,
                    delivered,
                    error: None,
                })
            }
            Err(e) => {
                warn!(error = %e, notification_id = %notification.id, "Live delivery failed");
                Ok(DeliveryResult {
                    success: false,
                    notification_id,
                    delivered: 0,
                    error: Some(e.message),
                })
            }
        }
    }

    /// Most recent first, the user's own notifications plus broadcasts.
    pub async fn get_user_notifications(
        &self,
        user_id: UserId,
        limit: usize,
        unread_only: bool,
    ) -> AppResult<NotificationList> {
        let notifications = self
            .store
            .list_for_user(user_id, limit, unread_only)
            .await?;
        let unread_count = self.unread_count(user_id).await?;
        Ok(NotificationList {
            notifications,
            unread_count,
        })
    }

    /// Unread total for `user_id`, served from cache when possible.
    pub async fn unread_count(&self, user_id: UserId) -> AppResult<u64> {
        if let Some(count) = self.unread.cached(user_id).await {
            return Ok(count);
        }
        let count = self.store.count_unread(user_id).await?;
        self.unread.store(user_id, count).await;
        Ok(count)
    }

    /// Mark one notification read for `user_id`.
    ///
    /// Re-marking is a no-op. Another user's notification is an
    /// authorization error.
    pub async fn mark_as_read(&self, user_id: UserId, id: NotificationId) -> AppResult<()> {
        let notification = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Notification {id} not found")))?;

        match notification.user_id {
            Some(owner) if owner != user_id => {
                return Err(AppError::authorization(
                    "Cannot mark another user's notification as read",
                ));
            }
            Some(_) => {
                if !notification.is_read {
                    self.store.mark_owned_read(id, user_id).await?;
                }
            }
            None => self.store.insert_receipt(id, user_id).await?,
        }

        self.unread.invalidate(user_id).await;
        Ok(())
    }

    /// Mark everything visible to `user_id` read; returns rows touched.
    pub async fn mark_all_as_read(&self, user_id: UserId) -> AppResult<u64> {
        let updated = self.store.mark_all_read(user_id).await?;
        self.unread.invalidate(user_id).await;
        info!(%user_id, updated, "Marked all notifications read");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charisma_cache::keys;
    use charisma_cache::memory::{MemoryCacheProvider, MemoryPubSub};
    use charisma_cache::pubsub::PubSub;
    use charisma_core::config::cache::MemoryCacheConfig;
    use charisma_core::error::ErrorKind;
    use charisma_database::memory::MemoryNotificationStore;
    use charisma_entity::notification::NotificationKind;
    use futures::StreamExt;

    use crate::message::{ChannelEnvelope, StreamEvent};

    struct Fixture {
        fanout: NotificationFanout,
        store: Arc<MemoryNotificationStore>,
        bus: Arc<MemoryPubSub>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryNotificationStore::new());
        let bus = Arc::new(MemoryPubSub::new(16));
        let cache = CacheManager::from_provider(Arc::new(MemoryCacheProvider::new(
            &MemoryCacheConfig::default(),
            60,
        )));
        let fanout = NotificationFanout::new(store.clone(), EventPublisher::new(bus.clone()), cache);
        Fixture { fanout, store, bus }
    }

    fn info(title: &str) -> CreateNotification {
        CreateNotification::broadcast(NotificationKind::Info, title, "body")
    }

    #[tokio::test]
    async fn test_send_to_user_persists_and_publishes() {
        let fx = fixture();
        let user = UserId::new();
        let mut sub = fx
            .bus
            .subscribe(&[keys::user_notifications_channel(user)])
            .await
            .unwrap();

        let result = fx.fanout.send_to_user(user, info("Hello")).await.unwrap();
        assert!(result.success);
        assert_eq!(result.delivered, 1);
        let id = result.notification_id.unwrap();

        let envelope = ChannelEnvelope::decode(&sub.next().await.unwrap().payload).unwrap();
        assert_eq!(envelope.user_id, Some(user));
        match envelope.event {
            StreamEvent::Notification(event) => assert_eq!(event.id, Some(id)),
            other => panic!("unexpected event {other:?}"),
        }

        let list = fx.fanout.get_user_notifications(user, 50, false).await.unwrap();
        assert_eq!(list.notifications.len(), 1);
        assert_eq!(list.unread_count, 1);
    }

    #[tokio::test]
    async fn test_send_to_all_without_users_succeeds() {
        let fx = fixture();
        let result = fx.fanout.send_to_all(info("Maintenance")).await.unwrap();
        assert!(result.success);
        assert_eq!(result.delivered, 0);
        assert!(result.notification_id.is_some());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_transient_not_persisted() {
        let fx = fixture();
        let user = UserId::new();
        let result = fx
            .fanout
            .send_to_user(user, info("Typing").transient())
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.notification_id.is_none());

        let list = fx.fanout.get_user_notifications(user, 50, false).await.unwrap();
        assert!(list.notifications.is_empty());
        assert_eq!(list.unread_count, 0);
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let fx = fixture();
        let err = fx.fanout.send_to_all(info("  ")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_mark_as_read_idempotent() {
        let fx = fixture();
        let user = UserId::new();
        let id = fx
            .fanout
            .send_to_user(user, info("Hello"))
            .await
            .unwrap()
            .notification_id
            .unwrap();

        fx.fanout.mark_as_read(user, id).await.unwrap();
        fx.fanout.mark_as_read(user, id).await.unwrap();
        assert_eq!(fx.fanout.unread_count(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_as_read_scoped_to_owner() {
        let fx = fixture();
        let owner = UserId::new();
        let id = fx
            .fanout
            .send_to_user(owner, info("Private"))
            .await
            .unwrap()
            .notification_id
            .unwrap();

        let err = fx.fanout.mark_as_read(UserId::new(), id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        let err = fx
            .fanout
            .mark_as_read(owner, NotificationId::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_broadcast_read_state_is_per_reader() {
        let fx = fixture();
        let (a, b) = (UserId::new(), UserId::new());
        let id = fx
            .fanout
            .send_to_all(info("Release"))
            .await
            .unwrap()
            .notification_id
            .unwrap();

        fx.fanout.mark_as_read(a, id).await.unwrap();
        assert_eq!(fx.fanout.unread_count(a).await.unwrap(), 0);
        assert_eq!(fx.fanout.unread_count(b).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_refreshes_cached_counts() {
        let fx = fixture();
        let user = UserId::new();
        assert_eq!(fx.fanout.unread_count(user).await.unwrap(), 0);

        fx.fanout.send_to_all(info("New")).await.unwrap();
        assert_eq!(fx.fanout.unread_count(user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unread_only_filter() {
        let fx = fixture();
        let user = UserId::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            let result = fx
                .fanout
                .send_to_user(user, info(&format!("n{i}")))
                .await
                .unwrap();
            ids.push(result.notification_id.unwrap());
        }
        for id in &ids[..3] {
            fx.fanout.mark_as_read(user, *id).await.unwrap();
        }

        let list = fx.fanout.get_user_notifications(user, 50, true).await.unwrap();
        assert_eq!(list.notifications.len(), 2);
        assert_eq!(list.unread_count, 2);
        assert!(list.notifications.iter().all(|n| !n.is_read));
    }

    #[tokio::test]
    async fn test_store_outage_reported_in_result() {
        let fx = fixture();
        fx.store.set_available(false);
        let result = fx.fanout.send_to_all(info("Down")).await.unwrap();
        assert!(!result.success);
        assert!(result.notification_id.is_none());
        assert!(result.error.is_some());
    }
}
