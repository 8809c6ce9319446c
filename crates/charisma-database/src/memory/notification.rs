//! In-memory notification store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use charisma_core::result::AppResult;
use charisma_core::types::id::{NotificationId, UserId};
use charisma_entity::notification::Notification;

use super::Availability;
use crate::store::NotificationStore;

#[derive(Debug, Default)]
struct Inner {
    /// Rows in insertion order.
    rows: Vec<Notification>,
    receipts: HashMap<(NotificationId, UserId), DateTime<Utc>>,
}

impl Inner {
    /// Project a row as `reader` sees it.
    fn view(&self, row: &Notification, reader: UserId) -> Option<Notification> {
        match row.user_id {
            Some(owner) if owner == reader => Some(row.clone()),
            Some(_) => None,
            None => {
                let mut view = row.clone();
                let receipt = self.receipts.get(&(row.id, reader)).copied();
                view.is_read = receipt.is_some();
                view.read_at = receipt;
                Some(view)
            }
        }
    }
}

/// Notifications and receipts kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    inner: RwLock<Inner>,
    availability: Availability,
}

impl MemoryNotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend going away or coming back.
    pub fn set_available(&self, available: bool) {
        self.availability.set(available);
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn health_check(&self) -> AppResult<()> {
        self.availability.check()
    }

    async fn insert(&self, notification: &Notification) -> AppResult<()> {
        self.availability.check()?;
        self.inner.write().await.rows.push(notification.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        self.availability.check()?;
        let inner = self.inner.read().await;
        Ok(inner.rows.iter().find(|n| n.id == id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        limit: usize,
        unread_only: bool,
    ) -> AppResult<Vec<Notification>> {
        self.availability.check()?;
        let inner = self.inner.read().await;
        let mut visible: Vec<Notification> = inner
            .rows
            .iter()
            .filter_map(|row| inner.view(row, user_id))
            .filter(|n| !unread_only || !n.is_read)
            .collect();
        // Stable sort keeps later inserts ahead on equal timestamps.
        visible.reverse();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        visible.truncate(limit);
        Ok(visible)
    }

    async fn count_unread(&self, user_id: UserId) -> AppResult<u64> {
        self.availability.check()?;
        let inner = self.inner.read().await;
        let count = inner
            .rows
            .iter()
            .filter_map(|row| inner.view(row, user_id))
            .filter(|n| !n.is_read)
            .count();
        Ok(count as u64)
    }

    async fn mark_owned_read(&self, id: NotificationId, user_id: UserId) -> AppResult<()> {
        self.availability.check()?;
        let mut inner = self.inner.write().await;
        if let Some(row) = inner
            .rows
            .iter_mut()
            .find(|n| n.id == id && n.user_id == Some(user_id))
        {
            row.is_read = true;
            row.read_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn insert_receipt(&self, id: NotificationId, user_id: UserId) -> AppResult<()> {
        self.availability.check()?;
        self.inner
            .write()
            .await
            .receipts
            .entry((id, user_id))
            .or_insert_with(Utc::now);
        Ok(())
    }

    async fn mark_all_read(&self, user_id: UserId) -> AppResult<u64> {
        self.availability.check()?;
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut touched = 0;
        let mut broadcast_ids = Vec::new();

        for row in inner.rows.iter_mut() {
            match row.user_id {
                Some(owner) if owner == user_id && !row.is_read => {
                    row.is_read = true;
                    row.read_at = Some(now);
                    touched += 1;
                }
                None => broadcast_ids.push(row.id),
                _ => {}
            }
        }
        for id in broadcast_ids {
            if let std::collections::hash_map::Entry::Vacant(slot) =
                inner.receipts.entry((id, user_id))
            {
                slot.insert(now);
                touched += 1;
            }
        }
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charisma_entity::notification::{CreateNotification, NotificationKind};

    async fn seed(store: &MemoryNotificationStore, request: CreateNotification) -> Notification {
        let n = request.into_notification(Utc::now());
        store.insert(&n).await.unwrap();
        n
    }

    #[tokio::test]
    async fn test_broadcast_receipts_are_per_user() {
        let store = MemoryNotificationStore::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let n = seed(
            &store,
            CreateNotification::broadcast(NotificationKind::SystemAnnouncement, "Maintenance", "Tonight"),
        )
        .await;

        store.insert_receipt(n.id, alice).await.unwrap();

        assert_eq!(store.count_unread(alice).await.unwrap(), 0);
        assert_eq!(store.count_unread(bob).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_other_users_rows_hidden() {
        let store = MemoryNotificationStore::new();
        let alice = UserId::new();
        let bob = UserId::new();
        seed(&store, CreateNotification::to_user(alice, NotificationKind::Info, "a", "a")).await;
        seed(&store, CreateNotification::to_user(bob, NotificationKind::Info, "b", "b")).await;

        let listed = store.list_for_user(alice, 50, false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_id, Some(alice));
    }

    #[tokio::test]
    async fn test_mark_all_read_counts_new_reads_only() {
        let store = MemoryNotificationStore::new();
        let alice = UserId::new();
        seed(&store, CreateNotification::to_user(alice, NotificationKind::Info, "a", "a")).await;
        seed(&store, CreateNotification::broadcast(NotificationKind::Info, "b", "b")).await;

        assert_eq!(store.mark_all_read(alice).await.unwrap(), 2);
        assert_eq!(store.mark_all_read(alice).await.unwrap(), 0);
        assert_eq!(store.count_unread(alice).await.unwrap(), 0);
    }
}
