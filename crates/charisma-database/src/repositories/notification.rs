//! Notification repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use charisma_core::error::{AppError, ErrorKind};
use charisma_core::result::AppResult;
use charisma_core::types::id::{NotificationId, UserId};
use charisma_entity::notification::Notification;

use crate::store::NotificationStore;

/// Notifications visible to `$1`, with broadcast read state taken from the
/// reader's receipt.
const READER_VIEW: &str = "\
    SELECT n.id, n.user_id, n.kind, n.title, n.message, n.metadata, \
           CASE WHEN n.user_id IS NULL THEN r.read_at IS NOT NULL ELSE n.is_read END AS is_read, \
           CASE WHEN n.user_id IS NULL THEN r.read_at ELSE n.read_at END AS read_at, \
           n.created_at \
    FROM notifications n \
    LEFT JOIN notification_receipts r ON r.notification_id = n.id AND r.user_id = $1 \
    WHERE n.user_id = $1 OR n.user_id IS NULL";

/// Repository for notification rows and broadcast receipts.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn health_check(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::ServiceUnavailable, "Database is not reachable", e)
            })?;
        Ok(())
    }

    async fn insert(&self, notification: &Notification) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, title, message, metadata, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.metadata)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create notification", e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, kind, title, message, metadata, is_read, read_at, created_at \
             FROM notifications WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find notification", e))
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        limit: usize,
        unread_only: bool,
    ) -> AppResult<Vec<Notification>> {
        let sql = format!(
            "SELECT * FROM ({READER_VIEW}) v WHERE ($2 = FALSE OR v.is_read = FALSE) \
             ORDER BY v.created_at DESC LIMIT $3"
        );
        sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list notifications", e))
    }

    async fn count_unread(&self, user_id: UserId) -> AppResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM ({READER_VIEW}) v WHERE v.is_read = FALSE");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count unread", e))?;
        Ok(count.max(0) as u64)
    }

    async fn mark_owned_read(&self, id: NotificationId, user_id: UserId) -> AppResult<()> {
        sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, NOW()) \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark read", e))?;
        Ok(())
    }

    async fn insert_receipt(&self, id: NotificationId, user_id: UserId) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notification_receipts (notification_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (notification_id, user_id) DO NOTHING",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record receipt", e))?;
        Ok(())
    }

    async fn mark_all_read(&self, user_id: UserId) -> AppResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e))?;

        let owned = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() \
             WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark all read", e))?;

        let receipts = sqlx::query(
            "INSERT INTO notification_receipts (notification_id, user_id) \
             SELECT id, $1 FROM notifications WHERE user_id IS NULL \
             ON CONFLICT (notification_id, user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record receipts", e))?;

        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit", e))?;

        Ok(owned.rows_affected() + receipts.rows_affected())
    }
}
