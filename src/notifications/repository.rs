use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{NewNotification, NotificationKind, NotificationModel};
use crate::shared::{AppError, UserId};

/// Trait for notification repository operations
#[async_trait]
pub trait NotificationRepository {
    async fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationModel, AppError>;

    /// All notifications for a user, newest first
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<NotificationModel>, AppError>;

    async fn count_unread(&self, user_id: UserId) -> Result<u64, AppError>;

    async fn find_notification(
        &self,
        notification_id: i64,
    ) -> Result<Option<NotificationModel>, AppError>;

    /// Returns the updated record, or `None` if it does not exist
    async fn mark_read(&self, notification_id: i64)
        -> Result<Option<NotificationModel>, AppError>;

    /// Returns how many notifications changed from unread to read
    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, AppError>;

    /// Returns whether a notification was deleted
    async fn delete_notification(&self, notification_id: i64) -> Result<bool, AppError>;
}

struct NotificationStore {
    next_id: i64,
    rows: Vec<NotificationModel>,
}

/// In-memory implementation of NotificationRepository for development and testing
pub struct InMemoryNotificationRepository {
    store: Mutex<NotificationStore>,
}

impl Default for InMemoryNotificationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(NotificationStore {
                next_id: 1,
                rows: Vec::new(),
            }),
        }
    }

    /// Total number of stored notifications (useful for debugging)
    pub fn notification_count(&self) -> usize {
        self.store.lock().map(|s| s.rows.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, NotificationStore>, AppError> {
        self.store.lock().map_err(|_| AppError::Internal)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    #[instrument(skip(self, notification))]
    async fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationModel, AppError> {
        let mut store = self.lock()?;
        let record = NotificationModel {
            id: store.next_id,
            user_id: notification.user_id,
            title: notification.title.clone(),
            message: notification.message.clone(),
            kind: notification.kind,
            is_read: false,
            created_at: Utc::now(),
        };
        store.next_id += 1;
        store.rows.push(record.clone());

        debug!(
            notification_id = record.id,
            user_id = record.user_id,
            "Notification stored in memory"
        );
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<NotificationModel>, AppError> {
        let store = self.lock()?;
        // Insertion order doubles as creation order; reverse for newest first
        Ok(store
            .rows
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn count_unread(&self, user_id: UserId) -> Result<u64, AppError> {
        let store = self.lock()?;
        Ok(store
            .rows
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    #[instrument(skip(self))]
    async fn find_notification(
        &self,
        notification_id: i64,
    ) -> Result<Option<NotificationModel>, AppError> {
        let store = self.lock()?;
        Ok(store.rows.iter().find(|n| n.id == notification_id).cloned())
    }

    #[instrument(skip(self))]
    async fn mark_read(
        &self,
        notification_id: i64,
    ) -> Result<Option<NotificationModel>, AppError> {
        let mut store = self.lock()?;
        Ok(store
            .rows
            .iter_mut()
            .find(|n| n.id == notification_id)
            .map(|n| {
                n.is_read = true;
                n.clone()
            }))
    }

    #[instrument(skip(self))]
    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, AppError> {
        let mut store = self.lock()?;
        let mut updated = 0;
        for n in store
            .rows
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_notification(&self, notification_id: i64) -> Result<bool, AppError> {
        let mut store = self.lock()?;
        let before = store.rows.len();
        store.rows.retain(|n| n.id != notification_id);
        Ok(store.rows.len() != before)
    }
}

/// PostgreSQL implementation of notification repository
pub struct PostgresNotificationRepository {
    pool: PgPool,
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, type, is_read, created_at";

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_notification(row: &sqlx::postgres::PgRow) -> Result<NotificationModel, AppError> {
        let kind: String = row.get("type");
        Ok(NotificationModel {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
            message: row.get("message"),
            kind: NotificationKind::from_str(&kind).map_err(|_| {
                AppError::DatabaseError(format!("Unknown notification type: {}", kind))
            })?,
            is_read: row.get("is_read"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    #[instrument(skip(self, notification))]
    async fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationModel, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO notifications (user_id, title, message, type) VALUES ($1, $2, $3, $4) RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = notification.user_id, "Failed to create notification");
            AppError::DatabaseError(e.to_string())
        })?;

        Self::row_to_notification(&row)
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<NotificationModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = user_id, "Failed to list notifications");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter().map(Self::row_to_notification).collect()
    }

    #[instrument(skip(self))]
    async fn count_unread(&self, user_id: UserId) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = user_id, "Failed to count unread notifications");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self))]
    async fn find_notification(
        &self,
        notification_id: i64,
    ) -> Result<Option<NotificationModel>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        ))
        .bind(notification_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, notification_id = notification_id, "Failed to fetch notification");
            AppError::DatabaseError(e.to_string())
        })?;

        row.as_ref().map(Self::row_to_notification).transpose()
    }

    #[instrument(skip(self))]
    async fn mark_read(
        &self,
        notification_id: i64,
    ) -> Result<Option<NotificationModel>, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(notification_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, notification_id = notification_id, "Failed to mark notification read");
            AppError::DatabaseError(e.to_string())
        })?;

        row.as_ref().map(Self::row_to_notification).transpose()
    }

    #[instrument(skip(self))]
    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = user_id, "Failed to mark all notifications read");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_notification(&self, notification_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(notification_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, notification_id = notification_id, "Failed to delete notification");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }
}
