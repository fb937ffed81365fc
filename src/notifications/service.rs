use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::{NewNotification, NotificationKind, NotificationModel},
    repository::NotificationRepository,
};
use crate::event::EventDispatcher;
use crate::shared::{AppError, UserId};
use crate::websockets::WebSocketMessage;

/// Longest message preview carried in a "New Message" notification
pub const MESSAGE_PREVIEW_LIMIT: usize = 50;

/// Cuts `content` to [`MESSAGE_PREVIEW_LIMIT`] characters, adding "..." when shortened
pub fn truncate_preview(content: &str) -> String {
    if content.chars().count() > MESSAGE_PREVIEW_LIMIT {
        let cut: String = content.chars().take(MESSAGE_PREVIEW_LIMIT).collect();
        format!("{}...", cut)
    } else {
        content.to_string()
    }
}

/// Service for notification business logic
///
/// Every notification is persisted first and then pushed live through the
/// dispatcher, so an offline recipient still finds it on the next fetch.
///
/// Messages and follows call [`notify_new_message`](Self::notify_new_message)
/// and [`notify_user_follow`](Self::notify_user_follow). The remaining
/// `notify_*` helpers and [`broadcast_notification`](Self::broadcast_notification)
/// are library surface for order and catalog callers that live outside this
/// service.
pub struct NotificationService {
    repository: Arc<dyn NotificationRepository + Send + Sync>,
    dispatcher: EventDispatcher,
}

impl NotificationService {
    pub fn new(
        repository: Arc<dyn NotificationRepository + Send + Sync>,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            repository,
            dispatcher,
        }
    }

    /// Persist a notification, then deliver it if the recipient is online
    #[instrument(skip(self, title, message))]
    pub async fn create_and_send(
        &self,
        user_id: UserId,
        title: impl Into<String> + Send,
        message: impl Into<String> + Send,
        kind: NotificationKind,
    ) -> Result<NotificationModel, AppError> {
        let notification = NewNotification::new(user_id, title, message, kind);
        let record = self.repository.create_notification(&notification).await?;

        let delivered = self
            .dispatcher
            .deliver(user_id, &WebSocketMessage::notification(&record))
            .await;

        if delivered {
            info!(
                user_id = user_id,
                notification_id = record.id,
                "Notification sent live"
            );
        } else {
            info!(
                user_id = user_id,
                notification_id = record.id,
                "User offline, notification saved for later"
            );
        }

        Ok(record)
    }

    pub async fn notify_new_message(
        &self,
        receiver_id: UserId,
        sender_name: &str,
        message_preview: &str,
    ) -> Result<NotificationModel, AppError> {
        self.create_and_send(
            receiver_id,
            "New Message",
            format!("{}: {}", sender_name, truncate_preview(message_preview)),
            NotificationKind::Message,
        )
        .await
    }

    // Order, product, promotion and alert helpers are entry points for the
    // order and catalog services; no route in this crate raises them.

    pub async fn notify_new_order(
        &self,
        seller_id: UserId,
        buyer_name: &str,
        product_name: &str,
        order_ref: &str,
    ) -> Result<NotificationModel, AppError> {
        self.create_and_send(
            seller_id,
            "New Order Received",
            format!("{} ordered {} (Order #{})", buyer_name, product_name, order_ref),
            NotificationKind::Order,
        )
        .await
    }

    pub async fn notify_order_status_update(
        &self,
        buyer_id: UserId,
        status: &str,
        order_ref: &str,
    ) -> Result<NotificationModel, AppError> {
        self.create_and_send(
            buyer_id,
            "Order Update",
            format!("Your order #{} is now {}", order_ref, status.to_uppercase()),
            NotificationKind::Order,
        )
        .await
    }

    pub async fn notify_promotion(
        &self,
        user_id: UserId,
        title: &str,
        message: &str,
    ) -> Result<NotificationModel, AppError> {
        self.create_and_send(user_id, title, message, NotificationKind::Promotion)
            .await
    }

    pub async fn notify_system_alert(
        &self,
        user_id: UserId,
        title: &str,
        message: &str,
    ) -> Result<NotificationModel, AppError> {
        self.create_and_send(user_id, title, message, NotificationKind::System)
            .await
    }

    pub async fn notify_saved_product(
        &self,
        owner_id: UserId,
        saver_name: &str,
        product_name: &str,
    ) -> Result<NotificationModel, AppError> {
        self.create_and_send(
            owner_id,
            "Product Saved",
            format!("{} saved your product \"{}\"", saver_name, product_name),
            NotificationKind::Save,
        )
        .await
    }

    pub async fn notify_unsaved_product(
        &self,
        owner_id: UserId,
        unsaver_name: &str,
        product_name: &str,
    ) -> Result<NotificationModel, AppError> {
        self.create_and_send(
            owner_id,
            "Product Unsaved",
            format!(
                "{} removed {} from their saved list",
                unsaver_name, product_name
            ),
            NotificationKind::Save,
        )
        .await
    }

    pub async fn notify_user_follow(
        &self,
        followed_user_id: UserId,
        follower_name: &str,
    ) -> Result<NotificationModel, AppError> {
        self.create_and_send(
            followed_user_id,
            "New Follower",
            format!("{} just followed you", follower_name),
            NotificationKind::Follow,
        )
        .await
    }

    /// Create-and-send for each user. A failure for one user is logged and
    /// does not stop the rest; the records that were created are returned.
    #[instrument(skip(self, title, message))]
    pub async fn broadcast_notification(
        &self,
        user_ids: &[UserId],
        title: &str,
        message: &str,
        kind: NotificationKind,
    ) -> Vec<NotificationModel> {
        let mut created = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            match self.create_and_send(user_id, title, message, kind).await {
                Ok(record) => created.push(record),
                Err(e) => {
                    warn!(user_id = user_id, error = %e, "Broadcast notification failed for user");
                }
            }
        }

        info!(
            requested = user_ids.len(),
            created = created.len(),
            "Broadcast notification complete"
        );
        created
    }

    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<(Vec<NotificationModel>, u64), AppError> {
        let notifications = self.repository.list_for_user(user_id).await?;
        let unread = notifications.iter().filter(|n| !n.is_read).count() as u64;
        Ok((notifications, unread))
    }

    pub async fn unread_count(&self, user_id: UserId) -> Result<u64, AppError> {
        self.repository.count_unread(user_id).await
    }

    /// Fetch a single notification or fail with NotFound
    pub async fn get(&self, notification_id: i64) -> Result<NotificationModel, AppError> {
        self.repository
            .find_notification(notification_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, notification_id: i64) -> Result<NotificationModel, AppError> {
        self.repository
            .mark_read(notification_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, AppError> {
        let updated = self.repository.mark_all_read(user_id).await?;
        info!(user_id = user_id, updated = updated, "Marked notifications read");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, notification_id: i64) -> Result<(), AppError> {
        if self.repository.delete_notification(notification_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Notification not found".to_string()))
        }
    }
}
