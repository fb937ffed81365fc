use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::{MessageModel, NewMessage},
    repository::MessageRepository,
};
use crate::notifications::NotificationService;
use crate::rooms::RoomRouter;
use crate::shared::{AppError, ConversationId, UserId};
use crate::users::UserRepository;
use crate::websockets::WebSocketMessage;

/// Service for direct messages inside a conversation
pub struct MessageService {
    repository: Arc<dyn MessageRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
    room_router: Arc<RoomRouter>,
    notification_service: Arc<NotificationService>,
}

impl MessageService {
    pub fn new(
        repository: Arc<dyn MessageRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        room_router: Arc<RoomRouter>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            repository,
            user_repository,
            room_router,
            notification_service,
        }
    }

    /// Persist a message, broadcast it to the conversation room and notify
    /// the receiver.
    ///
    /// The sender's own connections in the room get `NEW_MESSAGE` as well.
    #[instrument(skip(self, content))]
    pub async fn send_message(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<MessageModel, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::BadRequest("Message content is required".to_string()));
        }
        if receiver_id == 0 {
            return Err(AppError::BadRequest("Receiver is required".to_string()));
        }

        let record = self
            .repository
            .create_message(&NewMessage {
                conversation_id,
                sender_id,
                receiver_id,
                content: content.to_string(),
            })
            .await?;

        let delivered = self
            .room_router
            .broadcast(conversation_id, &WebSocketMessage::new_message(&record), None)
            .await;

        info!(
            message_id = record.id,
            conversation_id = conversation_id,
            delivered = delivered,
            "Message sent to conversation"
        );

        let sender_name = match self.user_repository.get_user(sender_id).await {
            Ok(Some(sender)) => sender.display_name(),
            Ok(None) => "Someone".to_string(),
            Err(e) => {
                warn!(sender_id = sender_id, error = %e, "Could not load sender for notification");
                "Someone".to_string()
            }
        };

        if let Err(e) = self
            .notification_service
            .notify_new_message(receiver_id, &sender_name, &record.content)
            .await
        {
            warn!(
                receiver_id = receiver_id,
                message_id = record.id,
                error = %e,
                "Failed to notify receiver of new message"
            );
        }

        Ok(record)
    }

    pub async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<MessageModel>, AppError> {
        self.repository.list_for_conversation(conversation_id).await
    }
}
