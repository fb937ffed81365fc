use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{MessageModel, NewMessage};
use crate::shared::{AppError, ConversationId};

/// Trait for message repository operations
#[async_trait]
pub trait MessageRepository {
    async fn create_message(&self, message: &NewMessage) -> Result<MessageModel, AppError>;

    /// Messages in a conversation, oldest first
    async fn list_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<MessageModel>, AppError>;
}

/// In-memory implementation of MessageRepository for development and testing
pub struct InMemoryMessageRepository {
    messages: Mutex<Vec<MessageModel>>,
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    #[instrument(skip(self, message))]
    async fn create_message(&self, message: &NewMessage) -> Result<MessageModel, AppError> {
        let mut messages = self.messages.lock().map_err(|_| AppError::Internal)?;
        let record = MessageModel {
            id: messages.len() as i64 + 1,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            created_at: Utc::now(),
        };
        messages.push(record.clone());

        debug!(
            message_id = record.id,
            conversation_id = record.conversation_id,
            "Message stored in memory"
        );
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn list_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<MessageModel>, AppError> {
        let messages = self.messages.lock().map_err(|_| AppError::Internal)?;
        Ok(messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

/// PostgreSQL implementation of message repository
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_message(row: &sqlx::postgres::PgRow) -> MessageModel {
        MessageModel {
            id: row.get("id"),
            conversation_id: row.get("conversation_id"),
            sender_id: row.get("sender_id"),
            receiver_id: row.get("receiver_id"),
            content: row.get("content"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    #[instrument(skip(self, message))]
    async fn create_message(&self, message: &NewMessage) -> Result<MessageModel, AppError> {
        let row = sqlx::query(
            r#"
            INSERT INTO messages (conversation_id, sender_id, receiver_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, conversation_id, sender_id, receiver_id, content, created_at
            "#,
        )
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(
                error = %e,
                conversation_id = message.conversation_id,
                "Failed to insert message"
            );
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(Self::row_to_message(&row))
    }

    #[instrument(skip(self))]
    async fn list_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<MessageModel>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, sender_id, receiver_id, content, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, conversation_id = conversation_id, "Failed to list messages");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows.iter().map(Self::row_to_message).collect())
    }
}
