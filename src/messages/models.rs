use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::{ConversationId, UserId};

/// Database model for messages table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageModel {
    pub id: i64,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
}
