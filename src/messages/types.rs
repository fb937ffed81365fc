use serde::Deserialize;

use crate::shared::{ConversationId, UserId};

/// Query for listing a conversation's messages
#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    #[serde(alias = "conversationId")]
    pub conversation_id: Option<ConversationId>,
}

/// Request payload for sending a message; the sender is the caller
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(alias = "receiverId")]
    pub receiver_id: Option<UserId>,
    #[serde(alias = "conversationId")]
    pub conversation_id: Option<ConversationId>,
    pub content: Option<String>,
}
