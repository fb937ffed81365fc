use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::{ConnectionId, ConversationId, UserId};

/// Message types for WebSocket communication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    // Client -> Server
    JoinConversation,
    LeaveConversation,
    Typing,
    StopTyping,

    // Both directions: relayed verbatim to the other room members
    RoomEvent,

    // Server -> Client
    Connected,
    Notification,
    NewMessage,
    UserTyping,
    UserStoppedTyping,
    Error,
}

/// Metadata for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessageMeta {
    pub timestamp: DateTime<Utc>,
}

/// Base structure for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub meta: Option<WebSocketMessageMeta>,
}

/// Client-to-Server message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPayload {
    pub conversation_id: ConversationId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEventPayload {
    pub conversation_id: ConversationId,
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Filled in by the server before relaying; ignored when sent by a client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<UserId>,
}

/// Server-to-Client message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPayload {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypingPayload {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Helper functions for creating messages
impl WebSocketMessage {
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            payload,
            meta: Some(WebSocketMessageMeta {
                timestamp: Utc::now(),
            }),
        }
    }

    fn with_payload<T: Serialize>(message_type: MessageType, payload: &T) -> Self {
        Self::new(message_type, serde_json::to_value(payload).unwrap_or_default())
    }

    /// Create a CONNECTED message
    pub fn connected(user_id: UserId, connection_id: ConnectionId) -> Self {
        Self::with_payload(
            MessageType::Connected,
            &ConnectedPayload {
                user_id,
                connection_id,
            },
        )
    }

    /// Create a NOTIFICATION message carrying the persisted record
    pub fn notification<T: Serialize>(record: &T) -> Self {
        Self::with_payload(MessageType::Notification, record)
    }

    /// Create a NEW_MESSAGE message carrying the persisted chat message
    pub fn new_message<T: Serialize>(record: &T) -> Self {
        Self::with_payload(MessageType::NewMessage, record)
    }

    /// Create a USER_TYPING message
    pub fn user_typing(user_id: UserId, conversation_id: ConversationId) -> Self {
        Self::with_payload(
            MessageType::UserTyping,
            &TypingPayload {
                user_id,
                conversation_id,
            },
        )
    }

    /// Create a USER_STOPPED_TYPING message
    pub fn user_stopped_typing(user_id: UserId, conversation_id: ConversationId) -> Self {
        Self::with_payload(
            MessageType::UserStoppedTyping,
            &TypingPayload {
                user_id,
                conversation_id,
            },
        )
    }

    /// Create a ROOM_EVENT message to relay
    pub fn room_event(payload: RoomEventPayload) -> Self {
        Self::with_payload(MessageType::RoomEvent, &payload)
    }

    /// Create an ERROR message
    pub fn error(message: String) -> Self {
        Self::with_payload(MessageType::Error, &ErrorPayload { message })
    }

    /// Parse the payload into a typed struct
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
