//! Client frames as a browser would send them
#![allow(dead_code)]

use marketplace::ConnectionId;
use serde_json::json;

use super::setup::TestSetup;
use marketplace::websockets::MessageHandler;

pub fn join_frame(conversation_id: i64) -> String {
    json!({"type": "JOIN_CONVERSATION", "payload": {"conversation_id": conversation_id}}).to_string()
}

pub fn leave_frame(conversation_id: i64) -> String {
    json!({"type": "LEAVE_CONVERSATION", "payload": {"conversation_id": conversation_id}}).to_string()
}

pub fn typing_frame(conversation_id: i64) -> String {
    json!({"type": "TYPING", "payload": {"conversation_id": conversation_id}}).to_string()
}

pub fn stop_typing_frame(conversation_id: i64) -> String {
    json!({"type": "STOP_TYPING", "payload": {"conversation_id": conversation_id}}).to_string()
}

pub fn room_event_frame(conversation_id: i64, event: &str, data: serde_json::Value) -> String {
    json!({
        "type": "ROOM_EVENT",
        "payload": {"conversation_id": conversation_id, "event": event, "data": data}
    })
    .to_string()
}

/// Feed a raw frame to the receive handler as if `connection_id` sent it
pub async fn send_frame(setup: &TestSetup, connection_id: &str, user_id: i64, frame: String) {
    setup
        .input_handler
        .handle_message(&ConnectionId::from(connection_id), user_id, frame)
        .await;
}
