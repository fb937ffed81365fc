//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use marketplace::websockets::{MessageType, WebSocketMessage};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct MessageAssertion<'a> {
    setup: &'a TestSetup,
    connections: Vec<&'a str>,
}

impl<'a> MessageAssertion<'a> {
    pub fn for_connections(setup: &'a TestSetup, connections: Vec<&'a str>) -> Self {
        Self { setup, connections }
    }

    pub fn for_connection(setup: &'a TestSetup, connection: &'a str) -> Self {
        Self::for_connections(setup, vec![connection])
    }

    /// Assert that each connection received a message of this type (consumes it from the queue)
    pub async fn received_message_type(self, expected_type: MessageType) -> MessageContent {
        let mut messages = vec![];

        for connection in &self.connections {
            let message = self
                .setup
                .mock_conn_manager
                .consume_message_for(connection)
                .await;
            assert!(
                message.is_some(),
                "{} should have received a message",
                connection
            );

            let msg: WebSocketMessage = serde_json::from_str(&message.unwrap()).unwrap();
            assert_eq!(
                msg.message_type, expected_type,
                "{} received wrong message type",
                connection
            );
            messages.push(msg);
        }

        // Broadcasts carry the same payload to everyone
        if let Some(first) = messages.first() {
            for msg in messages.iter().skip(1) {
                assert_eq!(msg.payload, first.payload, "payloads differ between connections");
            }
        }

        MessageContent { messages }
    }

    /// Assert that no connection has anything queued
    pub async fn received_nothing(self) {
        for connection in &self.connections {
            let pending = self.setup.mock_conn_manager.get_messages_for(connection).await;
            assert!(
                pending.is_empty(),
                "{} should not have received anything, got {:?}",
                connection,
                pending
            );
        }
    }
}

pub struct MessageContent {
    messages: Vec<WebSocketMessage>,
}

impl MessageContent {
    pub fn payload(&self) -> &serde_json::Value {
        &self.messages[0].payload
    }

    pub fn with_field(self, field: &str, expected: serde_json::Value) -> Self {
        assert_eq!(
            self.payload()[field],
            expected,
            "payload field {} mismatch",
            field
        );
        self
    }
}
