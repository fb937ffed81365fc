use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::shared::{ConnectionId, ConversationId};
use crate::websockets::{ConnectionManager, WebSocketMessage};

#[derive(Default)]
struct RoomState {
    members: HashMap<ConversationId, BTreeSet<ConnectionId>>,
    // Reverse index so a disconnect can purge without scanning every room
    joined: HashMap<ConnectionId, HashSet<ConversationId>>,
}

/// Conversation rooms: which connections receive a conversation's events
pub struct RoomRouter {
    state: RwLock<RoomState>,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl RoomRouter {
    pub fn new(connection_manager: Arc<dyn ConnectionManager>) -> Self {
        Self {
            state: RwLock::new(RoomState::default()),
            connection_manager,
        }
    }

    /// Add `connection_id` to the conversation's room. Joining twice is harmless.
    pub async fn join(&self, connection_id: &ConnectionId, conversation_id: ConversationId) {
        let mut state = self.state.write().await;
        state
            .members
            .entry(conversation_id)
            .or_default()
            .insert(connection_id.clone());
        state
            .joined
            .entry(connection_id.clone())
            .or_default()
            .insert(conversation_id);

        info!(
            connection_id = %connection_id,
            conversation_id = conversation_id,
            "Connection joined conversation"
        );
    }

    /// Remove `connection_id` from the conversation's room, if it is there
    pub async fn leave(&self, connection_id: &ConnectionId, conversation_id: ConversationId) {
        let mut state = self.state.write().await;

        if let Some(members) = state.members.get_mut(&conversation_id) {
            members.remove(connection_id);
            if members.is_empty() {
                state.members.remove(&conversation_id);
            }
        }
        if let Some(rooms) = state.joined.get_mut(connection_id) {
            rooms.remove(&conversation_id);
            if rooms.is_empty() {
                state.joined.remove(connection_id);
            }
        }

        info!(
            connection_id = %connection_id,
            conversation_id = conversation_id,
            "Connection left conversation"
        );
    }

    /// Drop every membership held by a connection that has gone away
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        let mut state = self.state.write().await;

        let Some(rooms) = state.joined.remove(connection_id) else {
            return;
        };
        for conversation_id in &rooms {
            if let Some(members) = state.members.get_mut(conversation_id) {
                members.remove(connection_id);
                if members.is_empty() {
                    state.members.remove(conversation_id);
                }
            }
        }

        debug!(
            connection_id = %connection_id,
            rooms = rooms.len(),
            "Purged room memberships for disconnected connection"
        );
    }

    /// Snapshot of the connections currently in a conversation room
    pub async fn members(&self, conversation_id: ConversationId) -> Vec<ConnectionId> {
        let state = self.state.read().await;
        state
            .members
            .get(&conversation_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Send `event` to every member of the room except `exclude`.
    ///
    /// Each member is attempted once; a failed write is logged and the rest
    /// still receive the event. Returns the number of successful writes.
    pub async fn broadcast(
        &self,
        conversation_id: ConversationId,
        event: &WebSocketMessage,
        exclude: Option<&ConnectionId>,
    ) -> usize {
        // Snapshot under the lock, write without it
        let recipients: Vec<ConnectionId> = self
            .members(conversation_id)
            .await
            .into_iter()
            .filter(|member| Some(member) != exclude)
            .collect();

        if recipients.is_empty() {
            debug!(conversation_id = conversation_id, "No recipients for broadcast");
            return 0;
        }

        let message_json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!(
                    conversation_id = conversation_id,
                    error = %e,
                    "Failed to serialize broadcast event"
                );
                return 0;
            }
        };

        let mut delivered = 0;
        for connection_id in &recipients {
            match self
                .connection_manager
                .send_to_connection(connection_id, &message_json)
                .await
            {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        conversation_id = conversation_id,
                        connection_id = %connection_id,
                        error = %e,
                        "Skipping room member that could not be reached"
                    );
                }
            }
        }

        debug!(
            conversation_id = conversation_id,
            message_type = ?event.message_type,
            recipients = recipients.len(),
            delivered = delivered,
            "Room broadcast complete"
        );
        delivered
    }
}
