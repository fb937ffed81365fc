use std::sync::Arc;
use tracing::{debug, warn};

use crate::presence::PresenceRegistry;
use crate::shared::UserId;
use crate::websockets::{ConnectionManager, WebSocketMessage};

/// Pushes events to a single user if, and only if, that user is online right now
///
/// Delivery is at-most-once: one lookup, one write, no queue and no retry.
/// Durability belongs to the caller, which persists the event before calling
/// [`EventDispatcher::deliver`] so an offline user finds it on the next fetch.
#[derive(Clone)]
pub struct EventDispatcher {
    presence: Arc<dyn PresenceRegistry>,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl EventDispatcher {
    pub fn new(
        presence: Arc<dyn PresenceRegistry>,
        connection_manager: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self {
            presence,
            connection_manager,
        }
    }

    /// Deliver `event` to `user_id` over their live connection.
    ///
    /// Returns whether a write was handed to the transport. Callers must not
    /// rely on the result for correctness.
    pub async fn deliver(&self, user_id: UserId, event: &WebSocketMessage) -> bool {
        let Some(connection_id) = self.presence.lookup(user_id).await else {
            debug!(
                user_id = user_id,
                message_type = ?event.message_type,
                "User offline, skipping live delivery"
            );
            return false;
        };

        let message_json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!(user_id = user_id, error = %e, "Failed to serialize event");
                return false;
            }
        };

        match self
            .connection_manager
            .send_to_connection(&connection_id, &message_json)
            .await
        {
            Ok(()) => {
                debug!(
                    user_id = user_id,
                    connection_id = %connection_id,
                    message_type = ?event.message_type,
                    "Event delivered"
                );
                true
            }
            Err(e) => {
                warn!(
                    user_id = user_id,
                    connection_id = %connection_id,
                    error = %e,
                    "Live delivery failed, dropping event"
                );
                false
            }
        }
    }
}
