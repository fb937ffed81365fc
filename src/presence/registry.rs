use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::shared::{ConnectionId, UserId};

/// Tracks which connection, if any, currently represents each online user
///
/// None of these operations fail: an offline user, a repeated registration
/// or a late disconnect are all ordinary outcomes.
#[async_trait]
pub trait PresenceRegistry: Send + Sync {
    /// Map `user_id` to `connection_id`, replacing any previous entry for the user
    async fn register(&self, user_id: UserId, connection_id: ConnectionId);

    /// Drop the entry that points at `connection_id`, whichever user it belongs to
    async fn unregister(&self, connection_id: &ConnectionId);

    /// The live connection for `user_id`, if the user is online
    async fn lookup(&self, user_id: UserId) -> Option<ConnectionId>;

    /// Number of users currently online
    async fn online_count(&self) -> usize;
}

#[derive(Default)]
struct PresenceState {
    by_user: HashMap<UserId, ConnectionId>,
    by_connection: HashMap<ConnectionId, UserId>,
}

/// In-memory presence registry
///
/// Both directions live in one struct behind one lock so that a register
/// racing an unregister can never leave the maps disagreeing.
pub struct InMemoryPresenceRegistry {
    state: Arc<RwLock<PresenceState>>,
}

impl InMemoryPresenceRegistry {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(PresenceState::default())),
        }
    }
}

impl Default for InMemoryPresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceRegistry for InMemoryPresenceRegistry {
    async fn register(&self, user_id: UserId, connection_id: ConnectionId) {
        let mut state = self.state.write().await;

        // A connection identifies exactly one user
        if let Some(previous_user) = state.by_connection.get(&connection_id).copied() {
            if previous_user != user_id
                && state.by_user.get(&previous_user) == Some(&connection_id)
            {
                state.by_user.remove(&previous_user);
            }
        }

        if let Some(replaced) = state.by_user.insert(user_id, connection_id.clone()) {
            if replaced != connection_id {
                state.by_connection.remove(&replaced);
                debug!(
                    user_id = user_id,
                    replaced = %replaced,
                    "Presence entry overwritten by newer connection"
                );
            }
        }
        state.by_connection.insert(connection_id.clone(), user_id);

        info!(
            user_id = user_id,
            connection_id = %connection_id,
            "User registered as online"
        );
    }

    async fn unregister(&self, connection_id: &ConnectionId) {
        let mut state = self.state.write().await;

        let Some(user_id) = state.by_connection.remove(connection_id) else {
            debug!(connection_id = %connection_id, "Unregister for unknown connection ignored");
            return;
        };

        if state.by_user.get(&user_id) == Some(connection_id) {
            state.by_user.remove(&user_id);
            info!(
                user_id = user_id,
                connection_id = %connection_id,
                "User went offline"
            );
        }
    }

    async fn lookup(&self, user_id: UserId) -> Option<ConnectionId> {
        let state = self.state.read().await;
        state.by_user.get(&user_id).cloned()
    }

    async fn online_count(&self) -> usize {
        self.state.read().await.by_user.len()
    }
}
