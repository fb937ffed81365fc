use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

use marketplace::websockets::{SocketError, SocketWrapper};
use marketplace::{ConnectionId, ConnectionManager, DeliveryError};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Records every frame per connection instead of writing to a socket
#[derive(Clone, Default)]
pub struct MockConnectionManager {
    sent_messages: Arc<RwLock<HashMap<ConnectionId, VecDeque<String>>>>,
    connected: Arc<RwLock<HashSet<ConnectionId>>>,
    broken: Arc<RwLock<HashSet<ConnectionId>>>,
}

impl MockConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, connection_id: &str) {
        self.connected
            .write()
            .await
            .insert(ConnectionId::from(connection_id));
    }

    /// Writes to this connection fail as if its channel had closed
    pub async fn break_connection(&self, connection_id: &str) {
        self.broken
            .write()
            .await
            .insert(ConnectionId::from(connection_id));
    }

    pub async fn is_connected(&self, connection_id: &ConnectionId) -> bool {
        self.connected.read().await.contains(connection_id)
    }

    pub async fn get_messages_for(&self, connection_id: &str) -> Vec<String> {
        self.sent_messages
            .read()
            .await
            .get(&ConnectionId::from(connection_id))
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Pop the oldest frame sent to a connection
    pub async fn consume_message_for(&self, connection_id: &str) -> Option<String> {
        self.sent_messages
            .write()
            .await
            .get_mut(&ConnectionId::from(connection_id))
            .and_then(|queue| queue.pop_front())
    }

    pub async fn clear_messages(&self) {
        self.sent_messages.write().await.clear();
    }
}

#[async_trait]
impl ConnectionManager for MockConnectionManager {
    async fn add_connection(&self, connection_id: ConnectionId, _sender: mpsc::UnboundedSender<String>) {
        self.connected.write().await.insert(connection_id);
    }

    async fn remove_connection(&self, connection_id: &ConnectionId) {
        self.connected.write().await.remove(connection_id);
    }

    async fn send_to_connection(
        &self,
        connection_id: &ConnectionId,
        message: &str,
    ) -> Result<(), DeliveryError> {
        if !self.connected.read().await.contains(connection_id) {
            return Err(DeliveryError::NotConnected(connection_id.clone()));
        }
        if self.broken.read().await.contains(connection_id) {
            return Err(DeliveryError::ChannelClosed(connection_id.clone()));
        }

        self.sent_messages
            .write()
            .await
            .entry(connection_id.clone())
            .or_default()
            .push_back(message.to_string());
        Ok(())
    }

    async fn count_connections(&self) -> usize {
        self.connected.read().await.len()
    }
}

/// Client side of a [`ScriptedSocket`]
pub struct ScriptedClient {
    pub inbound: mpsc::UnboundedSender<Option<String>>,
    pub written: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClient {
    pub fn send(&self, frame: &str) {
        let _ = self.inbound.send(Some(frame.to_string()));
    }

    pub fn hang_up(&self) {
        let _ = self.inbound.send(None);
    }
}

/// Socket driven by the test: frames sent through the client are received
/// by the server, frames the server writes are collected in `written`
pub struct ScriptedSocket {
    inbound: mpsc::UnboundedReceiver<Option<String>>,
    written: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSocket {
    pub fn pair() -> (Self, ScriptedClient) {
        let (tx, rx) = mpsc::unbounded_channel();
        let written = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                inbound: rx,
                written: written.clone(),
            },
            ScriptedClient {
                inbound: tx,
                written,
            },
        )
    }
}

#[async_trait]
impl SocketWrapper for ScriptedSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.written.lock().await.push(message);
        Ok(())
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        match self.inbound.recv().await {
            Some(frame) => Ok(frame),
            None => Err(SocketError::ConnectionClosed),
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        Ok(())
    }
}
