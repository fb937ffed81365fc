use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::shared::ConnectionId;

/// Why a single outbound write did not happen
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Connection {0} is not connected")]
    NotConnected(ConnectionId),

    #[error("Outbound channel for connection {0} is closed")]
    ChannelClosed(ConnectionId),
}

/// Owns the outbound side of every live connection
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn add_connection(&self, connection_id: ConnectionId, sender: mpsc::UnboundedSender<String>);

    async fn remove_connection(&self, connection_id: &ConnectionId);

    async fn send_to_connection(
        &self,
        connection_id: &ConnectionId,
        message: &str,
    ) -> Result<(), DeliveryError>;

    async fn count_connections(&self) -> usize;
}

pub struct InMemoryConnectionManager {
    // connection id -> sender
    connections: Arc<RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<String>>>>,
}

impl InMemoryConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionManager {
    async fn add_connection(&self, connection_id: ConnectionId, sender: mpsc::UnboundedSender<String>) {
        let mut connections = self.connections.write().await;
        connections.insert(connection_id, sender);
    }

    async fn remove_connection(&self, connection_id: &ConnectionId) {
        let mut connections = self.connections.write().await;
        connections.remove(connection_id);
    }

    async fn send_to_connection(
        &self,
        connection_id: &ConnectionId,
        message: &str,
    ) -> Result<(), DeliveryError> {
        let connections = self.connections.read().await;
        let sender = connections
            .get(connection_id)
            .ok_or_else(|| DeliveryError::NotConnected(connection_id.clone()))?;

        sender.send(message.to_string()).map_err(|_| {
            debug!(connection_id = %connection_id, "Outbound channel already closed");
            DeliveryError::ChannelClosed(connection_id.clone())
        })
    }

    async fn count_connections(&self) -> usize {
        self.connections.read().await.len()
    }
}
