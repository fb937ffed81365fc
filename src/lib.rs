// Library crate for the marketplace realtime server
// This file exposes the public API for the binary and integration tests

pub mod auth;
pub mod config;
pub mod event;
pub mod follows;
pub mod messages;
pub mod notifications;
pub mod presence;
pub mod rooms;
pub mod routes;
pub mod shared;
pub mod users;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use event::EventDispatcher;
pub use presence::{InMemoryPresenceRegistry, PresenceRegistry};
pub use rooms::RoomRouter;
pub use routes::build_router;
pub use shared::{AppError, AppState, ConnectionId, ConversationId, UserId};
pub use websockets::{
    ConnectionManager, DeliveryError, InMemoryConnectionManager, MessageHandler, MessageType,
    WebSocketMessage, WebsocketReceiveHandler,
};
