// Public API
pub use connection_manager::{ConnectionManager, DeliveryError, InMemoryConnectionManager};
pub use handler::{serve_connection, websocket_handler, WebsocketReceiveHandler};
pub use messages::{
    ConnectedPayload, ConversationPayload, ErrorPayload, MessageType, RoomEventPayload,
    TypingPayload, WebSocketMessage, WebSocketMessageMeta,
};
pub use socket::{Connection, MessageHandler, SocketError, SocketWrapper};

// Internal modules
mod connection_manager;
mod handler;
mod messages;
mod socket;
