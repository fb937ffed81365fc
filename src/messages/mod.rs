// Public API - what other modules can use
pub use handlers::{list_messages, send_message};
pub use models::{MessageModel, NewMessage};
pub use repository::{InMemoryMessageRepository, MessageRepository, PostgresMessageRepository};
pub use service::MessageService;

pub mod models;
pub mod repository;
pub mod service;

// Internal modules
mod handlers;
mod types;
