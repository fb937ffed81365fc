use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::TokenConfig;
use crate::config::AppConfig;
use crate::event::EventDispatcher;
use crate::follows::{
    repository::{FollowRepository, InMemoryFollowRepository},
    service::FollowService,
};
use crate::messages::{
    repository::{InMemoryMessageRepository, MessageRepository},
    service::MessageService,
};
use crate::notifications::{
    repository::{InMemoryNotificationRepository, NotificationRepository},
    service::NotificationService,
};
use crate::presence::{InMemoryPresenceRegistry, PresenceRegistry};
use crate::rooms::RoomRouter;
use crate::users::repository::{InMemoryUserRepository, UserRepository};
use crate::websockets::{ConnectionManager, InMemoryConnectionManager};

/// Account identifier supplied by the authentication layer
pub type UserId = i64;

/// Conversation identifier; one room per conversation
pub type ConversationId = i64;

/// Opaque identifier of one live WebSocket connection.
///
/// Presence and room state only ever hold this id; the outbound channel
/// itself is owned by the [`ConnectionManager`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Allocates a fresh, globally unique connection id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub token_config: TokenConfig,
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub connection_manager: Arc<dyn ConnectionManager>,
    pub presence: Arc<dyn PresenceRegistry>,
    pub room_router: Arc<RoomRouter>,
    pub dispatcher: EventDispatcher,
    pub notification_service: Arc<NotificationService>,
    pub message_service: Arc<MessageService>,
    pub follow_service: Arc<FollowService>,
}

impl AppState {
    /// Wires services on top of the given repositories and transport
    pub fn new(
        token_config: TokenConfig,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        notification_repository: Arc<dyn NotificationRepository + Send + Sync>,
        message_repository: Arc<dyn MessageRepository + Send + Sync>,
        follow_repository: Arc<dyn FollowRepository + Send + Sync>,
        connection_manager: Arc<dyn ConnectionManager>,
        presence: Arc<dyn PresenceRegistry>,
    ) -> Self {
        let room_router = Arc::new(RoomRouter::new(Arc::clone(&connection_manager)));
        let dispatcher = EventDispatcher::new(Arc::clone(&presence), Arc::clone(&connection_manager));

        let notification_service = Arc::new(NotificationService::new(
            notification_repository,
            dispatcher.clone(),
        ));
        let message_service = Arc::new(MessageService::new(
            message_repository,
            Arc::clone(&user_repository),
            Arc::clone(&room_router),
            Arc::clone(&notification_service),
        ));
        let follow_service = Arc::new(FollowService::new(
            follow_repository,
            Arc::clone(&user_repository),
            Arc::clone(&notification_service),
        ));

        Self {
            token_config,
            user_repository,
            connection_manager,
            presence,
            room_router,
            dispatcher,
            notification_service,
            message_service,
            follow_service,
        }
    }

    /// State backed entirely by memory, with the user directory preloaded
    /// from `config.seed_users`
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            TokenConfig::from_config(config),
            Arc::new(InMemoryUserRepository::with_users(config.seed_users.clone())),
            Arc::new(InMemoryNotificationRepository::new()),
            Arc::new(InMemoryMessageRepository::new()),
            Arc::new(InMemoryFollowRepository::new()),
            Arc::new(InMemoryConnectionManager::new()),
            Arc::new(InMemoryPresenceRegistry::new()),
        )
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            // Invalid or expired tokens are rejected with 403, missing ones with 401
            AppError::JwtError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

/// Standard success envelope: `{status: true, message, data?}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::follows::repository::InMemoryFollowRepository;
    use crate::messages::repository::InMemoryMessageRepository;
    use crate::notifications::repository::InMemoryNotificationRepository;
    use crate::presence::InMemoryPresenceRegistry;
    use crate::users::{models::UserModel, repository::InMemoryUserRepository};
    use crate::websockets::InMemoryConnectionManager;

    /// Builder for creating AppState with in-memory repositories for testing
    pub struct AppStateBuilder {
        users: Vec<UserModel>,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self { users: Vec::new() }
        }

        pub fn with_users(mut self, users: Vec<UserModel>) -> Self {
            self.users = users;
            self
        }

        pub fn build(self) -> AppState {
            AppState::new(
                TokenConfig::with_secret("test-secret", 7),
                Arc::new(InMemoryUserRepository::with_users(self.users)),
                Arc::new(InMemoryNotificationRepository::new()),
                Arc::new(InMemoryMessageRepository::new()),
                Arc::new(InMemoryFollowRepository::new()),
                Arc::new(InMemoryConnectionManager::new()),
                Arc::new(InMemoryPresenceRegistry::new()),
            )
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
