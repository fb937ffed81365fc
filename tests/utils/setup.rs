use std::sync::Arc;

use marketplace::{
    auth::TokenConfig,
    follows::InMemoryFollowRepository,
    messages::InMemoryMessageRepository,
    notifications::InMemoryNotificationRepository,
    users::{InMemoryUserRepository, UserModel},
    AppState, ConnectionId, InMemoryPresenceRegistry, WebsocketReceiveHandler,
};

use super::mocks::MockConnectionManager;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub const TEST_SECRET: &str = "integration-secret";

pub struct TestSetup {
    pub state: AppState,
    pub mock_conn_manager: Arc<MockConnectionManager>,
    pub notification_repository: Arc<InMemoryNotificationRepository>,
    pub input_handler: WebsocketReceiveHandler,
}

impl TestSetup {
    /// Mark the connection as open and register it for `user_id`
    pub async fn go_online(&self, user_id: i64, connection_id: &str) {
        self.mock_conn_manager.connect(connection_id).await;
        self.state
            .presence
            .register(user_id, ConnectionId::from(connection_id))
            .await;
    }

    pub async fn join(&self, connection_id: &str, conversation_id: i64) {
        self.mock_conn_manager.connect(connection_id).await;
        self.state
            .room_router
            .join(&ConnectionId::from(connection_id), conversation_id)
            .await;
    }

    pub fn bearer(&self, user_id: i64) -> String {
        let token = self
            .state
            .token_config
            .create_token(user_id)
            .expect("token");
        format!("Bearer {}", token)
    }
}

pub struct TestSetupBuilder {
    users: Vec<UserModel>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self { users: vec![] }
    }

    pub fn with_users(mut self, users: Vec<UserModel>) -> Self {
        self.users = users;
        self
    }

    /// Ann (1), Bob (2) and Cat (3)
    pub fn with_three_users(self) -> Self {
        self.with_users(vec![
            UserModel::new(1, "ann@example.com", "Ann", "Lee"),
            UserModel::new(2, "bob@example.com", "Bob", "Ray"),
            UserModel::new(3, "cat@example.com", "Cat", "Kim"),
        ])
    }

    pub fn build(self) -> TestSetup {
        let mock_conn_manager = Arc::new(MockConnectionManager::new());
        let notification_repository = Arc::new(InMemoryNotificationRepository::new());

        let state = AppState::new(
            TokenConfig::with_secret(TEST_SECRET, 7),
            Arc::new(InMemoryUserRepository::with_users(self.users)),
            notification_repository.clone(),
            Arc::new(InMemoryMessageRepository::new()),
            Arc::new(InMemoryFollowRepository::new()),
            mock_conn_manager.clone(),
            Arc::new(InMemoryPresenceRegistry::new()),
        );

        let input_handler = WebsocketReceiveHandler::new(
            Arc::clone(&state.room_router),
            mock_conn_manager.clone(),
        );

        TestSetup {
            state,
            mock_conn_manager,
            notification_repository,
            input_handler,
        }
    }
}
