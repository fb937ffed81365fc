use marketplace::{
    auth::TokenConfig,
    build_router,
    follows::PostgresFollowRepository,
    messages::PostgresMessageRepository,
    notifications::PostgresNotificationRepository,
    users::PostgresUserRepository,
    AppConfig, AppState, InMemoryConnectionManager, InMemoryPresenceRegistry,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn postgres_state(config: &AppConfig, pool: sqlx::PgPool) -> AppState {
    AppState::new(
        TokenConfig::from_config(config),
        Arc::new(PostgresUserRepository::new(pool.clone())),
        Arc::new(PostgresNotificationRepository::new(pool.clone())),
        Arc::new(PostgresMessageRepository::new(pool.clone())),
        Arc::new(PostgresFollowRepository::new(pool)),
        Arc::new(InMemoryConnectionManager::new()),
        Arc::new(InMemoryPresenceRegistry::new()),
    )
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketplace=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    info!("Starting marketplace realtime server");

    let app_state = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url)
                .await
                .expect("Failed to connect to database");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");
            info!("Using PostgreSQL repositories");
            postgres_state(&config, pool)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory repositories");
            if config.seed_users.is_empty() {
                warn!("SEED_USERS is empty, every token will be rejected as an unknown user");
            } else {
                info!(seed_users = config.seed_users.len(), "Seeded in-memory user directory");
            }
            AppState::in_memory(&config)
        }
    };

    let app = build_router(app_state, &config);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind address");
    info!("Server running on http://{}", address);
    axum::serve(listener, app).await.expect("Server error");
}
