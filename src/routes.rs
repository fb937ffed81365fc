use axum::{
    http::{header, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::jwt_auth;
use crate::config::AppConfig;
use crate::shared::AppState;
use crate::{follows, messages, notifications, websockets};

/// Assemble the HTTP and WebSocket surface
pub fn build_router(app_state: AppState, config: &AppConfig) -> Router {
    let api = Router::new()
        .route("/notifications", post(notifications::send_notification))
        .route(
            "/notifications/user/:user_id",
            get(notifications::list_notifications),
        )
        .route(
            "/notifications/user/:user_id/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/notifications/user/:user_id/read-all",
            post(notifications::mark_all_read),
        )
        .route("/notifications/:id/read", post(notifications::mark_read))
        .route(
            "/notifications/:id",
            delete(notifications::delete_notification),
        )
        .route(
            "/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/follow/follow-user", post(follows::follow_user))
        .route("/follow/unfollow-user", post(follows::unfollow_user))
        .route("/follow/followers", get(follows::get_followers))
        .route("/follow/following", get(follows::get_following))
        .layer(middleware::from_fn_with_state(app_state.clone(), jwt_auth));

    let router = Router::new()
        .route("/", get(|| async { "Marketplace realtime server" }))
        .route("/ws", get(websockets::websocket_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http());

    let router = if config.cors_allow_any {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
    } else {
        router
    };

    router.with_state(app_state)
}
