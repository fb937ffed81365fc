use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument};

use super::{
    models::MessageModel,
    types::{MessageListQuery, SendMessageRequest},
};
use crate::auth::AuthUser;
use crate::shared::{ApiResponse, AppError, AppState};

/// HTTP handler for sending a message
///
/// POST /api/messages
#[instrument(name = "send_message", skip(state, user, request), fields(sender_id = user.id))]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageModel>>), AppError> {
    let (Some(receiver_id), Some(conversation_id), Some(content)) =
        (request.receiver_id, request.conversation_id, request.content)
    else {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    };

    let message = state
        .message_service
        .send_message(user.id, receiver_id, conversation_id, &content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Message sent successfully", message)),
    ))
}

/// HTTP handler for fetching a conversation's history
///
/// GET /api/messages?conversation_id=N
/// Returns messages oldest first
#[instrument(name = "list_messages", skip(state, _user))]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Query(query): Query<MessageListQuery>,
) -> Result<Json<ApiResponse<Vec<MessageModel>>>, AppError> {
    let conversation_id = query
        .conversation_id
        .ok_or_else(|| AppError::BadRequest("conversation_id is required".to_string()))?;

    let messages = state.message_service.list_messages(conversation_id).await?;

    info!(
        conversation_id = conversation_id,
        message_count = messages.len(),
        "Messages fetched"
    );

    Ok(Json(ApiResponse::ok("Messages fetched successfully", messages)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt_auth;
    use crate::shared::test_utils::AppStateBuilder;
    use crate::users::UserModel;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use serde_json::Value;
    use tower::ServiceExt; // for `oneshot`

    fn setup() -> (AppState, Router, String) {
        let state = AppStateBuilder::new()
            .with_users(vec![
                UserModel::new(1, "ann@example.com", "Ann", "Lee"),
                UserModel::new(2, "bob@example.com", "Bob", "Ray"),
            ])
            .build();
        let token = state.token_config.create_token(1).unwrap();
        let app = Router::new()
            .route("/api/messages", get(list_messages).post(send_message))
            .layer(middleware::from_fn_with_state(state.clone(), jwt_auth))
            .with_state(state.clone());
        (state, app, format!("Bearer {}", token))
    }

    #[tokio::test]
    async fn test_post_message_uses_authenticated_sender() {
        let (state, app, auth) = setup();

        let request = Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header("Authorization", auth)
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"receiver_id": 2, "conversation_id": 5, "content": "hi"}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["sender_id"], 1);
        assert_eq!(json["data"]["conversation_id"], 5);

        assert_eq!(state.message_service.list_messages(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_messages_requires_conversation_id() {
        let (_state, app, auth) = setup();

        let request = Request::builder()
            .uri("/api/messages")
            .header("Authorization", auth)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_messages_oldest_first() {
        let (state, app, auth) = setup();
        state.message_service.send_message(1, 2, 3, "one").await.unwrap();
        state.message_service.send_message(2, 1, 3, "two").await.unwrap();

        let request = Request::builder()
            .uri("/api/messages?conversationId=3")
            .header("Authorization", auth)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        let data = json["data"].as_array().unwrap();
        assert_eq!(data[0]["content"], "one");
        assert_eq!(data[1]["content"], "two");
    }
}
