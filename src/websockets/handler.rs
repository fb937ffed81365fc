use async_trait::async_trait;
use axum::{
    extract::{ws::rejection::WebSocketUpgradeRejection, Query, State, WebSocketUpgrade},
    http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderMap},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::authenticate;
use crate::rooms::RoomRouter;
use crate::shared::{AppError, AppState, ConnectionId, UserId};

use super::connection_manager::ConnectionManager;
use super::messages::{ConversationPayload, MessageType, RoomEventPayload, WebSocketMessage};
use super::socket::{Connection, MessageHandler, SocketWrapper};

/// Message handler for frames received from a client
pub struct WebsocketReceiveHandler {
    room_router: Arc<RoomRouter>,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl WebsocketReceiveHandler {
    pub fn new(room_router: Arc<RoomRouter>, connection_manager: Arc<dyn ConnectionManager>) -> Self {
        Self {
            room_router,
            connection_manager,
        }
    }

    async fn reply_error(&self, connection_id: &ConnectionId, message: String) {
        let frame = match serde_json::to_string(&WebSocketMessage::error(message)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to serialize error frame");
                return;
            }
        };

        if let Err(e) = self
            .connection_manager
            .send_to_connection(connection_id, &frame)
            .await
        {
            debug!(connection_id = %connection_id, error = %e, "Could not send error frame");
        }
    }

    async fn dispatch(
        &self,
        connection_id: &ConnectionId,
        user_id: UserId,
        ws_message: WebSocketMessage,
    ) -> Result<(), String> {
        match ws_message.message_type {
            MessageType::JoinConversation => {
                let payload: ConversationPayload =
                    ws_message.payload_as().map_err(|e| e.to_string())?;
                self.room_router
                    .join(connection_id, payload.conversation_id)
                    .await;
            }
            MessageType::LeaveConversation => {
                let payload: ConversationPayload =
                    ws_message.payload_as().map_err(|e| e.to_string())?;
                self.room_router
                    .leave(connection_id, payload.conversation_id)
                    .await;
            }
            MessageType::Typing => {
                let payload: ConversationPayload =
                    ws_message.payload_as().map_err(|e| e.to_string())?;
                self.room_router
                    .broadcast(
                        payload.conversation_id,
                        &WebSocketMessage::user_typing(user_id, payload.conversation_id),
                        Some(connection_id),
                    )
                    .await;
            }
            MessageType::StopTyping => {
                let payload: ConversationPayload =
                    ws_message.payload_as().map_err(|e| e.to_string())?;
                self.room_router
                    .broadcast(
                        payload.conversation_id,
                        &WebSocketMessage::user_stopped_typing(user_id, payload.conversation_id),
                        Some(connection_id),
                    )
                    .await;
            }
            MessageType::RoomEvent => {
                let mut payload: RoomEventPayload =
                    ws_message.payload_as().map_err(|e| e.to_string())?;
                // Never trust a client-supplied sender
                payload.sender_id = Some(user_id);
                let conversation_id = payload.conversation_id;
                self.room_router
                    .broadcast(
                        conversation_id,
                        &WebSocketMessage::room_event(payload),
                        Some(connection_id),
                    )
                    .await;
            }
            other => {
                return Err(format!("Unsupported message type: {:?}", other));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for WebsocketReceiveHandler {
    async fn handle_message(&self, connection_id: &ConnectionId, user_id: UserId, message: String) {
        debug!(
            connection_id = %connection_id,
            user_id = user_id,
            message = %message,
            "Received message"
        );

        let result = match serde_json::from_str::<WebSocketMessage>(&message) {
            Ok(ws_message) => self.dispatch(connection_id, user_id, ws_message).await,
            Err(e) => Err(format!("Invalid message: {}", e)),
        };

        if let Err(reason) = result {
            warn!(
                connection_id = %connection_id,
                user_id = user_id,
                error = %reason,
                "Rejected WebSocket frame"
            );
            self.reply_error(connection_id, reason).await;
        }
    }
}

/// Query parameters accepted on the upgrade request
#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    pub token: Option<String>,
}

/// Picks the token for an upgrade request: the first non-empty entry of
/// `Sec-WebSocket-Protocol`, otherwise the `token` query parameter.
///
/// The flag is true when the token came from the protocol header and has to
/// be echoed back as the selected subprotocol.
pub(crate) fn extract_token(
    headers: &HeaderMap,
    query_token: Option<String>,
) -> Option<(String, bool)> {
    let protocol_token = headers
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').map(str::trim).find(|s| !s.is_empty()))
        .map(str::to_string);

    match protocol_token {
        Some(token) => Some((token, true)),
        None => query_token
            .filter(|token| !token.trim().is_empty())
            .map(|token| (token, false)),
    }
}

/// WebSocket endpoint
///
/// GET /ws with the JWT in the Sec-WebSocket-Protocol header (browsers cannot
/// set Authorization on an upgrade) or in a `token` query parameter.
/// Authentication runs before the upgrade is accepted.
pub async fn websocket_handler(
    headers: HeaderMap,
    Query(query): Query<WebSocketQuery>,
    State(app_state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let Some((token, from_protocol)) = extract_token(&headers, query.token) else {
        warn!("Missing WebSocket authentication token");
        return Err(AppError::Unauthorized(
            "Missing authentication token".to_string(),
        ));
    };

    let user = authenticate(&app_state, &token).await?;

    info!(user_id = user.id, "WebSocket authentication successful");

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(user_id = user.id, error = %rejection, "Request is not a WebSocket upgrade");
            return Ok(rejection.into_response());
        }
    };

    // Echo the protocol back, otherwise browsers abort the handshake
    let ws = if from_protocol { ws.protocols([token]) } else { ws };

    let user_id = user.id;
    Ok(ws.on_upgrade(move |socket| serve_connection(app_state, user_id, Box::new(socket))))
}

/// Drive one authenticated connection from registration to cleanup
pub async fn serve_connection(app_state: AppState, user_id: UserId, socket: Box<dyn SocketWrapper>) {
    let connection_id = ConnectionId::generate();

    // Create the outbound channel (app -> client)
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();

    app_state
        .connection_manager
        .add_connection(connection_id.clone(), outbound_sender.clone())
        .await;
    app_state
        .presence
        .register(user_id, connection_id.clone())
        .await;

    let online_users = app_state.presence.online_count().await;
    let open_connections = app_state.connection_manager.count_connections().await;
    info!(
        user_id = user_id,
        connection_id = %connection_id,
        online_users = online_users,
        open_connections = open_connections,
        "WebSocket connection established"
    );

    match serde_json::to_string(&WebSocketMessage::connected(user_id, connection_id.clone())) {
        Ok(json) => {
            let _ = outbound_sender.send(json);
        }
        Err(e) => warn!(error = %e, "Failed to serialize CONNECTED frame"),
    }

    let message_handler = Arc::new(WebsocketReceiveHandler::new(
        Arc::clone(&app_state.room_router),
        Arc::clone(&app_state.connection_manager),
    ));

    let connection = Connection::new(
        connection_id.clone(),
        user_id,
        socket,
        outbound_receiver,
        message_handler,
    );

    match connection.run().await {
        Ok(()) => {
            info!(
                user_id = user_id,
                connection_id = %connection_id,
                "WebSocket connection closed cleanly"
            );
        }
        Err(e) => {
            warn!(
                user_id = user_id,
                connection_id = %connection_id,
                error = %e,
                "WebSocket connection error"
            );
        }
    }

    // Cleanup order: presence, rooms, transport
    app_state.presence.unregister(&connection_id).await;
    app_state.room_router.disconnect(&connection_id).await;
    app_state
        .connection_manager
        .remove_connection(&connection_id)
        .await;

    info!(
        user_id = user_id,
        connection_id = %connection_id,
        "WebSocket connection cleaned up"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websockets::InMemoryConnectionManager;

    struct Setup {
        handler: WebsocketReceiveHandler,
        rooms: Arc<RoomRouter>,
        manager: Arc<InMemoryConnectionManager>,
    }

    fn setup() -> Setup {
        let manager = Arc::new(InMemoryConnectionManager::new());
        let rooms = Arc::new(RoomRouter::new(manager.clone()));
        Setup {
            handler: WebsocketReceiveHandler::new(rooms.clone(), manager.clone()),
            rooms,
            manager,
        }
    }

    async fn connect(s: &Setup, id: &str) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        s.manager.add_connection(ConnectionId::from(id), tx).await;
        rx
    }

    fn next_frame(rx: &mut mpsc::UnboundedReceiver<String>) -> WebSocketMessage {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_join_and_leave_conversation() {
        let s = setup();
        let a = ConnectionId::from("a");

        s.handler
            .handle_message(&a, 1, r#"{"type":"JOIN_CONVERSATION","payload":{"conversation_id":5}}"#.to_string())
            .await;
        assert_eq!(s.rooms.members(5).await, vec![a.clone()]);

        s.handler
            .handle_message(&a, 1, r#"{"type":"LEAVE_CONVERSATION","payload":{"conversation_id":5}}"#.to_string())
            .await;
        assert!(s.rooms.members(5).await.is_empty());
    }

    #[tokio::test]
    async fn test_typing_excludes_sender() {
        let s = setup();
        let mut a_rx = connect(&s, "a").await;
        let mut b_rx = connect(&s, "b").await;
        s.rooms.join(&ConnectionId::from("a"), 5).await;
        s.rooms.join(&ConnectionId::from("b"), 5).await;

        s.handler
            .handle_message(
                &ConnectionId::from("a"),
                1,
                r#"{"type":"TYPING","payload":{"conversation_id":5}}"#.to_string(),
            )
            .await;

        let frame = next_frame(&mut b_rx);
        assert_eq!(frame.message_type, MessageType::UserTyping);
        assert_eq!(frame.payload["user_id"], 1);
        assert_eq!(frame.payload["conversation_id"], 5);
        assert!(a_rx.try_recv().is_err());

        s.handler
            .handle_message(
                &ConnectionId::from("a"),
                1,
                r#"{"type":"STOP_TYPING","payload":{"conversation_id":5}}"#.to_string(),
            )
            .await;
        assert_eq!(next_frame(&mut b_rx).message_type, MessageType::UserStoppedTyping);
    }

    #[tokio::test]
    async fn test_room_event_relayed_with_server_sender() {
        let s = setup();
        let _a_rx = connect(&s, "a").await;
        let mut b_rx = connect(&s, "b").await;
        s.rooms.join(&ConnectionId::from("a"), 5).await;
        s.rooms.join(&ConnectionId::from("b"), 5).await;

        let raw = r#"{"type":"ROOM_EVENT","payload":{"conversation_id":5,"event":"offer","data":{"price":10},"sender_id":999}}"#;
        s.handler
            .handle_message(&ConnectionId::from("a"), 1, raw.to_string())
            .await;

        let frame = next_frame(&mut b_rx);
        assert_eq!(frame.message_type, MessageType::RoomEvent);
        let payload: RoomEventPayload = frame.payload_as().unwrap();
        assert_eq!(payload.event, "offer");
        assert_eq!(payload.data["price"], 10);
        assert_eq!(payload.sender_id, Some(1));
    }

    #[tokio::test]
    async fn test_bad_frames_get_error_reply() {
        let s = setup();
        let mut a_rx = connect(&s, "a").await;
        let a = ConnectionId::from("a");

        s.handler.handle_message(&a, 1, "not json".to_string()).await;
        assert_eq!(next_frame(&mut a_rx).message_type, MessageType::Error);

        // Valid type, missing payload field
        s.handler
            .handle_message(&a, 1, r#"{"type":"JOIN_CONVERSATION","payload":{}}"#.to_string())
            .await;
        assert_eq!(next_frame(&mut a_rx).message_type, MessageType::Error);

        // Server-to-client type sent by a client
        s.handler
            .handle_message(&a, 1, r#"{"type":"NOTIFICATION","payload":{}}"#.to_string())
            .await;
        let frame = next_frame(&mut a_rx);
        assert_eq!(frame.message_type, MessageType::Error);
        assert!(frame.payload["message"]
            .as_str()
            .unwrap()
            .contains("Unsupported"));
    }

    mod upgrade {
        use super::super::*;
        use crate::shared::test_utils::AppStateBuilder;
        use crate::users::UserModel;
        use axum::{
            body::Body,
            http::{Request, StatusCode},
            routing::get,
            Router,
        };
        use rstest::rstest;
        use tower::ServiceExt; // for `oneshot`

        fn headers(protocol: Option<&str>) -> HeaderMap {
            let mut headers = HeaderMap::new();
            if let Some(value) = protocol {
                headers.insert(SEC_WEBSOCKET_PROTOCOL, value.parse().unwrap());
            }
            headers
        }

        #[rstest]
        #[case(Some("abc"), None, Some(("abc", true)))]
        #[case(Some("abc, chat"), None, Some(("abc", true)))]
        #[case(Some(" , abc"), None, Some(("abc", true)))]
        #[case(Some("abc"), Some("xyz"), Some(("abc", true)))]
        #[case(None, Some("xyz"), Some(("xyz", false)))]
        #[case(Some(" , "), Some("xyz"), Some(("xyz", false)))]
        #[case(None, Some(""), None)]
        #[case(None, None, None)]
        fn test_extract_token(
            #[case] protocol: Option<&str>,
            #[case] query: Option<&str>,
            #[case] expected: Option<(&str, bool)>,
        ) {
            let token = extract_token(&headers(protocol), query.map(str::to_string));
            assert_eq!(
                token,
                expected.map(|(token, from_protocol)| (token.to_string(), from_protocol))
            );
        }

        fn state() -> AppState {
            AppStateBuilder::new()
                .with_users(vec![UserModel::new(1, "ann@example.com", "Ann", "Lee")])
                .build()
        }

        fn app(state: AppState) -> Router {
            Router::new()
                .route("/ws", get(websocket_handler))
                .with_state(state)
        }

        // Plain GET without upgrade headers, so an accepted token surfaces as
        // the upgrade rejection instead of a handshake
        fn request(uri: &str, protocol: Option<&str>) -> Request<Body> {
            let mut builder = Request::builder().uri(uri);
            if let Some(value) = protocol {
                builder = builder.header(SEC_WEBSOCKET_PROTOCOL, value);
            }
            builder.body(Body::empty()).unwrap()
        }

        async fn status(state: &AppState, uri: &str, protocol: Option<&str>) -> StatusCode {
            app(state.clone())
                .oneshot(request(uri, protocol))
                .await
                .unwrap()
                .status()
        }

        #[tokio::test]
        async fn test_missing_token_is_unauthorized() {
            let state = state();
            assert_eq!(status(&state, "/ws", None).await, StatusCode::UNAUTHORIZED);
            assert_eq!(
                status(&state, "/ws?token=", None).await,
                StatusCode::UNAUTHORIZED
            );
        }

        #[tokio::test]
        async fn test_invalid_token_is_forbidden() {
            let state = state();
            assert_eq!(
                status(&state, "/ws?token=not.a.jwt", None).await,
                StatusCode::FORBIDDEN
            );
            assert_eq!(
                status(&state, "/ws", Some("not.a.jwt")).await,
                StatusCode::FORBIDDEN
            );
        }

        #[tokio::test]
        async fn test_unknown_user_is_unauthorized() {
            let state = state();
            let token = state.token_config.create_token(99).unwrap();
            assert_eq!(
                status(&state, &format!("/ws?token={}", token), None).await,
                StatusCode::UNAUTHORIZED
            );
        }

        #[tokio::test]
        async fn test_valid_token_reaches_upgrade() {
            let state = state();
            let token = state.token_config.create_token(1).unwrap();

            assert_eq!(
                status(&state, &format!("/ws?token={}", token), None).await,
                StatusCode::BAD_REQUEST
            );
            assert_eq!(
                status(&state, "/ws", Some(&format!("{}, chat", token))).await,
                StatusCode::BAD_REQUEST
            );
            assert_eq!(state.presence.online_count().await, 0);
        }

        #[tokio::test]
        async fn test_protocol_header_takes_precedence_over_query() {
            let state = state();
            let token = state.token_config.create_token(1).unwrap();

            assert_eq!(
                status(&state, "/ws?token=not.a.jwt", Some(&token)).await,
                StatusCode::BAD_REQUEST
            );
            assert_eq!(
                status(&state, &format!("/ws?token={}", token), Some("not.a.jwt")).await,
                StatusCode::FORBIDDEN
            );
        }
    }
}
