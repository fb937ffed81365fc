use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument, warn};

use super::{
    models::NotificationModel,
    types::{
        MarkAllReadResponse, NotificationListResponse, SendNotificationRequest,
        UnreadCountResponse,
    },
};
use crate::auth::AuthUser;
use crate::shared::{ApiResponse, AppError, AppState, UserId};

fn ensure_owner(user: &AuthUser, owner_id: UserId) -> Result<(), AppError> {
    if user.can_act_for(owner_id) {
        Ok(())
    } else {
        warn!(
            user_id = user.id,
            owner_id = owner_id,
            "Rejected access to another user's notifications"
        );
        Err(AppError::Forbidden(
            "Cannot access another user's notifications".to_string(),
        ))
    }
}

/// HTTP handler for sending a notification
///
/// POST /api/notifications
/// Persists the notification and pushes it live when the recipient is online
#[instrument(name = "send_notification", skip(state, user, request), fields(sender_id = user.id))]
pub async fn send_notification(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<SendNotificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<NotificationModel>>), AppError> {
    let notification = request.into_new_notification()?;

    let record = state
        .notification_service
        .create_and_send(
            notification.user_id,
            notification.title,
            notification.message,
            notification.kind,
        )
        .await?;

    info!(notification_id = record.id, "Notification sent");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Notification sent successfully", record)),
    ))
}

/// GET /api/notifications/user/:user_id
#[instrument(name = "list_notifications", skip(state, user))]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<NotificationListResponse>>, AppError> {
    ensure_owner(&user, user_id)?;

    let (notifications, unread_count) = state.notification_service.list_for_user(user_id).await?;

    Ok(Json(ApiResponse::ok(
        "Notifications retrieved successfully",
        NotificationListResponse {
            notifications,
            unread_count,
        },
    )))
}

/// GET /api/notifications/user/:user_id/unread-count
#[instrument(name = "unread_count", skip(state, user))]
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<UnreadCountResponse>>, AppError> {
    ensure_owner(&user, user_id)?;

    let unread_count = state.notification_service.unread_count(user_id).await?;

    Ok(Json(ApiResponse::ok(
        "Unread count retrieved successfully",
        UnreadCountResponse { unread_count },
    )))
}

/// POST /api/notifications/:id/read
#[instrument(name = "mark_notification_read", skip(state, user))]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(notification_id): Path<i64>,
) -> Result<Json<ApiResponse<NotificationModel>>, AppError> {
    let existing = state.notification_service.get(notification_id).await?;
    ensure_owner(&user, existing.user_id)?;

    let record = state.notification_service.mark_read(notification_id).await?;

    Ok(Json(ApiResponse::ok("Notification marked as read", record)))
}

/// POST /api/notifications/user/:user_id/read-all
#[instrument(name = "mark_all_notifications_read", skip(state, user))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<MarkAllReadResponse>>, AppError> {
    ensure_owner(&user, user_id)?;

    let updated = state.notification_service.mark_all_read(user_id).await?;

    Ok(Json(ApiResponse::ok(
        "All notifications marked as read",
        MarkAllReadResponse { updated },
    )))
}

/// DELETE /api/notifications/:id
#[instrument(name = "delete_notification", skip(state, user))]
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(notification_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let existing = state.notification_service.get(notification_id).await?;
    ensure_owner(&user, existing.user_id)?;

    state.notification_service.delete(notification_id).await?;

    info!(notification_id = notification_id, "Notification deleted");

    Ok(Json(ApiResponse::message("Notification deleted successfully")))
}
