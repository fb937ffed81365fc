use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::models::{NewNotification, NotificationKind, NotificationModel};
use crate::shared::{AppError, UserId};

/// Request payload for sending a notification
///
/// Fields are optional so that a missing field is reported as a 400 with a
/// readable message instead of an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    pub user_id: Option<UserId>,
    pub title: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl SendNotificationRequest {
    pub fn into_new_notification(self) -> Result<NewNotification, AppError> {
        let (Some(user_id), Some(title), Some(message), Some(kind)) =
            (self.user_id, self.title, self.message, self.kind)
        else {
            return Err(AppError::BadRequest(
                "Missing required fields: user_id, title, message, type".to_string(),
            ));
        };

        if title.trim().is_empty() || message.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Title and message must not be empty".to_string(),
            ));
        }

        let kind = NotificationKind::from_str(&kind)
            .ok()
            .filter(NotificationKind::is_client_sendable)
            .ok_or_else(|| {
                AppError::BadRequest(
                    "Invalid notification type. Must be one of: SYSTEM, MESSAGE, PROMOTION, ORDER"
                        .to_string(),
                )
            })?;

        Ok(NewNotification::new(user_id, title, message, kind))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationModel>,
    pub unread_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}
