use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::shared::UserId;

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    System,
    Message,
    Promotion,
    Order,
    Save,
    Follow,
}

impl NotificationKind {
    /// Kinds a client may create directly through the REST endpoint.
    /// SAVE and FOLLOW are only raised by the server itself.
    pub const CLIENT_SENDABLE: [NotificationKind; 4] = [
        NotificationKind::System,
        NotificationKind::Message,
        NotificationKind::Promotion,
        NotificationKind::Order,
    ];

    pub fn is_client_sendable(&self) -> bool {
        Self::CLIENT_SENDABLE.contains(self)
    }
}

/// Database model for notifications table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationModel {
    pub id: i64,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a notification; id and timestamps are assigned by storage
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

impl NewNotification {
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: message.into(),
            kind,
        }
    }
}
