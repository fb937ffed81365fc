// Public API - what other modules can use
pub use handlers::{
    delete_notification, list_notifications, mark_all_read, mark_read, send_notification,
    unread_count,
};
pub use models::{NewNotification, NotificationKind, NotificationModel};
pub use repository::{
    InMemoryNotificationRepository, NotificationRepository, PostgresNotificationRepository,
};
pub use service::NotificationService;

pub mod models;
pub mod repository;
pub mod service;

// Internal modules
mod handlers;
mod types;
