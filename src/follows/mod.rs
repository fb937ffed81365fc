// Public API - what other modules can use
pub use handlers::{follow_user, get_followers, get_following, unfollow_user};
pub use models::FollowModel;
pub use repository::{FollowRepository, InMemoryFollowRepository, PostgresFollowRepository};
pub use service::FollowService;

pub mod models;
pub mod repository;
pub mod service;

// Internal modules
mod handlers;
mod types;
