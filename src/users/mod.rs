// Read-only view of accounts; registration and login live in the account service
pub mod models;
pub mod repository;

pub use models::{Role, UserModel, UserSummary};
pub use repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository};
