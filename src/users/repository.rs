use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{Role, UserModel};
use crate::shared::{AppError, UserId};

/// Read access to user accounts owned by the account service
#[async_trait]
pub trait UserRepository {
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserModel>, AppError>;

    /// Users for the given ids, in the same order; unknown ids are skipped
    async fn get_users(&self, user_ids: &[UserId]) -> Result<Vec<UserModel>, AppError>;
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, UserModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an in-memory repository with pre-populated users
    pub fn with_users(users: Vec<UserModel>) -> Self {
        let users = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Mutex::new(users),
        }
    }

    pub fn insert_user(&self, user: UserModel) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(user.id, user);
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<UserId, UserModel>>, AppError> {
        self.users.lock().map_err(|_| AppError::Internal)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self))]
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserModel>, AppError> {
        let user = self.lock()?.get(&user_id).cloned();
        debug!(user_id = user_id, found = user.is_some(), "User lookup in memory");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_users(&self, user_ids: &[UserId]) -> Result<Vec<UserModel>, AppError> {
        let users = self.lock()?;
        Ok(user_ids
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect())
    }
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<UserModel, AppError> {
        let role: String = row.get("role");
        Ok(UserModel {
            id: row.get("id"),
            email: row.get("email"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            role: Role::from_str(&role)
                .map_err(|_| AppError::DatabaseError(format!("Unknown role: {}", role)))?,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self))]
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserModel>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, first_name, last_name, role FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = user_id, "Failed to fetch user from database");
            AppError::DatabaseError(e.to_string())
        })?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    #[instrument(skip(self))]
    async fn get_users(&self, user_ids: &[UserId]) -> Result<Vec<UserModel>, AppError> {
        let rows = sqlx::query(
            "SELECT id, email, first_name, last_name, role FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch users from database");
            AppError::DatabaseError(e.to_string())
        })?;

        let mut by_id = HashMap::new();
        for row in &rows {
            let user = Self::row_to_user(row)?;
            by_id.insert(user.id, user);
        }
        Ok(user_ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}
