use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::FollowModel;
use crate::shared::{AppError, UserId};

/// Trait for follow repository operations
#[async_trait]
pub trait FollowRepository {
    async fn find_follow(
        &self,
        follower_id: UserId,
        following_id: UserId,
    ) -> Result<Option<FollowModel>, AppError>;

    /// Fails with `Conflict` if the pair already exists
    async fn create_follow(
        &self,
        follower_id: UserId,
        following_id: UserId,
    ) -> Result<FollowModel, AppError>;

    /// Returns whether a follow was deleted
    async fn delete_follow(
        &self,
        follower_id: UserId,
        following_id: UserId,
    ) -> Result<bool, AppError>;

    /// Ids of users following `user_id`, oldest follow first
    async fn follower_ids(&self, user_id: UserId) -> Result<Vec<UserId>, AppError>;

    /// Ids of users `user_id` follows, oldest follow first
    async fn following_ids(&self, user_id: UserId) -> Result<Vec<UserId>, AppError>;
}

/// In-memory implementation of FollowRepository for development and testing
#[derive(Default)]
pub struct InMemoryFollowRepository {
    follows: Mutex<Vec<FollowModel>>,
}

impl InMemoryFollowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<FollowModel>>, AppError> {
        self.follows.lock().map_err(|_| AppError::Internal)
    }
}

#[async_trait]
impl FollowRepository for InMemoryFollowRepository {
    async fn find_follow(
        &self,
        follower_id: UserId,
        following_id: UserId,
    ) -> Result<Option<FollowModel>, AppError> {
        Ok(self
            .lock()?
            .iter()
            .find(|f| f.follower_id == follower_id && f.following_id == following_id)
            .cloned())
    }

    #[instrument(skip(self))]
    async fn create_follow(
        &self,
        follower_id: UserId,
        following_id: UserId,
    ) -> Result<FollowModel, AppError> {
        let mut follows = self.lock()?;
        if follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id)
        {
            return Err(AppError::Conflict("Already following this user".to_string()));
        }

        let record = FollowModel {
            id: follows.iter().map(|f| f.id).max().unwrap_or(0) + 1,
            follower_id,
            following_id,
            created_at: Utc::now(),
        };
        follows.push(record.clone());

        debug!(follow_id = record.id, "Follow stored in memory");
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn delete_follow(
        &self,
        follower_id: UserId,
        following_id: UserId,
    ) -> Result<bool, AppError> {
        let mut follows = self.lock()?;
        let before = follows.len();
        follows.retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(follows.len() < before)
    }

    async fn follower_ids(&self, user_id: UserId) -> Result<Vec<UserId>, AppError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|f| f.following_id == user_id)
            .map(|f| f.follower_id)
            .collect())
    }

    async fn following_ids(&self, user_id: UserId) -> Result<Vec<UserId>, AppError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|f| f.follower_id == user_id)
            .map(|f| f.following_id)
            .collect())
    }
}

/// PostgreSQL implementation of follow repository
pub struct PostgresFollowRepository {
    pool: PgPool,
}

impl PostgresFollowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_follow(row: &sqlx::postgres::PgRow) -> FollowModel {
        FollowModel {
            id: row.get("id"),
            follower_id: row.get("follower_id"),
            following_id: row.get("following_id"),
            created_at: row.get("created_at"),
        }
    }

    async fn ids(&self, sql: &str, user_id: UserId) -> Result<Vec<UserId>, AppError> {
        sqlx::query_scalar(sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = user_id, "Failed to list follows");
                AppError::DatabaseError(e.to_string())
            })
    }
}

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    #[instrument(skip(self))]
    async fn find_follow(
        &self,
        follower_id: UserId,
        following_id: UserId,
    ) -> Result<Option<FollowModel>, AppError> {
        let row = sqlx::query(
            "SELECT id, follower_id, following_id, created_at FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch follow");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(Self::row_to_follow))
    }

    #[instrument(skip(self))]
    async fn create_follow(
        &self,
        follower_id: UserId,
        following_id: UserId,
    ) -> Result<FollowModel, AppError> {
        let row = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1, $2)
            RETURNING id, follower_id, following_id, created_at
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                AppError::Conflict("Already following this user".to_string())
            }
            _ => {
                warn!(error = %e, "Failed to insert follow");
                AppError::DatabaseError(e.to_string())
            }
        })?;

        Ok(Self::row_to_follow(&row))
    }

    #[instrument(skip(self))]
    async fn delete_follow(
        &self,
        follower_id: UserId,
        following_id: UserId,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to delete follow");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn follower_ids(&self, user_id: UserId) -> Result<Vec<UserId>, AppError> {
        self.ids(
            "SELECT follower_id FROM follows WHERE following_id = $1 ORDER BY created_at, id",
            user_id,
        )
        .await
    }

    async fn following_ids(&self, user_id: UserId) -> Result<Vec<UserId>, AppError> {
        self.ids(
            "SELECT following_id FROM follows WHERE follower_id = $1 ORDER BY created_at, id",
            user_id,
        )
        .await
    }
}
