use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{models::FollowModel, repository::FollowRepository};
use crate::notifications::NotificationService;
use crate::shared::{AppError, UserId};
use crate::users::{UserRepository, UserSummary};

/// Service for the follow graph between users
pub struct FollowService {
    repository: Arc<dyn FollowRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
    notification_service: Arc<NotificationService>,
}

impl FollowService {
    pub fn new(
        repository: Arc<dyn FollowRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            repository,
            user_repository,
            notification_service,
        }
    }

    /// Make `follower_id` follow `following_id` and notify the followed user
    #[instrument(skip(self))]
    pub async fn follow(
        &self,
        follower_id: UserId,
        following_id: UserId,
    ) -> Result<FollowModel, AppError> {
        if follower_id == following_id {
            return Err(AppError::BadRequest("You cannot follow yourself".to_string()));
        }

        if self.user_repository.get_user(following_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        if self
            .repository
            .find_follow(follower_id, following_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Already following this user".to_string()));
        }

        let follow = self.repository.create_follow(follower_id, following_id).await?;

        let follower_name = self
            .user_repository
            .get_user(follower_id)
            .await
            .ok()
            .flatten()
            .map(|user| user.display_name())
            .unwrap_or_else(|| "Someone".to_string());

        if let Err(e) = self
            .notification_service
            .notify_user_follow(following_id, &follower_name)
            .await
        {
            warn!(
                following_id = following_id,
                error = %e,
                "Failed to send follow notification"
            );
        }

        info!(follow_id = follow.id, "User followed");
        Ok(follow)
    }

    #[instrument(skip(self))]
    pub async fn unfollow(&self, follower_id: UserId, following_id: UserId) -> Result<(), AppError> {
        if self.repository.delete_follow(follower_id, following_id).await? {
            info!("User unfollowed");
            Ok(())
        } else {
            Err(AppError::NotFound("Follow relationship not found".to_string()))
        }
    }

    pub async fn followers(&self, user_id: UserId) -> Result<Vec<UserSummary>, AppError> {
        let ids = self.repository.follower_ids(user_id).await?;
        self.summaries(&ids).await
    }

    pub async fn following(&self, user_id: UserId) -> Result<Vec<UserSummary>, AppError> {
        let ids = self.repository.following_ids(user_id).await?;
        self.summaries(&ids).await
    }

    async fn summaries(&self, ids: &[UserId]) -> Result<Vec<UserSummary>, AppError> {
        Ok(self
            .user_repository
            .get_users(ids)
            .await?
            .into_iter()
            .map(UserSummary::from)
            .collect())
    }
}
