use serde::Deserialize;

use crate::shared::UserId;

/// Body for follow-user and unfollow-user; the caller is the follower
#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    #[serde(alias = "userId")]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct FollowListQuery {
    #[serde(alias = "userId")]
    pub user_id: Option<UserId>,
}
