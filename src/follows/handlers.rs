use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;

use super::{
    models::FollowModel,
    types::{FollowListQuery, FollowRequest},
};
use crate::auth::AuthUser;
use crate::shared::{ApiResponse, AppError, AppState, UserId};
use crate::users::UserSummary;

fn required_user_id(user_id: Option<UserId>) -> Result<UserId, AppError> {
    user_id
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest("user_id is required".to_string()))
}

/// POST /api/follow/follow-user
#[instrument(name = "follow_user", skip(state, user, request), fields(follower_id = user.id))]
pub async fn follow_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<FollowRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FollowModel>>), AppError> {
    let following_id = required_user_id(request.user_id)?;
    let follow = state.follow_service.follow(user.id, following_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Followed successfully", follow)),
    ))
}

/// POST /api/follow/unfollow-user
#[instrument(name = "unfollow_user", skip(state, user, request), fields(follower_id = user.id))]
pub async fn unfollow_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<FollowRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let following_id = required_user_id(request.user_id)?;
    state.follow_service.unfollow(user.id, following_id).await?;

    Ok(Json(ApiResponse::message("User unfollowed successfully")))
}

/// GET /api/follow/followers?user_id=N
#[instrument(name = "get_followers", skip(state))]
pub async fn get_followers(
    State(state): State<AppState>,
    Query(query): Query<FollowListQuery>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, AppError> {
    let user_id = required_user_id(query.user_id)?;
    let followers = state.follow_service.followers(user_id).await?;

    Ok(Json(ApiResponse::ok("Followers fetched successfully", followers)))
}

/// GET /api/follow/following?user_id=N
#[instrument(name = "get_following", skip(state))]
pub async fn get_following(
    State(state): State<AppState>,
    Query(query): Query<FollowListQuery>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, AppError> {
    let user_id = required_user_id(query.user_id)?;
    let following = state.follow_service.following(user_id).await?;

    Ok(Json(ApiResponse::ok("Following fetched successfully", following)))
}
