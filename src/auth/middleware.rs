use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::types::AuthUser;
use crate::shared::{AppError, AppState};

/// Resolve a bearer token to the user it was issued for.
///
/// Shared by the HTTP middleware and the WebSocket upgrade.
pub async fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let claims = state.token_config.validate_token(token)?;

    match state.user_repository.get_user(claims.user_id).await? {
        Some(user) => Ok(AuthUser::from(user)),
        None => {
            warn!(user_id = claims.user_id, "Token refers to a user that no longer exists");
            Err(AppError::Unauthorized("User not found".to_string()))
        }
    }
}

/// JWT authentication middleware - validates Authorization Bearer header and adds AuthUser to request.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), auth::jwt_auth))
/// Handlers can then extract Extension(user): Extension<AuthUser>.
#[instrument(skip(state, req, next))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    debug!(uri = %req.uri(), "JWT authentication middleware triggered");

    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header in request");
            AppError::Unauthorized("Access token required".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid Authorization header format (expected Bearer token)");
        AppError::Unauthorized("Access token required".to_string())
    })?;

    let user = match authenticate(&state, token).await {
        Ok(user) => user,
        Err(e) => {
            warn!("JWT authentication failed: {}", e);
            return Err(e);
        }
    };

    debug!(user_id = user.id, "Authentication successful, adding user to request");

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
