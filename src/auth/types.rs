use serde::{Deserialize, Serialize};

use crate::shared::UserId;
use crate::users::{Role, UserModel};

/// JWT claims structure issued by the account service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthClaims {
    pub user_id: UserId,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}

/// The authenticated caller, placed in request extensions by `jwt_auth`
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub display_name: String,
}

impl AuthUser {
    /// Whether the caller may read or change data owned by `owner_id`
    pub fn can_act_for(&self, owner_id: UserId) -> bool {
        self.id == owner_id || self.role == Role::Admin
    }
}

impl From<UserModel> for AuthUser {
    fn from(user: UserModel) -> Self {
        Self {
            display_name: user.display_name(),
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}
