use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::shared::UserId;

/// Account role as issued by the account service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Vendor,
    Admin,
}

/// Database model for users table (read-only from this service)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserModel {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
}

impl UserModel {
    pub fn new(id: UserId, email: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            role: Role::Customer,
        }
    }

    /// "First Last", or "Someone" when the user never set a name
    pub fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let name = name.trim();
        if name.is_empty() {
            "Someone".to_string()
        } else {
            name.to_string()
        }
    }
}

/// Public view of a user used in follower listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
}

impl From<UserModel> for UserSummary {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}
