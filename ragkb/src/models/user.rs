//! User and authentication models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Name of the role that unlocks administration.
pub const ADMIN_ROLE: &str = "admin";

/// A role granted to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A user profile as returned by the backend and cached in client storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<Role>,
}

impl User {
    /// Whether any granted role is the admin role.
    pub fn has_admin_role(&self) -> bool {
        self.roles.iter().any(|role| role.name == ADMIN_ROLE)
    }

    /// Name to greet the user with: real name when set, otherwise username.
    pub fn display_name(&self) -> &str {
        if self.real_name.is_empty() {
            &self.username
        } else {
            &self.real_name
        }
    }
}

/// Credentials issued by a successful login or token refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}
