//! Users, platform roles and manager upgrade requests.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Platform-wide role stored on the user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Joins clubs, registers for events
    Member,
    /// Owns clubs and their events
    Manager,
    /// Approves clubs and assigns roles
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Member, Role::Manager, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            // older clients registered everyone as "customer"
            "customer" => Ok(Role::Member),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Role::Member)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: String,
    pub created_at: String,
    #[serde(rename = "last_loggedIn")]
    pub last_logged_in: String,
}

impl User {
    pub fn role_enum(&self) -> Role {
        Role::from(self.role.clone())
    }

    pub async fn find(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Stored role for an email, `None` if the user never logged in
    pub async fn role_of(pool: &SqlitePool, email: &str) -> Result<Option<Role>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT role FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|(role,)| Role::from(role)))
    }
}

/// Login record sent by the client after identity-provider sign in
#[derive(Debug, Deserialize)]
pub struct UpsertUserRequest {
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUserResponse {
    /// True when this call created the user
    pub inserted: bool,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ManagerRequest {
    pub email: String,
    pub created_at: String,
}

/// Pending manager request with the requesting user's profile
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ManagerRequestWithUser {
    pub email: String,
    pub created_at: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub email: String,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_strings() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_legacy_customer_role_is_member() {
        assert_eq!("customer".parse::<Role>().unwrap(), Role::Member);
        assert_eq!(Role::from("Manager".to_string()), Role::Manager);
        assert_eq!(Role::from("superuser".to_string()), Role::Member);
    }
}
