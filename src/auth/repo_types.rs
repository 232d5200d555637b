use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Closed set of capability tags. Checked exhaustively, never by string
/// membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Employer,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Employer => write!(f, "employer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// User record in the database. The password hash and the pending-reset
/// fields are sensitive and never leave the process in JSON.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub reset_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_fields_never_serialize() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            email: "alice@x.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::User,
            reset_token_hash: Some("deadbeef".into()),
            reset_expires_at: Some(OffsetDateTime::now_utc()),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("deadbeef"));
        assert!(json.contains("alice@x.com"));
    }

    #[test]
    fn role_display_is_lowercase() {
        assert_eq!(Role::Employer.to_string(), "employer");
        assert_eq!(Role::Admin.to_string(), "admin");
    }
}
