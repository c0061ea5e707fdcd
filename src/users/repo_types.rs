use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String, // argon2 hash
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The part of a user that may be embedded in other documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: Option<String>,
    pub username: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Case-insensitive substring filters; a user matches if any supplied filter does.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub name: Option<String>,
    pub username: Option<String>,
}

impl UserFilter {
    pub fn new(name: Option<String>, username: Option<String>) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            name: clean(name),
            username: clean(username),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.username.is_none()
    }

    pub fn matches(&self, user: &PublicUser) -> bool {
        if self.is_empty() {
            return true;
        }
        let contains = |hay: &str, needle: &str| hay.to_lowercase().contains(&needle.to_lowercase());
        let by_name = match (&self.name, &user.name) {
            (Some(needle), Some(name)) => contains(name, needle),
            _ => false,
        };
        let by_username = self
            .username
            .as_deref()
            .is_some_and(|needle| contains(&user.username, needle));
        by_name || by_username
    }
}

/// A user with both sides of the follow graph resolved.
#[derive(Debug, Clone)]
pub struct UserNetwork {
    pub user: PublicUser,
    pub followers: Vec<PublicUser>,
    pub followings: Vec<PublicUser>,
}
