use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::PublicUser;

/// Embedded in a post; at most one per username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Embedded in a post; append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub content: String,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A post as served to readers. `author` is the join result and is never
/// written back to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub tags: Vec<String>,
    pub img_url: Option<String>,
    pub author_id: Uuid,
    #[serde(default)]
    pub author: Option<PublicUser>,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Post {
    pub fn liked_by(&self, username: &str) -> bool {
        self.likes.iter().any(|l| l.username == username)
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub content: String,
    pub tags: Vec<String>,
    pub img_url: Option<String>,
    pub author_id: Uuid,
}

/// Result of toggling a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    Unliked,
}

impl LikeOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Liked => "liked",
            Self::Unliked => "unliked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "liked" => Some(Self::Liked),
            "unliked" => Some(Self::Unliked),
            _ => None,
        }
    }
}
