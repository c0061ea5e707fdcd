//! Persistence seam. The services only see these traits; `postgres` is the
//! production backend and `memory` backs tests and database-less runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::follows::repo_types::FollowOutcome;
use crate::posts::repo_types::{Comment, LikeOutcome, NewPost, Post};
use crate::users::repo_types::{NewUser, User, UserFilter, UserNetwork};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts unless the username or email is taken; `None` on conflict.
    async fn insert_user(&self, new: NewUser) -> anyhow::Result<Option<User>>;
    async fn user_exists(&self, username: &str, email: &str) -> anyhow::Result<bool>;
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn search_users(&self, filter: &UserFilter) -> anyhow::Result<Vec<User>>;
    async fn user_network(&self, id: Uuid) -> anyhow::Result<Option<UserNetwork>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Inserts unless a post with identical content exists; `None` on conflict.
    async fn insert_post(&self, new: NewPost) -> anyhow::Result<Option<Post>>;
    /// All posts, newest first, with authors joined.
    async fn list_posts(&self) -> anyhow::Result<Vec<Post>>;
    async fn list_posts_by_author(&self, author_id: Uuid) -> anyhow::Result<Vec<Post>>;
    async fn find_post(&self, id: Uuid) -> anyhow::Result<Option<Post>>;
    /// Atomically removes `username`'s like or appends one stamped `at`.
    /// `None` if the post does not exist.
    async fn toggle_like(
        &self,
        post_id: Uuid,
        username: &str,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<LikeOutcome>>;
    /// Atomically appends and returns the full comment list, `None` if the
    /// post does not exist.
    async fn append_comment(
        &self,
        post_id: Uuid,
        comment: Comment,
    ) -> anyhow::Result<Option<Vec<Comment>>>;
}

#[async_trait]
pub trait FollowStore: Send + Sync {
    /// Atomically deletes the edge if present, inserts it otherwise.
    async fn toggle_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> anyhow::Result<FollowOutcome>;
}

pub trait Store: UserStore + PostStore + FollowStore {}

impl<T: UserStore + PostStore + FollowStore> Store for T {}
