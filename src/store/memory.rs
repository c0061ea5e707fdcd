use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FollowStore, PostStore, UserStore};
use crate::follows::repo_types::{Follow, FollowOutcome};
use crate::posts::repo_types::{Comment, Like, LikeOutcome, NewPost, Post};
use crate::users::repo_types::{NewUser, PublicUser, User, UserFilter, UserNetwork};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    posts: Vec<Post>,
    follows: Vec<Follow>,
}

impl Collections {
    fn public_user(&self, id: Uuid) -> Option<PublicUser> {
        self.users.iter().find(|u| u.id == id).map(PublicUser::from)
    }

    fn with_author(&self, post: &Post) -> Post {
        let mut out = post.clone();
        out.author = self.public_user(post.author_id);
        out
    }

    fn newest_first<'a>(&self, posts: impl Iterator<Item = &'a Post>) -> Vec<Post> {
        let mut out: Vec<Post> = posts.map(|p| self.with_author(p)).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}

/// Process-local store. Each operation runs under one write or read lock,
/// which makes every toggle and append atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let mut db = self.inner.write().await;
        let taken = db
            .users
            .iter()
            .any(|u| u.username == new.username || u.email == new.email);
        if taken {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            username: new.username,
            email: new.email,
            password: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        db.users.push(user.clone());
        Ok(Some(user))
    }

    async fn user_exists(&self, username: &str, email: &str) -> anyhow::Result<bool> {
        let db = self.inner.read().await;
        Ok(db
            .users
            .iter()
            .any(|u| u.username == username || u.email == email))
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let db = self.inner.read().await;
        Ok(db.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let db = self.inner.read().await;
        Ok(db.users.iter().find(|u| u.username == username).cloned())
    }

    async fn search_users(&self, filter: &UserFilter) -> anyhow::Result<Vec<User>> {
        let db = self.inner.read().await;
        Ok(db
            .users
            .iter()
            .filter(|u| filter.matches(&PublicUser::from(*u)))
            .cloned()
            .collect())
    }

    async fn user_network(&self, id: Uuid) -> anyhow::Result<Option<UserNetwork>> {
        let db = self.inner.read().await;
        let Some(user) = db.public_user(id) else {
            return Ok(None);
        };
        let followers = db
            .follows
            .iter()
            .filter(|f| f.following_id == id)
            .filter_map(|f| db.public_user(f.follower_id))
            .collect();
        let followings = db
            .follows
            .iter()
            .filter(|f| f.follower_id == id)
            .filter_map(|f| db.public_user(f.following_id))
            .collect();
        Ok(Some(UserNetwork {
            user,
            followers,
            followings,
        }))
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, new: NewPost) -> anyhow::Result<Option<Post>> {
        let mut db = self.inner.write().await;
        if db.posts.iter().any(|p| p.content == new.content) {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let post = Post {
            id: Uuid::new_v4(),
            content: new.content,
            tags: new.tags,
            img_url: new.img_url,
            author_id: new.author_id,
            author: None,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        db.posts.push(post.clone());
        Ok(Some(db.with_author(&post)))
    }

    async fn list_posts(&self) -> anyhow::Result<Vec<Post>> {
        let db = self.inner.read().await;
        Ok(db.newest_first(db.posts.iter()))
    }

    async fn list_posts_by_author(&self, author_id: Uuid) -> anyhow::Result<Vec<Post>> {
        let db = self.inner.read().await;
        Ok(db.newest_first(db.posts.iter().filter(|p| p.author_id == author_id)))
    }

    async fn find_post(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        let db = self.inner.read().await;
        Ok(db.posts.iter().find(|p| p.id == id).map(|p| db.with_author(p)))
    }

    async fn toggle_like(
        &self,
        post_id: Uuid,
        username: &str,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<LikeOutcome>> {
        let mut db = self.inner.write().await;
        let Some(post) = db.posts.iter_mut().find(|p| p.id == post_id) else {
            return Ok(None);
        };
        let outcome = if post.liked_by(username) {
            post.likes.retain(|l| l.username != username);
            LikeOutcome::Unliked
        } else {
            post.likes.push(Like {
                username: username.to_string(),
                created_at: at,
                updated_at: at,
            });
            LikeOutcome::Liked
        };
        post.updated_at = at;
        Ok(Some(outcome))
    }

    async fn append_comment(
        &self,
        post_id: Uuid,
        comment: Comment,
    ) -> anyhow::Result<Option<Vec<Comment>>> {
        let mut db = self.inner.write().await;
        let Some(post) = db.posts.iter_mut().find(|p| p.id == post_id) else {
            return Ok(None);
        };
        post.updated_at = comment.updated_at;
        post.comments.push(comment);
        Ok(Some(post.comments.clone()))
    }
}

#[async_trait]
impl FollowStore for MemoryStore {
    async fn toggle_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> anyhow::Result<FollowOutcome> {
        let mut db = self.inner.write().await;
        let before = db.follows.len();
        db.follows
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        if db.follows.len() != before {
            return Ok(FollowOutcome::Unfollowed);
        }
        let now = OffsetDateTime::now_utc();
        db.follows.push(Follow {
            id: Uuid::new_v4(),
            follower_id,
            following_id,
            created_at: now,
            updated_at: now,
        });
        Ok(FollowOutcome::Followed)
    }
}

/// Counts follow edges for one pair; the in-memory store never holds more than one.
#[cfg(test)]
impl MemoryStore {
    pub(crate) async fn follow_edge_count(&self, follower_id: Uuid, following_id: Uuid) -> usize {
        let db = self.inner.read().await;
        db.follows
            .iter()
            .filter(|f| f.follower_id == follower_id && f.following_id == following_id)
            .count()
    }
}
