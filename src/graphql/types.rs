use async_graphql::{SimpleObject, ID};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::posts::repo_types::{Comment, Like, Post};
use crate::users::repo_types::{PublicUser, User, UserNetwork};

fn timestamp(t: OffsetDateTime) -> String {
    t.format(&Rfc3339).unwrap_or_default()
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "User")]
pub struct UserObject {
    #[graphql(name = "_id")]
    pub id: ID,
    pub name: Option<String>,
    pub username: String,
    pub email: String,
    /// Only resolved by `findUserById`.
    pub user_followers: Option<Vec<UserObject>>,
    /// Only resolved by `findUserById`.
    pub user_followings: Option<Vec<UserObject>>,
}

impl From<PublicUser> for UserObject {
    fn from(u: PublicUser) -> Self {
        Self {
            id: ID(u.id.to_string()),
            name: u.name,
            username: u.username,
            email: u.email,
            user_followers: None,
            user_followings: None,
        }
    }
}

impl From<User> for UserObject {
    fn from(u: User) -> Self {
        Self::from(PublicUser::from(&u))
    }
}

impl From<UserNetwork> for UserObject {
    fn from(n: UserNetwork) -> Self {
        Self {
            user_followers: Some(n.followers.into_iter().map(Self::from).collect()),
            user_followings: Some(n.followings.into_iter().map(Self::from).collect()),
            ..Self::from(n.user)
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Like")]
pub struct LikeObject {
    pub username: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Like> for LikeObject {
    fn from(l: Like) -> Self {
        Self {
            username: l.username,
            created_at: timestamp(l.created_at),
            updated_at: timestamp(l.updated_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Comment")]
pub struct CommentObject {
    pub content: String,
    pub username: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Comment> for CommentObject {
    fn from(c: Comment) -> Self {
        Self {
            content: c.content,
            username: c.username,
            created_at: timestamp(c.created_at),
            updated_at: timestamp(c.updated_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Post")]
pub struct PostObject {
    #[graphql(name = "_id")]
    pub id: ID,
    pub content: String,
    pub tags: Vec<String>,
    pub img_url: Option<String>,
    pub author_id: ID,
    pub author: Option<UserObject>,
    pub likes: Vec<LikeObject>,
    pub comments: Vec<CommentObject>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Post> for PostObject {
    fn from(p: Post) -> Self {
        Self {
            id: ID(p.id.to_string()),
            content: p.content,
            tags: p.tags,
            img_url: p.img_url,
            author_id: ID(p.author_id.to_string()),
            author: p.author.map(UserObject::from),
            likes: p.likes.into_iter().map(LikeObject::from).collect(),
            comments: p.comments.into_iter().map(CommentObject::from).collect(),
            created_at: timestamp(p.created_at),
            updated_at: timestamp(p.updated_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct LoginResponse {
    #[graphql(name = "access_token")]
    pub access_token: String,
}
