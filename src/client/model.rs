//! Wire shapes as the client sees them, and how each merges into the cache.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_followers: Option<Vec<UserView>>,
    #[serde(default)]
    pub user_followings: Option<Vec<UserView>>,
}

impl UserView {
    /// Scalars take the incoming value when present; follower lists are
    /// replaced wholesale when present.
    pub fn merge(&mut self, incoming: UserView) {
        if incoming.name.is_some() {
            self.name = incoming.name;
        }
        if incoming.username.is_some() {
            self.username = incoming.username;
        }
        if incoming.email.is_some() {
            self.email = incoming.email;
        }
        if incoming.user_followers.is_some() {
            self.user_followers = incoming.user_followers;
        }
        if incoming.user_followings.is_some() {
            self.user_followings = incoming.user_followings;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeView {
    pub username: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub content: String,
    pub username: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author: Option<UserView>,
    #[serde(default)]
    pub likes: Vec<LikeView>,
    #[serde(default)]
    pub comments: Vec<CommentView>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl PostView {
    /// Content, tags, likes and comments are replaced by the incoming post.
    /// Optional fields only overwrite when the incoming post carries them.
    pub fn merge(&mut self, incoming: PostView) {
        self.content = incoming.content;
        self.tags = incoming.tags;
        self.likes = incoming.likes;
        self.comments = incoming.comments;
        if incoming.img_url.is_some() {
            self.img_url = incoming.img_url;
        }
        if incoming.author_id.is_some() {
            self.author_id = incoming.author_id;
        }
        if let Some(author) = incoming.author {
            match self.author.as_mut() {
                Some(current) if current.id == author.id => current.merge(author),
                _ => self.author = Some(author),
            }
        }
        if incoming.created_at.is_some() {
            self.created_at = incoming.created_at;
        }
        if incoming.updated_at.is_some() {
            self.updated_at = incoming.updated_at;
        }
    }

    pub fn liked_by(&self, username: &str) -> bool {
        self.likes.iter().any(|l| l.username == username)
    }

    /// Case-insensitive match on content, any tag, or the author's name or username.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        let hit = |s: &str| s.to_lowercase().contains(&needle);
        hit(&self.content)
            || self.tags.iter().any(|t| hit(t.as_str()))
            || self.author.as_ref().is_some_and(|a| {
                a.name.as_deref().is_some_and(hit) || a.username.as_deref().is_some_and(hit)
            })
    }
}
