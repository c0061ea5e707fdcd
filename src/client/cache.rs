use std::collections::HashMap;

use super::model::{CommentView, LikeView, PostView, UserView};

/// Normalized store of everything the client has fetched. Posts and users
/// are keyed by id; the feed is an ordered list of post ids.
#[derive(Debug, Default)]
pub struct ClientCache {
    posts: HashMap<String, PostView>,
    users: HashMap<String, UserView>,
    feed: Vec<String>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, id: &str) -> Option<&PostView> {
        self.posts.get(id)
    }

    pub fn user(&self, id: &str) -> Option<&UserView> {
        self.users.get(id)
    }

    pub fn feed(&self) -> Vec<&PostView> {
        self.feed.iter().filter_map(|id| self.posts.get(id)).collect()
    }

    pub fn merge_user(&mut self, incoming: UserView) {
        for nested in incoming
            .user_followers
            .iter()
            .chain(incoming.user_followings.iter())
            .flatten()
        {
            self.merge_flat_user(nested.clone());
        }
        self.merge_flat_user(incoming);
    }

    fn merge_flat_user(&mut self, incoming: UserView) {
        match self.users.get_mut(&incoming.id) {
            Some(current) => current.merge(incoming),
            None => {
                self.users.insert(incoming.id.clone(), incoming);
            }
        }
    }

    pub fn merge_post(&mut self, incoming: PostView) {
        if let Some(author) = incoming.author.clone() {
            self.merge_user(author);
        }
        match self.posts.get_mut(&incoming.id) {
            Some(current) => current.merge(incoming),
            None => {
                self.posts.insert(incoming.id.clone(), incoming);
            }
        }
    }

    /// Replaces the feed order with `posts`, merging each post.
    pub fn replace_feed(&mut self, posts: Vec<PostView>) {
        self.feed = posts.iter().map(|p| p.id.clone()).collect();
        for post in posts {
            self.merge_post(post);
        }
    }

    pub fn set_comments(&mut self, post_id: &str, comments: Vec<CommentView>) {
        if let Some(post) = self.posts.get_mut(post_id) {
            post.comments = comments;
        }
    }

    pub fn add_like(&mut self, post_id: &str, like: LikeView) {
        if let Some(post) = self.posts.get_mut(post_id) {
            if !post.liked_by(&like.username) {
                post.likes.push(like);
            }
        }
    }

    pub fn remove_like(&mut self, post_id: &str, username: &str) {
        if let Some(post) = self.posts.get_mut(post_id) {
            post.likes.retain(|l| l.username != username);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
