use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{info, instrument};

use super::api::{ApiClient, ClientError};
use super::cache::ClientCache;
use super::gate::AuthGate;
use super::model::{CommentView, LikeView, PostView, UserView};
use crate::posts::repo_types::LikeOutcome;

/// One signed-in (or signed-out) client. Server state is authoritative:
/// local edits are applied only after the matching call succeeds.
pub struct Session {
    api: ApiClient,
    cache: ClientCache,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cache: ClientCache::new(),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn gate(&self) -> &AuthGate {
        self.api.gate()
    }

    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }

    pub fn feed(&self) -> Vec<&PostView> {
        self.cache.feed()
    }

    pub async fn log_in(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        let token = self.api.login(username, password).await?;
        self.gate().log_in(&token)?;
        info!(username, "logged in");
        Ok(())
    }

    pub fn log_out(&mut self) -> Result<(), ClientError> {
        self.gate().log_out()?;
        self.cache.clear();
        Ok(())
    }

    /// Fetches the signed-in user with their network and merges it into the cache.
    pub async fn me(&mut self) -> Result<UserView, ClientError> {
        let id = self
            .gate()
            .current_user_id()?
            .ok_or(ClientError::NotLoggedIn)?
            .to_string();
        let user = self.api.find_user_by_id(&id).await?;
        self.cache.merge_user(user);
        self.cache
            .user(&id)
            .cloned()
            .ok_or_else(|| ClientError::UnexpectedResponse(format!("user {id} not cached")))
    }

    /// Replaces the feed with a fresh listing; the latest fetch wins.
    #[instrument(skip(self))]
    pub async fn refresh_feed(&mut self) -> Result<(), ClientError> {
        let posts = self.api.get_posts().await?;
        self.cache.replace_feed(posts);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn like(&mut self, post_id: &str) -> Result<LikeOutcome, ClientError> {
        let username = self
            .me()
            .await?
            .username
            .ok_or_else(|| ClientError::UnexpectedResponse("user without username".into()))?;

        let raw = self.api.like_post(post_id).await?;
        let outcome = LikeOutcome::parse(&raw)
            .ok_or_else(|| ClientError::UnexpectedResponse(format!("like result {raw}")))?;

        match outcome {
            LikeOutcome::Liked => {
                let now = OffsetDateTime::now_utc().format(&Rfc3339).ok();
                self.cache.add_like(
                    post_id,
                    LikeView {
                        username,
                        created_at: now.clone(),
                        updated_at: now,
                    },
                );
            }
            LikeOutcome::Unliked => self.cache.remove_like(post_id, &username),
        }
        Ok(outcome)
    }

    #[instrument(skip(self, content))]
    pub async fn comment(
        &mut self,
        post_id: &str,
        content: &str,
    ) -> Result<Vec<CommentView>, ClientError> {
        let comments = self.api.comment_post(post_id, content).await?;
        self.cache.set_comments(post_id, comments.clone());
        Ok(comments)
    }

    /// Creates a post and refetches the feed so it shows up in server order.
    pub async fn create_post(
        &mut self,
        content: &str,
        tags: &[String],
        img_url: Option<&str>,
    ) -> Result<String, ClientError> {
        let message = self.api.add_post(content, tags, img_url).await?;
        self.refresh_feed().await?;
        Ok(message)
    }

    /// Feed posts whose content, tags or author name contain `query`.
    pub fn search(&self, query: &str) -> Vec<&PostView> {
        let query = query.trim();
        self.cache
            .feed()
            .into_iter()
            .filter(|p| query.is_empty() || p.matches(query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::credentials::MemoryCredentialStore;
    use crate::{app::build_app, state::AppState};

    async fn spawn_server() -> String {
        let app = build_app(AppState::fake());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/graphql")
    }

    fn session(endpoint: &str) -> Session {
        let gate = AuthGate::new(Arc::new(MemoryCredentialStore::new()));
        Session::new(ApiClient::new(endpoint, gate))
    }

    async fn signed_up(endpoint: &str, username: &str) -> Session {
        let mut s = session(endpoint);
        s.api()
            .register(
                Some("Test User"),
                username,
                &format!("{username}@x.com"),
                "pw1234",
            )
            .await
            .unwrap();
        s.log_in(username, "pw1234").await.unwrap();
        s
    }

    #[tokio::test]
    async fn feed_like_comment_and_search() {
        let endpoint = spawn_server().await;
        let mut alice = signed_up(&endpoint, "alice").await;
        assert!(alice.gate().is_logged_in().unwrap());

        let created = alice
            .create_post("brewing coffee", &["#morning".to_string()], None)
            .await
            .unwrap();
        assert_eq!(created, "Post created successfully");
        let feed = alice.feed();
        assert_eq!(feed.len(), 1);
        assert_eq!(
            feed[0].author.as_ref().unwrap().username.as_deref(),
            Some("alice")
        );
        let post_id = feed[0].id.clone();

        assert_eq!(alice.like(&post_id).await.unwrap(), LikeOutcome::Liked);
        assert!(alice.cache().post(&post_id).unwrap().liked_by("alice"));
        assert_eq!(alice.like(&post_id).await.unwrap(), LikeOutcome::Unliked);
        assert!(alice.cache().post(&post_id).unwrap().likes.is_empty());

        let comments = alice.comment(&post_id, "so good").await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(alice.cache().post(&post_id).unwrap().comments, comments);

        assert_eq!(alice.search("COFFEE").len(), 1);
        assert_eq!(alice.search("#morning").len(), 1);
        assert_eq!(alice.search("test user").len(), 1);
        assert!(alice.search("tea").is_empty());
    }

    #[tokio::test]
    async fn failed_like_leaves_cache_untouched() {
        let endpoint = spawn_server().await;
        let mut alice = signed_up(&endpoint, "alice").await;
        alice.create_post("hello", &[], None).await.unwrap();
        let before = alice.feed()[0].clone();

        let err = alice.like(&uuid::Uuid::new_v4().to_string()).await.unwrap_err();
        assert!(matches!(err, ClientError::Graphql(ref m) if m == "Post not found"));
        assert_eq!(alice.feed()[0], &before);
    }

    #[tokio::test]
    async fn logged_out_session_is_rejected() {
        let endpoint = spawn_server().await;
        let mut alice = signed_up(&endpoint, "alice").await;
        alice.log_out().unwrap();
        assert!(!alice.gate().is_logged_in().unwrap());

        let err = alice.refresh_feed().await.unwrap_err();
        assert!(matches!(err, ClientError::Graphql(ref m) if m == "Please login first"));
        assert!(matches!(alice.me().await, Err(ClientError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn me_refetches_network_after_feed_cached_the_author() {
        let endpoint = spawn_server().await;
        let mut alice = signed_up(&endpoint, "alice").await;
        let bob = signed_up(&endpoint, "bob").await;
        alice.create_post("first post", &[], None).await.unwrap();

        let alice_id = alice.gate().current_user_id().unwrap().unwrap().to_string();
        assert!(alice.cache().user(&alice_id).is_some());

        bob.api().follow_user(&alice_id).await.unwrap();
        let me = alice.me().await.unwrap();
        let followers = me.user_followers.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].username.as_deref(), Some("bob"));
        assert_eq!(me.username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn follow_shows_up_in_network() {
        let endpoint = spawn_server().await;
        let mut alice = signed_up(&endpoint, "alice").await;
        let bob = signed_up(&endpoint, "bob").await;

        let found = bob.api().find_user(None, Some("ali")).await.unwrap();
        assert_eq!(found.len(), 1);
        let alice_id = found[0].id.clone();

        assert_eq!(bob.api().follow_user(&alice_id).await.unwrap(), "followed");
        let me = alice.me().await.unwrap();
        let followers = me.user_followers.unwrap();
        assert_eq!(followers[0].username.as_deref(), Some("bob"));
    }
}
