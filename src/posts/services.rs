use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::repo_types::{Comment, LikeOutcome, NewPost, Post};
use super::tags::normalize_tags;
use crate::{
    cache::POSTS_CACHE_KEY,
    error::{ApiError, ApiResult},
    state::AppState,
    users::repo_types::User,
};

pub const POST_CREATED: &str = "Post created successfully";

/// Newest-first list of every post. Served verbatim from the cache when
/// present; otherwise recomputed and written back.
#[instrument(skip(state))]
pub async fn get_posts(state: &AppState) -> ApiResult<Vec<Post>> {
    match state.cache.get(POSTS_CACHE_KEY).await {
        Ok(Some(raw)) => match serde_json::from_str::<Vec<Post>>(&raw) {
            Ok(posts) => {
                debug!(count = posts.len(), "posts served from cache");
                return Ok(posts);
            }
            Err(e) => warn!(error = %e, "discarding undecodable posts snapshot"),
        },
        Ok(None) => {}
        Err(e) => warn!(error = %e, "cache read failed; reading store"),
    }

    let posts = state.store.list_posts().await?;
    match serde_json::to_string(&posts) {
        Ok(raw) => {
            if let Err(e) = state.cache.set(POSTS_CACHE_KEY, &raw).await {
                warn!(error = %e, "cache write failed");
            }
        }
        Err(e) => warn!(error = %e, "serialize posts snapshot failed"),
    }
    Ok(posts)
}

#[instrument(skip(state))]
pub async fn get_post_by_id(state: &AppState, id: Uuid) -> ApiResult<Post> {
    state
        .store
        .find_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

#[instrument(skip(state))]
pub async fn get_posts_by_author(state: &AppState, author_id: Uuid) -> ApiResult<Vec<Post>> {
    Ok(state.store.list_posts_by_author(author_id).await?)
}

#[derive(Debug, Default)]
pub struct PostDraft {
    pub content: String,
    pub tags: Vec<String>,
    pub img_url: Option<String>,
}

#[instrument(skip(state, author, draft), fields(author_id = %author.id))]
pub async fn add_post(state: &AppState, author: &User, draft: PostDraft) -> ApiResult<Post> {
    if draft.content.trim().is_empty() {
        return Err(ApiError::validation("Content is required"));
    }
    let img_url = draft
        .img_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    let post = state
        .store
        .insert_post(NewPost {
            content: draft.content,
            tags: normalize_tags(&draft.tags),
            img_url,
            author_id: author.id,
        })
        .await?
        .ok_or_else(|| {
            warn!("duplicate post content");
            ApiError::validation("Post already exists")
        })?;

    invalidate_posts(state).await?;
    info!(post_id = %post.id, "post created");
    Ok(post)
}

#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn like_post(state: &AppState, user: &User, post_id: Uuid) -> ApiResult<LikeOutcome> {
    let outcome = state
        .store
        .toggle_like(post_id, &user.username, OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    invalidate_posts(state).await?;
    info!(%post_id, outcome = outcome.as_str(), "like toggled");
    Ok(outcome)
}

#[instrument(skip(state, user, content), fields(username = %user.username))]
pub async fn comment_post(
    state: &AppState,
    user: &User,
    post_id: Uuid,
    content: &str,
) -> ApiResult<Vec<Comment>> {
    if content.trim().is_empty() {
        return Err(ApiError::validation("Content is required"));
    }
    let now = OffsetDateTime::now_utc();
    let comments = state
        .store
        .append_comment(
            post_id,
            Comment {
                content: content.to_string(),
                username: user.username.clone(),
                created_at: now,
                updated_at: now,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    invalidate_posts(state).await?;
    info!(%post_id, count = comments.len(), "comment added");
    Ok(comments)
}

async fn invalidate_posts(state: &AppState) -> ApiResult<()> {
    state.cache.invalidate(POSTS_CACHE_KEY).await.map_err(|e| {
        error!(error = %e, "posts cache invalidation failed");
        ApiError::Internal(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::services::{register, Registration};

    async fn user(state: &AppState, username: &str) -> User {
        register(
            state,
            Registration {
                name: None,
                username: username.into(),
                email: format!("{username}@x.com"),
                password: "pw1234".into(),
            },
        )
        .await
        .unwrap()
    }

    fn draft(content: &str) -> PostDraft {
        PostDraft {
            content: content.into(),
            ..PostDraft::default()
        }
    }

    async fn cached(state: &AppState) -> Option<String> {
        state.cache.get(POSTS_CACHE_KEY).await.unwrap()
    }

    #[tokio::test]
    async fn empty_feed_is_an_empty_list() {
        let state = AppState::fake();
        assert!(get_posts(&state).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn new_post_is_visible_after_invalidation() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;

        get_posts(&state).await.unwrap();
        assert!(cached(&state).await.is_some());

        let post = add_post(&state, &alice, draft("hi")).await.unwrap();
        assert!(cached(&state).await.is_none());

        let posts = get_posts(&state).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, post.id);
        assert_eq!(posts[0].author.as_ref().unwrap().username, "alice");
        assert!(cached(&state).await.is_some());
    }

    #[tokio::test]
    async fn cache_hit_is_served_verbatim() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        add_post(&state, &alice, draft("one")).await.unwrap();
        let first = get_posts(&state).await.unwrap();

        // a write that bypasses the service leaves the snapshot untouched
        state
            .store
            .toggle_like(first[0].id, "mallory", OffsetDateTime::now_utc())
            .await
            .unwrap();
        let second = get_posts(&state).await.unwrap();
        assert_eq!(first, second);
        assert!(second[0].likes.is_empty());
    }

    #[tokio::test]
    async fn add_post_rejects_empty_and_duplicate_content() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;

        let err = add_post(&state, &alice, draft("")).await.unwrap_err();
        assert_eq!(err.to_string(), "Content is required");
        let err = add_post(&state, &alice, draft("   ")).await.unwrap_err();
        assert_eq!(err.to_string(), "Content is required");

        add_post(&state, &alice, draft("same")).await.unwrap();
        let bob = user(&state, "bob").await;
        let err = add_post(&state, &bob, draft("same")).await.unwrap_err();
        assert_eq!(err.to_string(), "Post already exists");
    }

    #[tokio::test]
    async fn add_post_normalizes_tags_and_blank_image() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let post = add_post(
            &state,
            &alice,
            PostDraft {
                content: "tagged".into(),
                tags: vec!["#work #tech#rust".into()],
                img_url: Some("  ".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(post.tags, vec!["#work", "#tech", "#rust"]);
        assert_eq!(post.img_url, None);
        assert_eq!(post.author_id, alice.id);
    }

    #[tokio::test]
    async fn like_twice_toggles_back() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let post = add_post(&state, &alice, draft("hi")).await.unwrap();
        let before = get_post_by_id(&state, post.id).await.unwrap().likes.len();

        get_posts(&state).await.unwrap();
        assert_eq!(like_post(&state, &alice, post.id).await.unwrap(), LikeOutcome::Liked);
        assert!(cached(&state).await.is_none());
        let liked = get_post_by_id(&state, post.id).await.unwrap();
        assert_eq!(liked.likes.len(), before + 1);
        assert!(liked.liked_by("alice"));

        assert_eq!(
            like_post(&state, &alice, post.id).await.unwrap(),
            LikeOutcome::Unliked
        );
        let after = get_post_by_id(&state, post.id).await.unwrap();
        assert_eq!(after.likes.len(), before);
    }

    #[tokio::test]
    async fn likes_are_per_username() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let bob = user(&state, "bob").await;
        let post = add_post(&state, &alice, draft("hi")).await.unwrap();

        like_post(&state, &alice, post.id).await.unwrap();
        like_post(&state, &bob, post.id).await.unwrap();
        like_post(&state, &alice, post.id).await.unwrap();

        let likes = get_post_by_id(&state, post.id).await.unwrap().likes;
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].username, "bob");
    }

    #[tokio::test]
    async fn like_missing_post_is_not_found() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let err = like_post(&state, &alice, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn comment_appends_exactly_one() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let post = add_post(&state, &alice, draft("hi")).await.unwrap();

        let first = comment_post(&state, &alice, post.id, "first").await.unwrap();
        get_posts(&state).await.unwrap();
        let comments = comment_post(&state, &alice, post.id, "hello").await.unwrap();
        assert_eq!(comments.len(), first.len() + 1);
        let last = comments.last().unwrap();
        assert_eq!(last.content, "hello");
        assert_eq!(last.username, "alice");
        assert!(cached(&state).await.is_none());
    }

    #[tokio::test]
    async fn comment_validation_and_missing_post() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let post = add_post(&state, &alice, draft("hi")).await.unwrap();

        let err = comment_post(&state, &alice, post.id, " ").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = comment_post(&state, &alice, Uuid::new_v4(), "x").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn posts_by_author_only_lists_that_author() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let bob = user(&state, "bob").await;
        add_post(&state, &alice, draft("a")).await.unwrap();
        add_post(&state, &bob, draft("b")).await.unwrap();

        let posts = get_posts_by_author(&state, bob.id).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].content, "b");
    }
}
