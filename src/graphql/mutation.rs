use async_graphql::{Context, Object, Result, ID};

use super::types::{CommentObject, LoginResponse};
use super::{app_state, parse_id, require_user, ApiResultExt};
use crate::{
    follows::services as follows,
    posts::services::{self as posts, PostDraft, POST_CREATED},
    users::services::{self as users, Registration},
};

pub const REGISTER_SUCCESS: &str = "Register Success";

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn register(
        &self,
        ctx: &Context<'_>,
        name: Option<String>,
        username: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<String> {
        let reg = Registration {
            name,
            username: username.unwrap_or_default(),
            email: email.unwrap_or_default(),
            password: password.unwrap_or_default(),
        };
        users::register(app_state(ctx)?, reg).await.extended()?;
        Ok(REGISTER_SUCCESS.to_string())
    }

    async fn login(
        &self,
        ctx: &Context<'_>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<LoginResponse> {
        let access_token = users::login(
            app_state(ctx)?,
            username.as_deref().unwrap_or_default(),
            password.as_deref().unwrap_or_default(),
        )
        .await
        .extended()?;
        Ok(LoginResponse { access_token })
    }

    async fn add_post(
        &self,
        ctx: &Context<'_>,
        content: Option<String>,
        tags: Option<Vec<Option<String>>>,
        img_url: Option<String>,
    ) -> Result<String> {
        let user = require_user(ctx).await?;
        let draft = PostDraft {
            content: content.unwrap_or_default(),
            tags: tags.unwrap_or_default().into_iter().flatten().collect(),
            img_url,
        };
        posts::add_post(app_state(ctx)?, &user, draft).await.extended()?;
        Ok(POST_CREATED.to_string())
    }

    async fn like_post(&self, ctx: &Context<'_>, post_id: Option<ID>) -> Result<String> {
        let user = require_user(ctx).await?;
        let post_id = parse_id(post_id.as_ref(), "Post ID is required").extended()?;
        let outcome = posts::like_post(app_state(ctx)?, &user, post_id)
            .await
            .extended()?;
        Ok(outcome.as_str().to_string())
    }

    async fn comment_post(
        &self,
        ctx: &Context<'_>,
        post_id: Option<ID>,
        content: Option<String>,
    ) -> Result<Vec<CommentObject>> {
        let user = require_user(ctx).await?;
        let post_id = parse_id(post_id.as_ref(), "Post ID is required").extended()?;
        let comments = posts::comment_post(
            app_state(ctx)?,
            &user,
            post_id,
            content.as_deref().unwrap_or_default(),
        )
        .await
        .extended()?;
        Ok(comments.into_iter().map(CommentObject::from).collect())
    }

    async fn follow_user(&self, ctx: &Context<'_>, following_id: Option<ID>) -> Result<String> {
        let user = require_user(ctx).await?;
        let following_id = parse_id(following_id.as_ref(), "Following ID required").extended()?;
        let outcome = follows::follow_user(app_state(ctx)?, &user, following_id)
            .await
            .extended()?;
        Ok(outcome.as_str().to_string())
    }
}
