use async_graphql::{Context, Object, Result, ID};

use super::types::{PostObject, UserObject};
use super::{app_state, parse_id, require_user, ApiResultExt};
use crate::{posts::services as posts, users::repo_types::UserFilter, users::services as users};

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn get_posts(&self, ctx: &Context<'_>) -> Result<Vec<PostObject>> {
        require_user(ctx).await?;
        let posts = posts::get_posts(app_state(ctx)?).await.extended()?;
        Ok(posts.into_iter().map(PostObject::from).collect())
    }

    async fn get_post_by_id(&self, ctx: &Context<'_>, id: Option<ID>) -> Result<PostObject> {
        require_user(ctx).await?;
        let id = parse_id(id.as_ref(), "Id is required").extended()?;
        let post = posts::get_post_by_id(app_state(ctx)?, id).await.extended()?;
        Ok(post.into())
    }

    async fn find_posts_by_author(
        &self,
        ctx: &Context<'_>,
        author_id: Option<ID>,
    ) -> Result<Vec<PostObject>> {
        require_user(ctx).await?;
        let author_id = parse_id(author_id.as_ref(), "Author ID is required").extended()?;
        let posts = posts::get_posts_by_author(app_state(ctx)?, author_id)
            .await
            .extended()?;
        Ok(posts.into_iter().map(PostObject::from).collect())
    }

    async fn find_user(
        &self,
        ctx: &Context<'_>,
        name: Option<String>,
        username: Option<String>,
    ) -> Result<Vec<UserObject>> {
        let found = users::find_users(app_state(ctx)?, UserFilter::new(name, username))
            .await
            .extended()?;
        Ok(found.into_iter().map(UserObject::from).collect())
    }

    async fn find_user_by_id(&self, ctx: &Context<'_>, id: Option<ID>) -> Result<UserObject> {
        let id = parse_id(id.as_ref(), "Id is required").extended()?;
        let network = users::find_user_by_id(app_state(ctx)?, id).await.extended()?;
        Ok(network.into())
    }
}
