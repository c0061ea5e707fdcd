use tracing::{info, instrument};
use uuid::Uuid;

use super::repo_types::FollowOutcome;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    users::repo_types::User,
};

#[instrument(skip(state, follower), fields(follower_id = %follower.id))]
pub async fn follow_user(
    state: &AppState,
    follower: &User,
    following_id: Uuid,
) -> ApiResult<FollowOutcome> {
    if following_id == follower.id {
        return Err(ApiError::validation("You cannot follow yourself"));
    }
    if state.store.find_user_by_id(following_id).await?.is_none() {
        return Err(ApiError::not_found("User account not found"));
    }

    let outcome = state.store.toggle_follow(follower.id, following_id).await?;
    info!(%following_id, outcome = outcome.as_str(), "follow toggled");
    Ok(outcome)
}
