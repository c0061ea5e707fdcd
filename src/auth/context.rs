use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{header::AUTHORIZATION, HeaderMap},
};
use tokio::sync::OnceCell;
use tracing::{error, warn};

use super::jwt::JwtKeys;
use crate::{
    error::{ApiError, ApiResult, AuthError},
    state::AppState,
    store::Store,
    users::repo_types::User,
};

/// Per-request authentication capability. Nothing is checked until a
/// resolver asks for [`AuthContext::current_user`]; the answer is then
/// memoized for the rest of the request.
pub struct AuthContext {
    authorization: Option<String>,
    keys: JwtKeys,
    store: Arc<dyn Store>,
    user: OnceCell<User>,
}

impl AuthContext {
    pub fn new(authorization: Option<String>, state: &AppState) -> Self {
        Self {
            authorization,
            keys: JwtKeys::from_ref(state),
            store: state.store.clone(),
            user: OnceCell::new(),
        }
    }

    pub fn from_headers(headers: &HeaderMap, state: &AppState) -> Self {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        Self::new(authorization, state)
    }

    pub async fn current_user(&self) -> ApiResult<User> {
        self.user
            .get_or_try_init(|| self.resolve())
            .await
            .cloned()
    }

    async fn resolve(&self) -> ApiResult<User> {
        let result = self.resolve_inner().await;
        if let Err(ApiError::Unauthenticated(reason)) = &result {
            warn!(%reason, "authentication failed");
        }
        result
    }

    async fn resolve_inner(&self) -> ApiResult<User> {
        let header = self
            .authorization
            .as_deref()
            .ok_or(AuthError::MissingHeader)?;

        // Expect "Bearer <token>"
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidScheme)?;

        let claims = self
            .keys
            .verify(token)
            .map_err(|_| AuthError::InvalidToken)?;

        match self.store.find_user_by_id(claims.sub).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(AuthError::UnknownUser.into()),
            Err(e) => {
                error!(error = %e, user_id = %claims.sub, "load authenticated user failed");
                Err(ApiError::Internal(e))
            }
        }
    }
}
