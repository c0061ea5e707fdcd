use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserFilter, UserNetwork};
use crate::{
    auth::{password, JwtKeys},
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 5;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Default)]
pub struct Registration {
    pub name: Option<String>,
    pub username: String,
    pub email: String,
    pub password: String,
}

fn required(value: &str, message: &str) -> ApiResult<()> {
    if value.is_empty() {
        return Err(ApiError::validation(message));
    }
    Ok(())
}

#[instrument(skip(state, reg), fields(username = %reg.username))]
pub async fn register(state: &AppState, reg: Registration) -> ApiResult<User> {
    let username = reg.username.trim().to_string();
    let email = reg.email.trim().to_lowercase();
    required(&username, "Username is required")?;
    required(&email, "Email is required")?;
    required(&reg.password, "Password is required")?;

    if state.store.user_exists(&username, &email).await? {
        warn!("username or email already registered");
        return Err(ApiError::validation("User already exists"));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::validation("Email must be valid"));
    }
    if reg.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = password::hash_password(&reg.password)?;
    let name = reg.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let user = state
        .store
        .insert_user(NewUser {
            name,
            username,
            email,
            password_hash,
        })
        .await?
        .ok_or_else(|| {
            warn!("username or email already registered");
            ApiError::validation("User already exists")
        })?;

    info!(user_id = %user.id, "user registered");
    Ok(user)
}

#[instrument(skip(state, password))]
pub async fn login(state: &AppState, username: &str, password: &str) -> ApiResult<String> {
    let username = username.trim();
    required(username, "Username is required")?;
    required(password, "Password is required")?;

    let Some(user) = state.store.find_user_by_username(username).await? else {
        warn!("login unknown username");
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify_password(password, &user.password)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(state).sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(token)
}

pub async fn find_users(state: &AppState, filter: UserFilter) -> ApiResult<Vec<User>> {
    Ok(state.store.search_users(&filter).await?)
}

#[instrument(skip(state))]
pub async fn find_user_by_id(state: &AppState, id: Uuid) -> ApiResult<UserNetwork> {
    state
        .store
        .user_network(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}
