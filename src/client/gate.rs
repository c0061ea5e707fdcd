use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::credentials::{CredentialStore, TOKEN_KEY};
use crate::auth::jwt::peek_subject;

/// Decides between the logged-in and logged-out halves of the client.
#[derive(Clone)]
pub struct AuthGate {
    credentials: Arc<dyn CredentialStore>,
}

impl AuthGate {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    pub fn token(&self) -> anyhow::Result<Option<String>> {
        self.credentials.get(TOKEN_KEY)
    }

    pub fn is_logged_in(&self) -> anyhow::Result<bool> {
        Ok(self.token()?.is_some())
    }

    pub fn log_in(&self, token: &str) -> anyhow::Result<()> {
        self.credentials.set(TOKEN_KEY, token)?;
        debug!("token stored");
        Ok(())
    }

    pub fn log_out(&self) -> anyhow::Result<()> {
        self.credentials.delete(TOKEN_KEY)?;
        debug!("token removed");
        Ok(())
    }

    /// Subject of the stored token, if any. The signature is not checked here.
    pub fn current_user_id(&self) -> anyhow::Result<Option<Uuid>> {
        self.token()?.map(|t| peek_subject(&t)).transpose()
    }
}
