use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::anyhow;

/// Key under which the access token is stored.
pub const TOKEN_KEY: &str = "token";

/// Secure key/value storage owned by the client platform.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let values = self.values.read().map_err(|_| anyhow!("credential store poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut values = self.values.write().map_err(|_| anyhow!("credential store poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut values = self.values.write().map_err(|_| anyhow!("credential store poisoned"))?;
        values.remove(key);
        Ok(())
    }
}
