use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{Cache, MemoryCache, RedisCache};
use crate::config::AppConfig;
use crate::store::{MemoryStore, PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub cache: Arc<dyn Cache>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.database_url.as_deref() {
            Some(url) => {
                let pg = PgStore::connect(url).await?;
                if let Err(e) = pg.migrate().await {
                    warn!(error = %e, "migration failed; continuing");
                }
                info!("using postgres store");
                Arc::new(pg) as Arc<dyn Store>
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store");
                Arc::new(MemoryStore::new()) as Arc<dyn Store>
            }
        };

        let cache = match config.redis_url.as_deref() {
            Some(url) => {
                info!("using redis cache");
                Arc::new(RedisCache::connect(url).await?) as Arc<dyn Cache>
            }
            None => {
                warn!("REDIS_URL not set; using in-memory cache");
                Arc::new(MemoryCache::new()) as Arc<dyn Cache>
            }
        };

        Ok(Self::from_parts(config, store, cache))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn Store>, cache: Arc<dyn Cache>) -> Self {
        Self {
            config,
            store,
            cache,
        }
    }

    /// In-memory store and cache with a fixed test signing key.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::JwtConfig;

        let config = Arc::new(AppConfig {
            database_url: None,
            redis_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
        });
        Self::from_parts(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCache::new()),
        )
    }
}
