use std::{convert::Infallible, sync::Arc};

use redis::aio::MultiplexedConnection;
use warp::Filter;

use crate::{
    cache::cache::CacheLifetime, config::EnvConfig, error::ApiError, memory::MemoryStore,
    postgres::PgStore, storage::MediaStorage, store::Store,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn Store>,
    pub media: MediaStorage,
    pub cache: Option<MultiplexedConnection>,
    pub config: Arc<EnvConfig>,
}

impl Context {
    pub fn new(
        store: Arc<dyn Store>,
        media: MediaStorage,
        cache: Option<MultiplexedConnection>,
        config: EnvConfig,
    ) -> Self {
        Self {
            store,
            media,
            cache,
            config: Arc::new(config),
        }
    }

    /// Connects the configured backends. Without `DATABASE_URL` the service
    /// runs on the in-memory store; an unreachable redis disables caching.
    pub async fn from_config(config: EnvConfig) -> Result<Self, ApiError> {
        let store: Arc<dyn Store> = match &config.db_url {
            Some(url) => {
                let store = PgStore::connect(url).await?;
                store.migrate().await?;
                log::info!("Connected to postgres");
                Arc::new(store)
            }
            None => {
                log::warn!("DATABASE_URL is not set, data is kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let cache = match &config.redis_url {
            Some(url) => match connect_cache(url).await {
                Ok(connection) => Some(connection),
                Err(e) => {
                    log::warn!("Redis unavailable, caching disabled: {e}");
                    None
                }
            },
            None => None,
        };

        let media = MediaStorage::new(&config.media_root, &config.media_url);

        Ok(Self::new(store, media, cache, config))
    }

    pub async fn invalidate_catalog(&self) {
        if let Some(mut cache) = self.cache.clone() {
            if let Err(e) = CacheLifetime::BindCatalogCache.invalidate(&mut cache).await {
                log::warn!("Failed to invalidate catalog cache: {e}");
            }
        }
    }
}

pub async fn connect_cache(url: &str) -> Result<MultiplexedConnection, ApiError> {
    let client = redis::Client::open(url)?;
    let connection = client.get_multiplexed_async_connection().await?;

    Ok(connection)
}

pub fn with_context(ctx: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}
