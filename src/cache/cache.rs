use std::{fmt::Debug, future::Future};

use redis::{aio::MultiplexedConnection, AsyncCommands};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ApiError;

// Caching - keys

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CacheKeyType {
    TagList,
    IngredientSearch,
}

impl CacheKeyType {
    pub fn new(self, key: impl ToString) -> CacheKey {
        CacheKey {
            _value: key.to_string(),
            _type: self,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CacheKey {
    _value: String,
    _type: CacheKeyType,
}

impl CacheKey {
    pub fn tag_list() -> Self {
        CacheKeyType::TagList.new("all")
    }

    /// Search terms are matched case-insensitively, so they share one entry.
    pub fn ingredient_search(name: Option<&str>) -> Self {
        CacheKeyType::IngredientSearch.new(name.unwrap_or_default().to_lowercase())
    }

    pub fn lifetime(&self) -> CacheLifetime {
        match self._type {
            CacheKeyType::TagList | CacheKeyType::IngredientSearch => {
                CacheLifetime::BindCatalogCache
            }
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self._type {
            CacheKeyType::TagList => write!(f, "tags-{}", self._value),
            CacheKeyType::IngredientSearch => write!(f, "ingredients-{}", self._value),
        }
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CacheLifetime {
    BindCatalogCache,
}

impl CacheLifetime {
    fn bind_key(&self) -> &'static str {
        match self {
            CacheLifetime::BindCatalogCache => "catalog-cache-key",
        }
    }

    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, ApiError> {
        get_cache_value(self.bind_key(), cache).await
    }

    /// Rotates the bind, orphaning every value written under the old one.
    pub async fn invalidate(&self, cache: &mut MultiplexedConnection) -> Result<(), ApiError> {
        let bind = uuid::Uuid::new_v4().to_string();
        log::debug!("Rotating {} to {}", self.bind_key(), bind);

        set_cache_value(self.bind_key(), bind, cache).await
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RedisValue<T> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<String>,
}

impl<T: Serialize + DeserializeOwned> RedisValue<T> {
    async fn new(
        value: T,
        lifetime: CacheLifetime,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, ApiError> {
        let bind = lifetime.get_cache_bind(cache).await?;

        Ok(Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        })
    }

    async fn validate(&self, cache: &mut MultiplexedConnection) -> Result<bool, ApiError> {
        Ok(self._bind == self._lifetime.get_cache_bind(cache).await?)
    }

    /// Reads `key`, returning `None` when it is missing or its bind went stale.
    pub async fn lookup(
        key: &CacheKey,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<T>, ApiError> {
        let raw: Option<String> = get_cache_value(&key.to_string(), cache).await?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let value: RedisValue<T> = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(_) => {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(&k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                return Ok(None);
            }
        };

        if value.validate(cache).await? {
            log::trace!("> Found {}", key);
            Ok(Some(value.value))
        } else {
            log::trace!("> Invalidated {}", key);
            Ok(None)
        }
    }

    pub async fn store(
        key: &CacheKey,
        value: T,
        cache: &mut MultiplexedConnection,
    ) -> Result<(), ApiError> {
        let value = RedisValue::new(value, key.lifetime(), cache).await?;
        let raw = serde_json::to_string(&value)?;

        set_cache_value(&key.to_string(), raw, cache).await
    }
}

/// Serves `key` from redis when possible, otherwise runs `fetch` and writes
/// the result back. Cache failures are logged and never fail the caller.
pub async fn cached<T, F, Fut>(
    cache: Option<MultiplexedConnection>,
    key: CacheKey,
    fetch: F,
) -> Result<T, ApiError>
where
    T: Serialize + DeserializeOwned + Clone + Debug,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let Some(mut cache) = cache else {
        return fetch().await;
    };

    match RedisValue::<T>::lookup(&key, &mut cache).await {
        Ok(Some(value)) => return Ok(value),
        Ok(None) => {}
        Err(e) => {
            log::warn!("Cache read for {} failed, using store: {e}", key);
            return fetch().await;
        }
    }

    log::trace!("> Fetching {}", key);
    let value = fetch().await?;

    if let Err(e) = RedisValue::store(&key, value.clone(), &mut cache).await {
        log::warn!("Cache write for {} failed: {e}", key);
    }

    Ok(value)
}

// Cache - raw handlers

pub async fn set_cache_value(
    key: &str,
    value: String,
    cache: &mut MultiplexedConnection,
) -> Result<(), ApiError> {
    let _: () = cache.set(key, value).await?;

    Ok(())
}

pub async fn delete_cache_value(
    key: &str,
    cache: &mut MultiplexedConnection,
) -> Result<(), ApiError> {
    let _: () = cache.del(key).await?;

    Ok(())
}

pub async fn get_cache_value(
    key: &str,
    cache: &mut MultiplexedConnection,
) -> Result<Option<String>, ApiError> {
    let value: Option<String> = cache.get(key).await?;

    Ok(value)
}
