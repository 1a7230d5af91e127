//! Key/value storage behind the OAuth2 authorized client service.
//!
//! Values are stored as JSON strings so the same entries can live in process
//! memory or in a shared Redis instance when a service runs several replicas.

use crate::config::{CacheConfig, CacheStore};
use log::warn;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod null;
pub mod redis;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cannot encode entry: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Stored entry is unreadable: {0}")]
    Decode(String),
    #[error("Token store unavailable: {0}")]
    Redis(String),
    #[error("Invalid token store configuration: {0}")]
    Config(String),
}

/// Operations every storage backend supports.
///
/// Implementations are shared between request handlers, so they must be
/// `Send + Sync` and safe for concurrent get/set/delete on the same key.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Stores `value` until `expires_in` elapses or the backend TTL runs out,
    /// whichever comes first. A zero `expires_in` removes the key instead.
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        expires_in: Option<Duration>,
    ) -> Result<(), CacheError>;

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Checks the backend can serve requests. For Redis this round-trips a `PING`.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Lifetime of a new entry, `None` when it would already be expired
pub(crate) fn entry_ttl(max_ttl: Duration, expires_in: Option<Duration>) -> Option<Duration> {
    let ttl = expires_in.map_or(max_ttl, |expires_in| expires_in.min(max_ttl));
    (!ttl.is_zero()).then_some(ttl)
}

/// Backend selected from configuration at startup.
#[derive(Clone)]
pub enum Cache {
    /// Moka cache local to this process
    InMemory(memory::InMemoryCache),
    /// Redis shared between replicas
    Redis(redis::RedisCache),
    /// Stores nothing, every token request goes to the issuer
    Null(null::NullCache),
}

impl Cache {
    pub fn store_name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "in-memory",
            Self::Redis(_) => "redis",
            Self::Null(_) => "none",
        }
    }
}

#[async_trait::async_trait]
impl CacheBackend for Cache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        expires_in: Option<Duration>,
    ) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.set(key, value, expires_in).await,
            Self::Redis(cache) => cache.set(key, value, expires_in).await,
            Self::Null(cache) => cache.set(key, value, expires_in).await,
        }
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        match self {
            Self::InMemory(cache) => cache.get(key).await,
            Self::Redis(cache) => cache.get(key).await,
            Self::Null(cache) => cache.get(key).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.delete(key).await,
            Self::Redis(cache) => cache.delete(key).await,
            Self::Null(cache) => cache.delete(key).await,
        }
    }

    async fn ping(&self) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.ping().await,
            Self::Redis(cache) => cache.ping().await,
            Self::Null(cache) => cache.ping().await,
        }
    }
}

/// Creates the backend named by `config.store`.
///
/// Fails when Redis is selected without a URL or the server cannot be reached,
/// so a misconfigured service stops at startup rather than on its first
/// downstream call.
pub async fn create_cache(config: &CacheConfig) -> Result<Cache, CacheError> {
    match config.store {
        CacheStore::InMemory => {
            let cache = memory::InMemoryCache::new(config.ttl, config.memory.capacity)?;
            Ok(Cache::InMemory(cache))
        }
        CacheStore::Redis => {
            let url = config
                .redis
                .url
                .as_deref()
                .filter(|url| !url.is_empty())
                .ok_or_else(|| {
                    CacheError::Config("Redis URL is required for Redis cache".to_string())
                })?;
            Ok(Cache::Redis(redis::RedisCache::connect(url, config.ttl).await?))
        }
        CacheStore::None => {
            warn!("Token caching is disabled, every downstream call requests a new token");
            Ok(Cache::Null(null::NullCache::new()))
        }
    }
}
