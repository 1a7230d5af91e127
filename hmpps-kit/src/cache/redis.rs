use super::{entry_ttl, CacheBackend, CacheError};
use async_trait::async_trait;
use log::error;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Store shared by all replicas of a service, so one client credentials token
/// is reused across the whole deployment.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    max_ttl: Duration,
}

impl RedisCache {
    /// Opens a managed connection and checks the server answers before returning
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)
            .map_err(|err| CacheError::Config(format!("bad Redis URL {redis_url}: {err}")))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|err| CacheError::Redis(err.to_string()))?;

        let cache = Self {
            connection,
            max_ttl: Duration::from_secs(ttl_secs),
        };
        cache.ping().await?;
        Ok(cache)
    }
}

fn redis_error(action: &str, key: &str, err: redis::RedisError) -> CacheError {
    error!("Redis error while {} key {}: {}", action, key, err);
    CacheError::Redis(err.to_string())
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        expires_in: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let Some(ttl) = entry_ttl(self.max_ttl, expires_in) else {
            return connection
                .del::<_, ()>(key)
                .await
                .map_err(|err| redis_error("deleting", key, err));
        };
        let json = serde_json::to_string(value)?;
        // PX keeps sub-second token lifetimes from rounding down to zero
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        connection
            .pset_ex::<_, _, ()>(key, json, millis)
            .await
            .map_err(|err| redis_error("setting", key, err))
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        let mut connection = self.connection.clone();
        let json: Option<String> = connection
            .get(key)
            .await
            .map_err(|err| redis_error("getting", key, err))?;
        json.map(|json| {
            serde_json::from_str(&json).map_err(|err| CacheError::Decode(err.to_string()))
        })
        .transpose()
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        connection
            .del::<_, ()>(key)
            .await
            .map_err(|err| redis_error("deleting", key, err))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut connection)
            .await
            .map(|_| ())
            .map_err(|err| CacheError::Redis(err.to_string()))
    }
}
