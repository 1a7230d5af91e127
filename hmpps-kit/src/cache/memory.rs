use super::{entry_ttl, CacheBackend, CacheError};
use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Entry {
    json: Arc<str>,
    ttl: Duration,
}

/// Each entry carries its own lifetime so a token leaves the cache when it expires.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Process-local token store, bounded by the serialized size of its entries.
#[derive(Clone)]
pub struct InMemoryCache {
    entries: MokaCache<String, Entry>,
    max_ttl: Duration,
}

impl InMemoryCache {
    pub fn new(ttl_secs: u64, capacity_mib: usize) -> Result<Self, CacheError> {
        let max_bytes = capacity_mib
            .checked_mul(1024 * 1024)
            .and_then(|bytes| u64::try_from(bytes).ok())
            .ok_or_else(|| {
                CacheError::Config(format!("capacity of {capacity_mib} MiB is too large"))
            })?;

        let entries = MokaCache::builder()
            .expire_after(EntryExpiry)
            .weigher(|key: &String, entry: &Entry| -> u32 {
                (key.len() + entry.json.len()).try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(max_bytes)
            .build();

        Ok(Self {
            entries,
            max_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        expires_in: Option<Duration>,
    ) -> Result<(), CacheError> {
        let Some(ttl) = entry_ttl(self.max_ttl, expires_in) else {
            self.entries.remove(key).await;
            return Ok(());
        };
        let entry = Entry {
            json: serde_json::to_string(value)?.into(),
            ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        let Some(entry) = self.entries.get(key).await else {
            return Ok(None);
        };
        serde_json::from_str(&entry.json)
            .map(Some)
            .map_err(|err| CacheError::Decode(err.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key).await;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
