use confique::Config;
use serde::Deserialize;

/// Specifies where OAuth2 client tokens are stored between requests.
///
/// Unrecognised names fail configuration loading; caching is only turned off
/// by an explicit `none`.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStore {
    #[default]
    InMemory,
    Redis,
    None,
}

/// Configuration for the authorized client token store
#[derive(Debug, Config, Clone)]
pub struct CacheConfig {
    /// Store type: "in-memory" (default), "redis" or "none"
    #[config(env = "HMPPS_CACHE_STORE", default = "in-memory")]
    pub store: CacheStore,

    /// Upper bound on how long a token stays cached, in seconds (default: 1 hour).
    /// Tokens are refreshed earlier when they are about to expire.
    #[config(env = "HMPPS_CACHE_TTL", default = 3600)]
    pub ttl: u64,

    #[config(nested)]
    pub memory: InMemoryConfig,

    #[config(nested)]
    pub redis: RedisConfig,
}

/// In-memory cache configuration options
#[derive(Debug, Config, Clone)]
pub struct InMemoryConfig {
    /// Maximum capacity in MiB (default: 16 MiB)
    #[config(env = "HMPPS_CACHE_MEMORY_CAPACITY", default = 16)]
    pub capacity: usize,
}

/// Redis cache configuration options
#[derive(Debug, Config, Clone)]
pub struct RedisConfig {
    /// Redis connection string, required when the store is "redis"
    #[config(env = "HMPPS_CACHE_REDIS_URL")]
    pub url: Option<String>,
}

impl CacheConfig {
    /// In-memory store with the given TTL, handy for services and tests that skip config loading
    pub fn in_memory(ttl: u64) -> Self {
        Self {
            store: CacheStore::InMemory,
            ttl,
            memory: InMemoryConfig { capacity: 16 },
            redis: RedisConfig { url: None },
        }
    }
}
