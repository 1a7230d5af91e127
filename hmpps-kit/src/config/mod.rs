//! Configuration sections shared by every service built on the kit.
//!
//! Each section is a `confique` config so a consuming service can nest it
//! inside its own settings and load everything with one builder call.

pub mod auth;
pub mod cache;
pub mod client_tracking;
pub mod http_client;
pub mod info;
pub mod sar;

pub use auth::AuthConfig;
pub use cache::{CacheConfig, CacheStore, InMemoryConfig, RedisConfig};
pub use client_tracking::ClientTrackingConfig;
pub use http_client::HttpClientConfig;
pub use info::InfoConfig;
pub use sar::{SarConfig, SarTemplateConfig};

use confique::Config;

/// Every section the kit understands, for services that have no settings of their own.
#[derive(Debug, Config, Clone)]
pub struct HmppsConfig {
    #[config(nested)]
    pub auth: AuthConfig,

    #[config(nested)]
    pub http_client: HttpClientConfig,

    #[config(nested)]
    pub cache: CacheConfig,

    #[config(nested)]
    pub client_tracking: ClientTrackingConfig,

    #[config(nested)]
    pub sar: SarConfig,

    #[config(nested)]
    pub info: InfoConfig,
}

impl HmppsConfig {
    /// Loads configuration from `HMPPS_*` environment variables, then the optional toml file.
    pub fn load(file: Option<&str>) -> Result<Self, confique::Error> {
        let mut builder = Self::builder().env();
        if let Some(file) = file {
            builder = builder.file(file);
        }
        builder.load()
    }
}
