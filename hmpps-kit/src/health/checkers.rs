use super::models::Health;
use crate::cache::{Cache, CacheBackend};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// A component contributing to `/health`
#[async_trait]
pub trait HealthIndicator: Send + Sync {
    fn name(&self) -> &str;

    async fn health(&self) -> Health;
}

/// Pings `{base_url}/health/ping` of a downstream service
#[derive(Clone)]
pub struct PingHealthCheck {
    name: String,
    client: reqwest::Client,
    base_url: String,
}

impl PingHealthCheck {
    pub fn new(
        name: impl Into<String>,
        client: reqwest::Client,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            name: name.into(),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl HealthIndicator for PingHealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn health(&self) -> Health {
        let url = format!("{}/health/ping", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    Health::up().with_detail("HttpStatus", status.to_string())
                } else {
                    let body = response.text().await.unwrap_or_default();
                    Health::down()
                        .with_detail("body", body)
                        .with_detail("HttpStatus", status.to_string())
                }
            }
            Err(err) => Health::down().with_detail("error", err.to_string()),
        }
    }
}

/// Reports whether the token cache backend is reachable
#[derive(Clone)]
pub struct CacheHealthIndicator {
    cache: Cache,
}

impl CacheHealthIndicator {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl HealthIndicator for CacheHealthIndicator {
    fn name(&self) -> &str {
        "tokenCache"
    }

    async fn health(&self) -> Health {
        let health = match self.cache.ping().await {
            Ok(()) => Health::up(),
            Err(err) => Health::down().with_detail("error", err.to_string()),
        };
        health.with_detail("store", self.cache.store_name())
    }
}

/// Runs one indicator, reporting `DOWN` when it takes longer than `limit`
pub async fn run_health_check(indicator: Arc<dyn HealthIndicator>, limit: Duration) -> Health {
    match timeout(limit, indicator.health()).await {
        Ok(health) => health,
        Err(_) => Health::down().with_detail(
            "error",
            format!(
                "{} health check timed out after {} seconds",
                indicator.name(),
                limit.as_secs_f64()
            ),
        ),
    }
}
