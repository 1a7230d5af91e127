//! `/health`, `/health/ping`, `/health/liveness`, `/health/readiness` and
//! `/info` endpoints.

mod checkers;
pub(crate) mod handlers;
mod models;

pub use checkers::{run_health_check, CacheHealthIndicator, HealthIndicator, PingHealthCheck};
pub use models::{BuildInfo, Health, HealthResponse, HealthStatus, InfoResponse};

use crate::config::InfoConfig;
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct HealthState {
    indicators: Vec<Arc<dyn HealthIndicator>>,
    timeout: Duration,
    info: Arc<InfoResponse>,
}

impl HealthState {
    /// `name` and `version` are reported by `/info`, usually from
    /// `env!("CARGO_PKG_NAME")` and `env!("CARGO_PKG_VERSION")` of the service.
    pub fn new(name: &str, version: &str, info: &InfoConfig, timeout: Duration) -> Self {
        let product_id = info
            .product_id_enabled
            .then(|| info.product_id.clone());
        Self {
            indicators: Vec::new(),
            timeout,
            info: Arc::new(InfoResponse {
                build: BuildInfo {
                    name: name.to_string(),
                    version: version.to_string(),
                },
                product_id,
            }),
        }
    }

    pub fn with_indicator(mut self, indicator: impl HealthIndicator + 'static) -> Self {
        self.indicators.push(Arc::new(indicator));
        self
    }
}

pub fn router<S>(state: HealthState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(handlers::health))
        .route("/health/ping", get(handlers::ping))
        .route("/health/liveness", get(handlers::liveness))
        .route("/health/readiness", get(handlers::readiness))
        .route("/info", get(handlers::info))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{null::NullCache, Cache};
    use crate::oauth2::health_web_client;
    use crate::test_support::TestFixture;
    use axum::http::StatusCode;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn info_config(product_id_enabled: bool) -> InfoConfig {
        InfoConfig {
            product_id_enabled,
            product_id: "DPS000".to_string(),
        }
    }

    async fn fixture_with(server: &MockServer, timeout: Duration) -> TestFixture {
        let state = HealthState::new("test-app", "1.2.3", &info_config(false), timeout)
            .with_indicator(PingHealthCheck::new(
                "prisonApi",
                health_web_client(Duration::from_secs(2)).unwrap(),
                server.uri(),
            ))
            .with_indicator(CacheHealthIndicator::new(Cache::Null(NullCache)));
        TestFixture::new(router(state))
    }

    #[tokio::test]
    async fn test_health_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health/ping"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let fixture = fixture_with(&server, Duration::from_secs(1)).await;

        let response = fixture.get("/health").await;
        response.assert_ok();
        let json = response.json();
        assert_eq!(json["status"], "UP");
        assert_eq!(json["components"]["prisonApi"]["status"], "UP");
        assert_eq!(json["components"]["prisonApi"]["details"]["HttpStatus"], "200 OK");
        assert_eq!(json["components"]["tokenCache"]["status"], "UP");
    }

    #[tokio::test]
    async fn test_health_down() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health/ping"))
            .respond_with(ResponseTemplate::new(404).set_body_string("some error"))
            .mount(&server)
            .await;
        let fixture = fixture_with(&server, Duration::from_secs(1)).await;

        let response = fixture.get("/health").await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        let json = response.json();
        assert_eq!(json["status"], "DOWN");
        assert_eq!(json["components"]["prisonApi"]["details"]["body"], "some error");
        assert_eq!(
            json["components"]["prisonApi"]["details"]["HttpStatus"],
            "404 Not Found"
        );

        let readiness = fixture.get("/health/readiness").await;
        assert_eq!(readiness.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_slow_dependency_is_down() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health/ping"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
        let fixture = fixture_with(&server, Duration::from_millis(200)).await;

        let response = fixture.get("/health").await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.json()["components"]["tokenCache"]["status"], "UP");
    }

    #[tokio::test]
    async fn test_ping_and_liveness_always_up() {
        let server = MockServer::start().await;
        let fixture = fixture_with(&server, Duration::from_secs(1)).await;

        for uri in ["/health/ping", "/health/liveness"] {
            let response = fixture.get(uri).await;
            response.assert_ok();
            assert_eq!(response.json()["status"], "UP");
        }
    }

    #[tokio::test]
    async fn test_info() {
        let state = HealthState::new("test-app", "1.2.3", &info_config(false), Duration::from_secs(1));
        let response = TestFixture::new(router(state)).get("/info").await;
        response.assert_ok();
        let json = response.json();
        assert_eq!(json["build"]["name"], "test-app");
        assert_eq!(json["build"]["version"], "1.2.3");
        assert!(json.get("productId").is_none());
    }

    #[tokio::test]
    async fn test_info_with_product_id() {
        let state = HealthState::new("test-app", "1.2.3", &info_config(true), Duration::from_secs(1));
        let response = TestFixture::new(router(state)).get("/info").await;
        assert_eq!(response.json()["productId"], "DPS000");
    }
}
