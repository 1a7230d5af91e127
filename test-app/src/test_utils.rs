use crate::config::TestAppConfig;
use crate::create_app;
use crate::state::{resource_server_customizer, AppState};
use hmpps_kit::auth::ResourceServerCustomizer;
use hmpps_kit::cache::create_cache;
use hmpps_kit::config::CacheConfig;
use hmpps_kit::test_support::{JwtAuthorisationHelper, TestFixture};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The whole app wired against mock HMPPS Auth and prison-api servers
pub(crate) struct TestApp {
    pub fixture: TestFixture,
    pub jwt: JwtAuthorisationHelper,
    pub hmpps_auth: MockServer,
    pub prison_api: MockServer,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    pub async fn with_customizer(customizer: ResourceServerCustomizer) -> Self {
        Self::build(Some(customizer)).await
    }

    async fn build(customizer: Option<ResourceServerCustomizer>) -> Self {
        let hmpps_auth = MockServer::start().await;
        let prison_api = MockServer::start().await;
        let jwt = JwtAuthorisationHelper::new();
        jwt.mount_jwks(&hmpps_auth).await;

        let config = TestAppConfig::for_test_with_mocks(&hmpps_auth, &prison_api);
        let customizer = match customizer {
            Some(customizer) => customizer,
            None => resource_server_customizer(&config).expect("Failed to build customizer"),
        };
        let cache = create_cache(&CacheConfig::in_memory(60))
            .await
            .expect("Failed to create cache");
        let state =
            AppState::new(&config, cache, customizer).expect("Failed to create app state");

        Self {
            fixture: TestFixture::new(create_app(state)),
            jwt,
            hmpps_auth,
            prison_api,
        }
    }

    /// Client credentials endpoint handing out `prison-api-token`
    pub async fn mount_token_endpoint(&self) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "prison-api-token",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .mount(&self.hmpps_auth)
            .await;
    }
}
