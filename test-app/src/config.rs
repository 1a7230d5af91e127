use confique::Config;
use hmpps_kit::config::HmppsConfig;
use hmpps_kit::oauth2::ClientRegistration;

pub(crate) const PRISON_API_REGISTRATION: &str = "prison-api";

/// Main configuration structure for the test app
#[derive(Debug, Config, Clone)]
pub struct TestAppConfig {
    /// The port the server will listen to (default: 8080)
    #[config(env = "PORT", default = 8080)]
    pub port: u16,

    /// Caseload reported by `/active-caseload` for every caller (default: "MDI")
    #[config(env = "TEST_APP_ACTIVE_CASELOAD", default = "MDI")]
    pub active_caseload: String,

    #[config(nested)]
    pub api: ApiConfig,

    #[config(nested)]
    pub prison_api_client: ClientCredentialsConfig,

    #[config(nested)]
    pub hmpps: HmppsConfig,
}

/// Base URLs of the services the test app talks to
#[derive(Debug, Config, Clone)]
pub struct ApiConfig {
    #[config(env = "API_BASE_URL_HMPPS_AUTH", default = "http://localhost:8090/auth")]
    pub hmpps_auth_url: String,

    #[config(env = "API_BASE_URL_PRISON_API", default = "http://localhost:8093")]
    pub prison_api_url: String,
}

/// Client credentials used to call prison-api
#[derive(Debug, Config, Clone)]
pub struct ClientCredentialsConfig {
    #[config(env = "PRISON_API_CLIENT_ID", default = "test-app-client")]
    pub client_id: String,

    #[config(env = "PRISON_API_CLIENT_SECRET", default = "clientsecret")]
    pub client_secret: String,

    /// Comma-separated scopes to request (default: "read")
    #[config(
        env = "PRISON_API_CLIENT_SCOPES",
        parse_env = confique::env::parse::list_by_comma,
        default = ["read"]
    )]
    pub scopes: Vec<String>,
}

impl TestAppConfig {
    /// Loads configuration from the environment, then `test-app.toml` when present
    pub fn new() -> Result<Self, confique::Error> {
        Self::builder().env().file("test-app.toml").load()
    }

    /// The JWK set endpoint, falling back to the one published by HMPPS Auth
    pub fn jwk_set_uri(&self) -> String {
        self.hmpps
            .auth
            .jwk_set_uri
            .clone()
            .unwrap_or_else(|| format!("{}/.well-known/jwks.json", self.api.hmpps_auth_url))
    }

    pub fn prison_api_registration(&self) -> ClientRegistration {
        ClientRegistration {
            registration_id: PRISON_API_REGISTRATION.to_string(),
            client_id: self.prison_api_client.client_id.clone(),
            client_secret: self.prison_api_client.client_secret.clone(),
            token_uri: format!("{}/oauth/token", self.api.hmpps_auth_url),
            scopes: self.prison_api_client.scopes.clone(),
        }
    }

    #[cfg(test)]
    pub fn for_test_with_mocks(
        hmpps_auth_mock: &wiremock::MockServer,
        prison_api_mock: &wiremock::MockServer,
    ) -> Self {
        let mut config = Self::builder()
            .load()
            .expect("Failed to load default test configuration");
        config.api.hmpps_auth_url = hmpps_auth_mock.uri();
        config.api.prison_api_url = prison_api_mock.uri();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TestAppConfig::builder().load().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.active_caseload, "MDI");
        assert_eq!(config.prison_api_client.scopes, vec!["read".to_string()]);
        assert_eq!(
            config.jwk_set_uri(),
            "http://localhost:8090/auth/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_prison_api_registration() {
        let config = TestAppConfig::builder().load().unwrap();
        let registration = config.prison_api_registration();
        assert_eq!(registration.registration_id, "prison-api");
        assert_eq!(registration.client_id, "test-app-client");
        assert_eq!(
            registration.token_uri,
            "http://localhost:8090/auth/oauth/token"
        );
    }

    #[test]
    fn test_configured_jwk_set_uri_wins() {
        let mut config = TestAppConfig::builder().load().unwrap();
        config.hmpps.auth.jwk_set_uri = Some("http://keys/jwks".to_string());
        assert_eq!(config.jwk_set_uri(), "http://keys/jwks");
    }
}
