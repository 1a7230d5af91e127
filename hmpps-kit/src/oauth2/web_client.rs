use super::{AuthorizedClientManager, OAuth2Error};
use http::StatusCode;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum WebClientError {
    #[error(transparent)]
    OAuth2(#[from] OAuth2Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unexpected status {status} from {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },
}

/// HTTP client for one downstream API that attaches a client-credentials bearer token.
#[derive(Clone)]
pub struct AuthorisedWebClient {
    client: Client,
    base_url: String,
    registration_id: String,
    manager: AuthorizedClientManager,
}

/// Builds an [`AuthorisedWebClient`] for `url` using tokens for `registration_id`
pub fn authorised_web_client(
    manager: AuthorizedClientManager,
    registration_id: impl Into<String>,
    url: impl Into<String>,
    timeout: Duration,
) -> Result<AuthorisedWebClient, WebClientError> {
    let client = Client::builder().timeout(timeout).build()?;
    let base_url: String = url.into();
    Url::parse(&base_url)?;
    Ok(AuthorisedWebClient {
        client,
        base_url: base_url.trim_end_matches('/').to_string(),
        registration_id: registration_id.into(),
        manager,
    })
}

/// Plain client for health pings, with a short timeout
pub fn health_web_client(health_timeout: Duration) -> Result<Client, WebClientError> {
    Ok(Client::builder().timeout(health_timeout).build()?)
}

impl AuthorisedWebClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` relative to the base URL on behalf of `principal`.
    ///
    /// A 401 or 403 from the downstream service discards the stored token so
    /// the next call fetches a new one.
    pub async fn get(
        &self,
        path: &str,
        principal: &str,
    ) -> Result<reqwest::Response, WebClientError> {
        let url = Url::parse(&format!("{}{}", self.base_url, path))?;
        let authorized = self
            .manager
            .authorize(&self.registration_id, principal)
            .await?;

        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&authorized.access_token.token_value)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            warn!(
                "{} rejected the {} token with status {}",
                self.base_url,
                self.registration_id,
                response.status()
            );
            self.manager.remove(&self.registration_id, principal).await?;
        }
        Ok(response)
    }

    /// GET and decode a JSON body, mapping 404 to `None`
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        principal: &str,
    ) -> Result<Option<T>, WebClientError> {
        let response = self.get(path, principal).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(WebClientError::Status { status, url, body });
        }
        Ok(Some(response.json().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth2::manager::tests::{global_manager, token_endpoint, token_response};
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, AuthorisedWebClient) {
        let server = MockServer::start().await;
        token_endpoint()
            .respond_with(token_response(3600))
            .mount(&server)
            .await;
        let client = authorised_web_client(
            global_manager(&server),
            "prison-api",
            server.uri(),
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_get_json_sends_bearer_token() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/api/offender/A1234AA"))
            .and(header("authorization", "Bearer system-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "bookingId": 1 })))
            .mount(&server)
            .await;

        let body: Option<Value> = client.get_json("/api/offender/A1234AA", "bob").await.unwrap();
        assert_eq!(body, Some(json!({ "bookingId": 1 })));
    }

    #[tokio::test]
    async fn test_get_json_not_found_is_none() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/api/offender/X"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let body: Option<Value> = client.get_json("/api/offender/X", "bob").await.unwrap();
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn test_get_json_server_error() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client
            .get_json::<Value>("/api/offender/X", "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, WebClientError::Status { status, body, .. }
            if status == StatusCode::INTERNAL_SERVER_ERROR && body == "boom"));
    }

    #[tokio::test]
    async fn test_unauthorized_response_discards_token() {
        let server = MockServer::start().await;
        token_endpoint()
            .respond_with(token_response(3600))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let client = authorised_web_client(
            global_manager(&server),
            "prison-api",
            server.uri(),
            DEFAULT_TIMEOUT,
        )
        .unwrap();

        for _ in 0..2 {
            let response = client.get("/api/offender/X", "bob").await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_invalid_base_url() {
        let manager = AuthorizedClientManager::new(
            [],
            std::sync::Arc::new(crate::oauth2::CacheAuthorizedClientService::new(
                crate::cache::Cache::Null(Default::default()),
            )),
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        let result = authorised_web_client(manager, "prison-api", "not a url", DEFAULT_TIMEOUT);
        assert!(matches!(result, Err(WebClientError::InvalidUrl(_))));
    }
}
