use super::{
    AccessToken, AuthorizedClient, AuthorizedClientService, OAuth2Error, ANONYMOUS_PRINCIPAL,
};
use chrono::Utc;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Tokens expiring within this window are renewed before use
const CLOCK_SKEW_SECS: i64 = 60;

/// Client credentials registered with HMPPS Auth
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRegistration {
    pub registration_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "bearer")]
    token_type: String,
    expires_in: Option<i64>,
    scope: Option<String>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

/// Hands out access tokens for registered clients, requesting new ones from
/// the token endpoint when the stored token is missing or about to expire.
#[derive(Clone)]
pub struct AuthorizedClientManager {
    registrations: Arc<HashMap<String, ClientRegistration>>,
    service: Arc<dyn AuthorizedClientService>,
    client: reqwest::Client,
    username_in_token_request: bool,
}

impl AuthorizedClientManager {
    pub fn new(
        registrations: impl IntoIterator<Item = ClientRegistration>,
        service: Arc<dyn AuthorizedClientService>,
        timeout: Duration,
    ) -> Result<Self, OAuth2Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| OAuth2Error::TokenRequest(err.to_string()))?;
        let registrations = registrations
            .into_iter()
            .map(|registration| (registration.registration_id.clone(), registration))
            .collect();
        Ok(Self {
            registrations: Arc::new(registrations),
            service,
            client,
            username_in_token_request: false,
        })
    }

    /// Sends the caller's principal as `username` on token requests so that
    /// HMPPS Auth embeds it in the issued token. Pair with a service that
    /// stores tokens per principal.
    pub fn with_username_in_token_request(mut self) -> Self {
        self.username_in_token_request = true;
        self
    }

    pub async fn authorize(
        &self,
        registration_id: &str,
        principal: &str,
    ) -> Result<AuthorizedClient, OAuth2Error> {
        let registration = self
            .registrations
            .get(registration_id)
            .ok_or_else(|| OAuth2Error::UnknownRegistration(registration_id.to_string()))?;

        if let Some(client) = self.service.load(registration_id, principal).await? {
            let skew = chrono::Duration::seconds(CLOCK_SKEW_SECS);
            if !client.access_token.expires_within(skew, Utc::now()) {
                return Ok(client);
            }
            debug!("Access token for {} is expiring, requesting a new one", registration_id);
        }

        let access_token = self.request_token(registration, principal).await?;
        let client = AuthorizedClient {
            registration_id: registration_id.to_string(),
            principal_name: principal.to_string(),
            access_token,
        };
        self.service.save(&client, principal).await?;
        Ok(client)
    }

    /// Drops the stored client, e.g. after the downstream service rejected its token
    pub async fn remove(&self, registration_id: &str, principal: &str) -> Result<(), OAuth2Error> {
        self.service.remove(registration_id, principal).await
    }

    async fn request_token(
        &self,
        registration: &ClientRegistration,
        principal: &str,
    ) -> Result<AccessToken, OAuth2Error> {
        let mut form = vec![("grant_type", "client_credentials".to_string())];
        if !registration.scopes.is_empty() {
            form.push(("scope", registration.scopes.join(" ")));
        }
        if self.username_in_token_request && principal != ANONYMOUS_PRINCIPAL {
            form.push(("username", principal.to_string()));
        }

        debug!(
            "Requesting client credentials token for {} from {}",
            registration.registration_id, registration.token_uri
        );
        let response = self
            .client
            .post(&registration.token_uri)
            .basic_auth(&registration.client_id, Some(&registration.client_secret))
            .form(&form)
            .send()
            .await
            .map_err(|err| OAuth2Error::TokenRequest(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Token request for {} failed with status {}: {}",
                registration.registration_id, status, body
            );
            return Err(OAuth2Error::TokenRequest(format!("status {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| OAuth2Error::TokenResponse(err.to_string()))?;

        let issued_at = Utc::now();
        let expires_at = token
            .expires_in
            .map(|secs| {
                chrono::Duration::try_seconds(secs)
                    .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        OAuth2Error::TokenResponse(format!("expires_in of {secs}s is out of range"))
                    })
            })
            .transpose()?;
        let scopes = match token.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => registration.scopes.clone(),
        };
        Ok(AccessToken {
            token_value: token.access_token,
            token_type: token.token_type,
            issued_at,
            expires_at,
            scopes,
        })
    }
}
