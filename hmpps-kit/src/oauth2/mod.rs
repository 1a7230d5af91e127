//! OAuth2 client-credentials support for calling other HMPPS services.
//!
//! Tokens are obtained from the token endpoint by [`AuthorizedClientManager`]
//! and kept in an [`AuthorizedClientService`]. The default service stores
//! every token under a single global principal so that user-initiated
//! requests share one system token per registration.

mod manager;
mod service;
mod web_client;

pub use manager::{AuthorizedClientManager, ClientRegistration};
pub use service::{
    AuthorizedClientService, CacheAuthorizedClientService, GlobalPrincipalAuthorizedClientService,
    GLOBAL_PRINCIPAL,
};
pub use web_client::{
    authorised_web_client, health_web_client, AuthorisedWebClient, WebClientError,
    DEFAULT_HEALTH_TIMEOUT, DEFAULT_TIMEOUT,
};

use crate::auth::{Authentication, AuthenticationHolder};
use crate::cache::CacheError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Principal name used when a request carries no authentication
pub const ANONYMOUS_PRINCIPAL: &str = "anonymousUser";

#[derive(Debug, Error)]
pub enum OAuth2Error {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Unknown client registration: {0}")]
    UnknownRegistration(String),
    #[error("Token request failed: {0}")]
    TokenRequest(String),
    #[error("Invalid token response: {0}")]
    TokenResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token_value: String,
    pub token_type: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
}

impl AccessToken {
    /// True when the token has expired or will within `skew` of `now`
    pub fn expires_within(&self, skew: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at - skew <= now)
    }

    /// Remaining lifetime, zero once expired and `None` when the issuer gave no expiry
    pub fn expires_in(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        self.expires_at
            .map(|expires_at| (expires_at - now).to_std().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedClient {
    pub registration_id: String,
    pub principal_name: String,
    pub access_token: AccessToken,
}

/// Name of the caller for token caching, `anonymousUser` when unauthenticated
pub fn principal_name(holder: &AuthenticationHolder) -> &str {
    holder
        .current()
        .and_then(Authentication::name)
        .unwrap_or(ANONYMOUS_PRINCIPAL)
}
