//! Request-scoped access to the caller's authentication.
//!
//! The resource server middleware stores the [`Authentication`] in the
//! request extensions. Handlers take an [`AuthenticationHolder`] argument to
//! read it; code running outside a request (scheduled jobs, queue listeners)
//! builds an empty holder with [`AuthenticationHolder::default`].

use super::token::{AuthAwareAuthentication, AuthSource, Authentication, ROLE_PREFIX};
use crate::errors::ApiError;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use std::collections::BTreeSet;
use std::convert::Infallible;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthenticationError {
    #[error("No credentials found")]
    NoCredentials,
    #[error("Authentication not an instance of AuthAwareAuthentication, found {0} instead")]
    InsufficientAuthentication(&'static str),
}

impl From<AuthenticationError> for ApiError {
    fn from(err: AuthenticationError) -> Self {
        match err {
            AuthenticationError::NoCredentials => ApiError::unauthorized(err.to_string()),
            AuthenticationError::InsufficientAuthentication(_) => {
                ApiError::forbidden(err.to_string())
            }
        }
    }
}

impl IntoResponse for AuthenticationError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

fn normalise_role(role: &str) -> &str {
    role.strip_prefix(ROLE_PREFIX).unwrap_or(role)
}

/// True when any authority matches any of `roles`. Both sides may carry the `ROLE_` prefix.
pub fn has_any_role<'a, R: AsRef<str>>(
    authorities: impl IntoIterator<Item = &'a String>,
    roles: &[R],
) -> bool {
    let wanted: Vec<&str> = roles
        .iter()
        .map(|role| normalise_role(role.as_ref()))
        .collect();
    authorities
        .into_iter()
        .any(|authority| wanted.contains(&normalise_role(authority)))
}

#[derive(Debug, Clone, Default)]
pub struct AuthenticationHolder {
    authentication: Option<Authentication>,
}

impl AuthenticationHolder {
    pub fn new(authentication: Option<Authentication>) -> Self {
        Self { authentication }
    }

    /// The raw authentication, whatever converter produced it
    pub fn current(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    pub fn authentication(&self) -> Result<&AuthAwareAuthentication, AuthenticationError> {
        match &self.authentication {
            None => Err(AuthenticationError::NoCredentials),
            Some(Authentication::AuthAware(auth)) => Ok(auth),
            Some(other) => Err(AuthenticationError::InsufficientAuthentication(other.kind())),
        }
    }

    /// For code paths that may legitimately run without a caller
    pub fn authentication_or_none(&self) -> Option<&AuthAwareAuthentication> {
        self.authentication().ok()
    }

    pub fn principal(&self) -> Result<&str, AuthenticationError> {
        self.authentication().map(AuthAwareAuthentication::principal)
    }

    pub fn username(&self) -> Result<Option<&str>, AuthenticationError> {
        self.authentication().map(|auth| auth.user_name.as_deref())
    }

    pub fn client_id(&self) -> Result<&str, AuthenticationError> {
        self.authentication().map(|auth| auth.client_id.as_str())
    }

    pub fn auth_source(&self) -> Result<AuthSource, AuthenticationError> {
        self.authentication().map(|auth| auth.auth_source)
    }

    pub fn roles(&self) -> Result<&BTreeSet<String>, AuthenticationError> {
        self.authentication().map(|auth| &auth.authorities)
    }

    /// True for client credentials tokens issued without a user
    pub fn is_client_only(&self) -> Result<bool, AuthenticationError> {
        self.authentication()
            .map(AuthAwareAuthentication::is_system_client_credentials)
    }

    /// Checks the request's authentication of any kind against `roles`
    pub fn has_roles<R: AsRef<str>>(&self, roles: &[R]) -> bool {
        self.authentication
            .as_ref()
            .is_some_and(|auth| has_any_role(auth.authorities(), roles))
    }

    /// Checks only a held [`AuthAwareAuthentication`], used to let privileged
    /// callers bypass finer grained checks
    pub fn is_override_role<R: AsRef<str>>(&self, roles: &[R]) -> bool {
        self.authentication_or_none()
            .is_some_and(|auth| has_any_role(&auth.authorities, roles))
    }
}

impl<S> FromRequestParts<S> for AuthenticationHolder
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::new(parts.extensions.get::<Authentication>().cloned()))
    }
}
