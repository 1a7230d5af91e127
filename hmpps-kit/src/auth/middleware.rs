//! Axum middleware enforcing the resource server rules on every request.

use super::customizer::{Decision, ResourceServerCustomizer};
use super::holder::{has_any_role, AuthenticationError, AuthenticationHolder};
use super::token::Authentication;
use super::verifier::JwtVerifier;
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::debug;
use std::sync::Arc;

const BEARER_PREFIX: &str = "bearer ";

/// State for [`resource_server_middleware`]
#[derive(Clone)]
pub struct ResourceServer {
    pub verifier: JwtVerifier,
    pub customizer: Arc<ResourceServerCustomizer>,
}

impl ResourceServer {
    pub fn new(verifier: JwtVerifier, customizer: ResourceServerCustomizer) -> Self {
        Self {
            verifier,
            customizer: Arc::new(customizer),
        }
    }
}

/// `Ok(None)` when no bearer credentials were sent, `Err` when the header is unusable.
fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, ()> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| ())?;
    let Some(scheme) = value.get(..BEARER_PREFIX.len()) else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return Ok(None);
    }
    match value[BEARER_PREFIX.len()..].trim() {
        "" => Err(()),
        token => Ok(Some(token.to_string())),
    }
}

fn challenge(error: Option<&str>, message: &str) -> Response {
    let header_value = match error {
        Some(error) => format!("Bearer error=\"{error}\""),
        None => "Bearer".to_string(),
    };
    let mut response = ApiError::unauthorized(message).into_response();
    if let Ok(value) = HeaderValue::from_str(&header_value) {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

fn invalid_token(message: &str) -> Response {
    challenge(Some("invalid_token"), message)
}

/// Verifies the bearer token, converts it and applies the access rules.
///
/// On success the [`Authentication`] is added to the request extensions where
/// [`AuthenticationHolder`] picks it up.
pub async fn resource_server_middleware(
    State(server): State<ResourceServer>,
    mut request: Request,
    next: Next,
) -> Response {
    let customizer = &server.customizer;
    let path = request.uri().path().to_string();
    if !customizer.secures(&path) {
        return next.run(request).await;
    }

    let authentication: Option<Authentication> = match bearer_token(request.headers()) {
        Err(()) => return invalid_token("Bearer token is malformed"),
        Ok(None) => None,
        Ok(Some(token)) => {
            let jwt = match server.verifier.verify(&token).await {
                Ok(jwt) => jwt,
                Err(err) => {
                    debug!("Rejecting bearer token for {}: {}", path, err);
                    return invalid_token(&err.to_string());
                }
            };
            match customizer.token_converter().convert(jwt) {
                Ok(authentication) => Some(authentication),
                Err(err) => {
                    debug!("Rejecting bearer token for {}: {}", path, err);
                    return invalid_token(&err.to_string());
                }
            }
        }
    };

    let access = customizer.access_for(request.method(), &path);
    match access.decide(authentication.as_ref()) {
        Decision::Allow => {}
        Decision::Unauthenticated => {
            return challenge(None, "Full authentication is required to access this resource")
        }
        Decision::Forbidden => {
            debug!("Access denied to {} {}", request.method(), path);
            return ApiError::new("Access Denied", StatusCode::FORBIDDEN).into_response();
        }
    }

    if let Some(authentication) = authentication {
        request.extensions_mut().insert(authentication);
    }
    next.run(request).await
}

/// Method level role check for handlers, the equivalent of a pre-authorize guard.
pub fn require_any_role<R: AsRef<str>>(
    holder: &AuthenticationHolder,
    roles: &[R],
) -> Result<(), ApiError> {
    let Some(authentication) = holder.current() else {
        return Err(AuthenticationError::NoCredentials.into());
    };
    if has_any_role(authentication.authorities(), roles) {
        Ok(())
    } else {
        Err(ApiError::new("Access Denied", StatusCode::FORBIDDEN))
    }
}
