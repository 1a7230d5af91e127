//! Tags the current telemetry span with who is calling.
//!
//! The bearer token payload is read without verification, only to label
//! request telemetry with the `user_name` and `client_id` claims.

use crate::auth::PathMatchRule;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use log::warn;
use opentelemetry::trace::get_active_span;
use opentelemetry::KeyValue;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Token is not a JWT")]
    NotJwt,
    #[error("Token payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Token payload is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
struct TrackingClaims {
    user_name: Option<String>,
    client_id: Option<String>,
}

/// Span attributes for the token, plus whether a client id was found
pub fn tracking_attributes(token: &str) -> Result<(Vec<KeyValue>, bool), TrackingError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next()) {
        (Some(_), Some(payload)) => payload,
        _ => return Err(TrackingError::NotJwt),
    };
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let claims: TrackingClaims = serde_json::from_slice(&bytes)?;

    let mut attributes = Vec::new();
    if let Some(user_name) = claims.user_name {
        attributes.push(KeyValue::new("username", user_name.clone()));
        attributes.push(KeyValue::new("enduser.id", user_name));
    }
    let has_client_id = claims.client_id.is_some();
    if let Some(client_id) = claims.client_id {
        attributes.push(KeyValue::new("clientId", client_id));
    }
    Ok((attributes, has_client_id))
}

/// Receives the raw `Authorization` header value of each tracked request.
pub trait TrackingDetailsRecorder: Send + Sync {
    fn record(&self, authorization: &str);
}

/// Sets the caller attributes on the active opentelemetry span.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanTrackingDetailsRecorder;

impl TrackingDetailsRecorder for SpanTrackingDetailsRecorder {
    fn record(&self, authorization: &str) {
        let Some(token) = authorization.strip_prefix(BEARER_PREFIX) else {
            return;
        };
        match tracking_attributes(token) {
            Ok((attributes, has_client_id)) => {
                if !has_client_id {
                    warn!("Unable to find clientId in token");
                }
                get_active_span(|span| {
                    for attribute in attributes {
                        span.set_attribute(attribute);
                    }
                });
            }
            Err(err) => warn!("problem decoding jwt for client tracking: {}", err),
        }
    }
}

#[derive(Clone)]
pub struct ClientTracking {
    pub rule: PathMatchRule,
    pub recorder: Arc<dyn TrackingDetailsRecorder>,
}

impl ClientTracking {
    pub fn new(rule: PathMatchRule) -> Self {
        Self {
            rule,
            recorder: Arc::new(SpanTrackingDetailsRecorder),
        }
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn TrackingDetailsRecorder>) -> Self {
        self.recorder = recorder;
        self
    }
}

impl Default for ClientTracking {
    fn default() -> Self {
        Self::new(PathMatchRule::default())
    }
}

/// Records tracking details for matching paths. Never rejects a request.
pub async fn client_tracking_middleware(
    State(tracking): State<ClientTracking>,
    request: Request,
    next: Next,
) -> Response {
    if tracking.rule.matches(request.uri().path()) {
        if let Some(authorization) = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        {
            tracking.recorder.record(authorization);
        }
    }
    next.run(request).await
}
