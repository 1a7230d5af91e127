//! Helpers for testing services built on this crate: signed test tokens, a
//! JWK set to verify them, and an in-process router fixture.
//!
//! Enabled in dependent crates with the `test-utils` feature.

use crate::auth::token::ROLE_PREFIX;
use crate::auth::JwtVerifier;
use axum::body::Body;
use axum::Router;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::LevelFilter;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Claims for [`JwtAuthorisationHelper::create_jwt_access_token`].
///
/// Defaults describe a client credentials token for `test-client-id` valid
/// for two hours with the `read` scope and no roles.
#[derive(Debug, Clone)]
pub struct TokenOptions {
    pub client_id: String,
    pub username: Option<String>,
    pub scope: Vec<String>,
    /// Role names, `ROLE_` is added when missing
    pub roles: Vec<String>,
    pub expiry: chrono::Duration,
    pub jwt_id: String,
    pub auth_source: String,
    pub grant_type: String,
    pub issuer: Option<String>,
}

impl Default for TokenOptions {
    fn default() -> Self {
        Self {
            client_id: "test-client-id".to_string(),
            username: None,
            scope: vec!["read".to_string()],
            roles: Vec::new(),
            expiry: chrono::Duration::hours(2),
            jwt_id: Uuid::new_v4().to_string(),
            auth_source: "none".to_string(),
            grant_type: "client_credentials".to_string(),
            issuer: None,
        }
    }
}

/// Signs test tokens with a random HS256 secret and publishes the matching
/// `oct` JWK, standing in for HMPPS Auth.
#[derive(Debug, Clone)]
pub struct JwtAuthorisationHelper {
    secret: Vec<u8>,
    key_id: String,
}

impl Default for JwtAuthorisationHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl JwtAuthorisationHelper {
    pub fn new() -> Self {
        Self::with_key_id("test-kid")
    }

    pub fn with_key_id(key_id: &str) -> Self {
        let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        Self {
            secret: secret.into_bytes(),
            key_id: key_id.to_string(),
        }
    }

    pub fn jwk_set_json(&self) -> Value {
        json!({
            "keys": [{
                "kty": "oct",
                "kid": self.key_id,
                "alg": "HS256",
                "k": URL_SAFE_NO_PAD.encode(&self.secret),
            }]
        })
    }

    pub fn jwk_set(&self) -> JwkSet {
        serde_json::from_value(self.jwk_set_json()).expect("test JWK set should deserialize")
    }

    /// Verifier trusting only this helper's key
    pub fn verifier(&self) -> JwtVerifier {
        JwtVerifier::with_jwk_set(self.jwk_set())
    }

    /// Serves the JWK set at [`JWKS_PATH`] and returns its full URL
    pub async fn mount_jwks(&self, server: &MockServer) -> String {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.jwk_set_json()))
            .mount(server)
            .await;
        format!("{}{}", server.uri(), JWKS_PATH)
    }

    pub fn create_jwt_access_token(&self, options: TokenOptions) -> String {
        let now = Utc::now();
        let authorities: Vec<String> = options
            .roles
            .iter()
            .map(|role| {
                if role.starts_with(ROLE_PREFIX) {
                    role.clone()
                } else {
                    format!("{ROLE_PREFIX}{role}")
                }
            })
            .collect();

        let mut claims = json!({
            "sub": options.username.as_deref().unwrap_or(&options.client_id),
            "client_id": options.client_id,
            "scope": options.scope,
            "authorities": authorities,
            "auth_source": options.auth_source,
            "grant_type": options.grant_type,
            "jti": options.jwt_id,
            "iat": now.timestamp(),
            "exp": (now + options.expiry).timestamp(),
        });
        if let Some(username) = options.username {
            claims["user_name"] = json!(username);
        }
        if let Some(issuer) = options.issuer {
            claims["iss"] = json!(issuer);
        }

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.key_id.clone());
        encode(&header, &claims, &EncodingKey::from_secret(&self.secret))
            .expect("test token should encode")
    }

    /// `Bearer <token>` for the `Authorization` header
    pub fn authorisation_header(&self, options: TokenOptions) -> String {
        format!("Bearer {}", self.create_jwt_access_token(options))
    }
}

/// Sends requests straight into a router without binding a socket.
pub struct TestFixture {
    pub app: Router,
}

impl TestFixture {
    pub fn new(app: Router) -> Self {
        Self::setup_logger(LevelFilter::Debug);
        Self { app }
    }

    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        self.get_with_headers(uri, &[]).await
    }

    pub async fn get_with_token(
        &self,
        uri: impl AsRef<str>,
        authorisation: &str,
    ) -> TestResponse {
        self.get_with_headers(uri, &[("Authorization", authorisation)])
            .await
    }

    pub async fn get_with_headers(
        &self,
        uri: impl AsRef<str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(uri.as_ref());
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {} but got {} with body: {}",
            expected, self.status, self.body
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// Body as JSON, an empty object when the body is empty or not JSON
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| json!({}))
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_str(&self.body).expect("Failed to deserialize response JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}
