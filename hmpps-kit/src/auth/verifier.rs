//! Bearer token signature and expiry checks against the issuer's JWK set.

use super::token::Jwt;
use crate::config::AuthConfig;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{
    decode, decode_header, Algorithm, AlgorithmFamily, DecodingKey, Header, Validation,
};
use log::{debug, warn};
use moka::future::Cache as MokaCache;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Shortest gap between two fetches of the remote set
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Error, Clone)]
pub enum VerificationError {
    #[error("Malformed token: {0}")]
    MalformedToken(String),
    #[error("No signing key found for kid {0:?}")]
    UnknownKey(Option<String>),
    #[error("Failed to fetch JWK set: {0}")]
    KeyFetch(String),
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Resource server misconfigured: {0}")]
    Config(String),
}

/// JWK set fetched from the issuer and kept for a configurable time.
///
/// Unknown key ids trigger a refetch, at most once per `min_refresh_interval`.
#[derive(Clone)]
pub struct RemoteJwkSet {
    uri: String,
    client: reqwest::Client,
    cache: MokaCache<(), Arc<JwkSet>>,
    fetched_at: Arc<Mutex<Option<Instant>>>,
    min_refresh_interval: Duration,
}

impl RemoteJwkSet {
    pub fn new(uri: impl Into<String>, client: reqwest::Client, ttl: Duration) -> Self {
        Self {
            uri: uri.into(),
            client,
            cache: MokaCache::builder()
                .max_capacity(1)
                .time_to_live(ttl)
                .build(),
            fetched_at: Arc::new(Mutex::new(None)),
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        }
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    fn recently_fetched(&self) -> bool {
        let fetched_at = self.fetched_at.lock().unwrap_or_else(PoisonError::into_inner);
        fetched_at.is_some_and(|at| at.elapsed() < self.min_refresh_interval)
    }

    async fn get(&self) -> Result<Arc<JwkSet>, VerificationError> {
        self.cache
            .try_get_with((), self.fetch())
            .await
            .map_err(|err| err.as_ref().clone())
    }

    /// Drops the cached set and fetches it again, used when a token names an
    /// unknown key. Returns `None` when the set was fetched too recently.
    async fn refresh(&self) -> Result<Option<Arc<JwkSet>>, VerificationError> {
        if self.recently_fetched() {
            debug!(
                "Skipping JWK set refresh, fetched less than {:?} ago",
                self.min_refresh_interval
            );
            return Ok(None);
        }
        self.cache.invalidate(&()).await;
        self.get().await.map(Some)
    }

    async fn fetch(&self) -> Result<Arc<JwkSet>, VerificationError> {
        debug!("Fetching JWK set from {}", self.uri);
        let response = self
            .client
            .get(&self.uri)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| VerificationError::KeyFetch(err.to_string()))?;
        let jwk_set: JwkSet = response
            .json()
            .await
            .map_err(|err| VerificationError::KeyFetch(err.to_string()))?;
        debug!("Fetched {} keys from {}", jwk_set.keys.len(), self.uri);
        *self.fetched_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        Ok(Arc::new(jwk_set))
    }
}

pub enum KeySource {
    Remote(RemoteJwkSet),
    Static(Arc<JwkSet>),
}

impl KeySource {
    async fn keys(&self) -> Result<Arc<JwkSet>, VerificationError> {
        match self {
            Self::Remote(remote) => remote.get().await,
            Self::Static(keys) => Ok(keys.clone()),
        }
    }
}

/// Whether `jwk` can verify a signature made with `alg`
fn key_fits(jwk: &Jwk, alg: Algorithm) -> bool {
    let family_fits = matches!(
        (&jwk.algorithm, alg.family()),
        (AlgorithmParameters::OctetKey(_), AlgorithmFamily::Hmac)
            | (AlgorithmParameters::RSA(_), AlgorithmFamily::Rsa)
            | (AlgorithmParameters::EllipticCurve(_), AlgorithmFamily::Ec)
            | (AlgorithmParameters::OctetKeyPair(_), AlgorithmFamily::Ed)
    );
    family_fits
        && jwk
            .common
            .key_algorithm
            .is_none_or(|key_alg| key_alg.to_string() == format!("{alg:?}"))
}

/// Tokens without a `kid` use the first key that fits the header's algorithm
fn select_key<'a>(keys: &'a JwkSet, header: &Header) -> Option<&'a Jwk> {
    match &header.kid {
        Some(kid) => keys.find(kid),
        None => keys.keys.iter().find(|jwk| key_fits(jwk, header.alg)),
    }
}

#[derive(Clone)]
pub struct JwtVerifier {
    keys: Arc<KeySource>,
    issuer: Option<String>,
    leeway: u64,
}

impl JwtVerifier {
    pub fn new(keys: KeySource) -> Self {
        Self {
            keys: Arc::new(keys),
            issuer: None,
            leeway: 60,
        }
    }

    /// Verifier against the configured issuer's JWK set endpoint
    pub fn from_config(
        config: &AuthConfig,
        client: reqwest::Client,
    ) -> Result<Self, VerificationError> {
        let uri = config.jwk_set_uri.as_deref().ok_or_else(|| {
            VerificationError::Config("auth.jwk_set_uri must be configured".to_string())
        })?;
        let remote = RemoteJwkSet::new(uri, client, Duration::from_secs(config.jwks_cache_ttl))
            .with_min_refresh_interval(Duration::from_secs(config.jwks_min_refresh_interval));
        let mut verifier = Self::new(KeySource::Remote(remote)).with_leeway(config.leeway);
        if let Some(issuer) = &config.issuer {
            verifier = verifier.with_issuer(issuer);
        }
        Ok(verifier)
    }

    pub fn with_jwk_set(keys: JwkSet) -> Self {
        Self::new(KeySource::Static(Arc::new(keys)))
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }

    async fn decoding_key(&self, header: &Header) -> Result<DecodingKey, VerificationError> {
        let keys = self.keys.keys().await?;
        let jwk = match select_key(&keys, header) {
            Some(jwk) => jwk.clone(),
            None => {
                // the issuer may have rotated its keys since the set was cached
                let KeySource::Remote(remote) = self.keys.as_ref() else {
                    return Err(VerificationError::UnknownKey(header.kid.clone()));
                };
                let refreshed = remote.refresh().await?;
                refreshed
                    .as_deref()
                    .and_then(|keys| select_key(keys, header))
                    .cloned()
                    .ok_or_else(|| VerificationError::UnknownKey(header.kid.clone()))?
            }
        };
        DecodingKey::from_jwk(&jwk).map_err(|err| VerificationError::Invalid(err.to_string()))
    }

    /// Checks signature, `exp` and, when configured, `iss`. Audience is not checked.
    pub async fn verify(&self, token: &str) -> Result<Jwt, VerificationError> {
        let header =
            decode_header(token).map_err(|err| VerificationError::MalformedToken(err.to_string()))?;
        let key = self.decoding_key(&header).await?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = decode::<Map<String, Value>>(token, &key, &validation).map_err(|err| {
            warn!("Token verification failed: {}", err);
            VerificationError::Invalid(err.to_string())
        })?;

        Ok(Jwt {
            token_value: token.to_string(),
            header: data.header,
            claims: data.claims,
        })
    }
}
