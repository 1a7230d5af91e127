//! Mapping from verified token claims to the request's authentication.

use jsonwebtoken::Header;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;
use utoipa::ToSchema;

pub const ROLE_PREFIX: &str = "ROLE_";
pub const SCOPE_PREFIX: &str = "SCOPE_";

/// Identity system that authenticated the user named in the token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthSource {
    #[default]
    None,
    Nomis,
    Delius,
    Auth,
}

impl AuthSource {
    /// Unknown or absent values map to [`AuthSource::None`]
    pub fn from_claim(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("nomis") => Self::Nomis,
            Some("delius") => Self::Delius,
            Some("auth") => Self::Auth,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Nomis => "nomis",
            Self::Delius => "delius",
            Self::Auth => "auth",
        }
    }
}

/// A token whose signature and expiry have been checked
#[derive(Debug, Clone)]
pub struct Jwt {
    pub token_value: String,
    pub header: Header,
    pub claims: Map<String, Value>,
}

impl Jwt {
    pub fn claim_as_str(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.claim_as_str("sub")
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TokenConversionError {
    #[error("Token is missing required claim '{0}'")]
    MissingClaim(&'static str),
    #[error("Token rejected: {0}")]
    Rejected(String),
}

/// The authentication produced by [`AuthAwareTokenConverter`].
#[derive(Debug, Clone)]
pub struct AuthAwareAuthentication {
    pub jwt: Jwt,
    pub client_id: String,
    pub user_name: Option<String>,
    pub auth_source: AuthSource,
    pub authorities: BTreeSet<String>,
    /// Extra values set by custom converters
    pub attributes: Map<String, Value>,
}

impl AuthAwareAuthentication {
    /// The user name when the token was issued for a user, otherwise the client id
    pub fn principal(&self) -> &str {
        self.user_name.as_deref().unwrap_or(&self.client_id)
    }

    pub fn is_system_client_credentials(&self) -> bool {
        self.user_name.is_none()
    }

    pub fn attribute_as_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }
}

/// Authentication from a converter that does not understand HMPPS claims
#[derive(Debug, Clone)]
pub struct JwtAuthentication {
    pub jwt: Jwt,
    pub authorities: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub enum Authentication {
    AuthAware(AuthAwareAuthentication),
    Jwt(JwtAuthentication),
}

impl Authentication {
    pub fn authorities(&self) -> &BTreeSet<String> {
        match self {
            Self::AuthAware(auth) => &auth.authorities,
            Self::Jwt(auth) => &auth.authorities,
        }
    }

    /// Principal name, falling back to `sub` for plain JWT authentication
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::AuthAware(auth) => Some(auth.principal()),
            Self::Jwt(auth) => auth.jwt.subject(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthAware(_) => "AuthAwareAuthentication",
            Self::Jwt(_) => "JwtAuthentication",
        }
    }
}

/// Turns a verified token into the authentication stored on the request.
pub trait TokenConverter: Send + Sync {
    fn convert(&self, jwt: Jwt) -> Result<Authentication, TokenConversionError>;
}

/// Authorities from the `scope` (or `scp`) claim, each prefixed with `SCOPE_`.
/// The claim may be a space separated string or an array of strings.
pub fn scope_authorities(claims: &Map<String, Value>) -> BTreeSet<String> {
    let scopes = claims.get("scope").or_else(|| claims.get("scp"));
    let names: Vec<&str> = match scopes {
        Some(Value::String(scopes)) => scopes.split_whitespace().collect(),
        Some(Value::Array(scopes)) => scopes.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .map(|scope| format!("{SCOPE_PREFIX}{scope}"))
        .collect()
}

fn claim_authorities(claims: &Map<String, Value>) -> impl Iterator<Item = String> + '_ {
    claims
        .get("authorities")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
}

/// Default converter for tokens issued by HMPPS Auth.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthAwareTokenConverter;

impl AuthAwareTokenConverter {
    /// Conversion without wrapping, for custom converters that add attributes.
    pub fn extract(&self, jwt: Jwt) -> Result<AuthAwareAuthentication, TokenConversionError> {
        let client_id = jwt
            .claim_as_str("client_id")
            .ok_or(TokenConversionError::MissingClaim("client_id"))?
            .to_string();
        let user_name = jwt.claim_as_str("user_name").map(str::to_string);
        let auth_source = AuthSource::from_claim(jwt.claim_as_str("auth_source"));

        let mut authorities = scope_authorities(&jwt.claims);
        authorities.extend(claim_authorities(&jwt.claims));

        Ok(AuthAwareAuthentication {
            jwt,
            client_id,
            user_name,
            auth_source,
            authorities,
            attributes: Map::new(),
        })
    }
}

impl TokenConverter for AuthAwareTokenConverter {
    fn convert(&self, jwt: Jwt) -> Result<Authentication, TokenConversionError> {
        self.extract(jwt).map(Authentication::AuthAware)
    }
}

/// Keeps the token as is with scope authorities only.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtTokenConverter;

impl TokenConverter for JwtTokenConverter {
    fn convert(&self, jwt: Jwt) -> Result<Authentication, TokenConversionError> {
        let authorities = scope_authorities(&jwt.claims);
        Ok(Authentication::Jwt(JwtAuthentication { jwt, authorities }))
    }
}
