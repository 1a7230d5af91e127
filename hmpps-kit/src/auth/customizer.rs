//! Declarative tweaks to the default resource server rules.
//!
//! Without customization every path requires an authenticated caller except
//! [`DEFAULT_UNAUTHORIZED_PATHS`]. A service can instead extend or replace the
//! public paths and demand a role for everything else, or take over the whole
//! rule table. The two approaches cannot be combined.

use super::holder::has_any_role;
use super::matcher::PathPattern;
use super::token::{AuthAwareTokenConverter, Authentication, TokenConverter};
use http::Method;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_UNAUTHORIZED_PATHS: &[&str] = &[
    "/webjars/**",
    "/favicon.ico",
    "/csrf",
    "/health/**",
    "/info",
    "/h2-console/**",
    "/v3/api-docs/**",
    "/swagger-ui/**",
    "/swagger-ui.html",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustomizerError {
    #[error("Cannot override the entire authorizeHttpRequests DSL and try to customize it at the same time.")]
    ConflictingHttpRequests,
    #[error("Cannot override the entire authorizeExchange DSL and try to customize it at the same time.")]
    ConflictingExchange,
    #[error("Cannot override both the authorizeHttpRequests DSL and authorizeExchange DSL as an application cannot be both servlet and reactive based.")]
    BothOverrides,
}

/// What a request must present to reach a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    PermitAll,
    Authenticated,
    HasRole(String),
    HasAnyRole(Vec<String>),
    DenyAll,
}

/// Outcome of checking a request against an [`Access`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Unauthenticated,
    Forbidden,
}

impl Access {
    pub fn has_role(role: impl Into<String>) -> Self {
        Self::HasRole(role.into())
    }

    pub fn has_any_role<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::HasAnyRole(roles.into_iter().map(Into::into).collect())
    }

    pub fn decide(&self, authentication: Option<&Authentication>) -> Decision {
        match (self, authentication) {
            (Self::PermitAll, _) => Decision::Allow,
            (Self::DenyAll, _) => Decision::Forbidden,
            (_, None) => Decision::Unauthenticated,
            (Self::Authenticated, Some(_)) => Decision::Allow,
            (Self::HasRole(role), Some(auth)) => {
                allow_if(has_any_role(auth.authorities(), std::slice::from_ref(role)))
            }
            (Self::HasAnyRole(roles), Some(auth)) => {
                allow_if(has_any_role(auth.authorities(), roles.as_slice()))
            }
        }
    }
}

fn allow_if(allowed: bool) -> Decision {
    if allowed {
        Decision::Allow
    } else {
        Decision::Forbidden
    }
}

#[derive(Debug, Clone)]
struct AuthorizeRule {
    method: Option<Method>,
    pattern: PathPattern,
    access: Access,
}

/// Ordered rule table; the first matching rule wins, then `any_request`.
#[derive(Debug, Clone)]
pub struct AuthorizeRules {
    rules: Vec<AuthorizeRule>,
    any_request: Access,
}

impl Default for AuthorizeRules {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            any_request: Access::Authenticated,
        }
    }
}

impl AuthorizeRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authorize(mut self, pattern: &str, access: Access) -> Self {
        self.rules.push(AuthorizeRule {
            method: None,
            pattern: PathPattern::new(pattern),
            access,
        });
        self
    }

    pub fn authorize_method(mut self, method: Method, pattern: &str, access: Access) -> Self {
        self.rules.push(AuthorizeRule {
            method: Some(method),
            pattern: PathPattern::new(pattern),
            access,
        });
        self
    }

    pub fn any_request(mut self, access: Access) -> Self {
        self.any_request = access;
        self
    }

    pub fn access_for(&self, method: &Method, path: &str) -> &Access {
        self.rules
            .iter()
            .find(|rule| {
                rule.method.as_ref().is_none_or(|m| m == method) && rule.pattern.matches(path)
            })
            .map(|rule| &rule.access)
            .unwrap_or(&self.any_request)
    }

    fn permitting<'a>(paths: impl IntoIterator<Item = &'a PathPattern>) -> Self {
        paths
            .into_iter()
            .fold(Self::new(), |rules, path| rules.authorize(path.as_str(), Access::PermitAll))
    }
}

/// Public paths facet: extends the defaults unless `include_defaults(false)`
#[derive(Debug, Clone)]
pub struct UnauthorizedRequestPaths {
    add_paths: Vec<String>,
    include_defaults: bool,
}

impl Default for UnauthorizedRequestPaths {
    fn default() -> Self {
        Self {
            add_paths: Vec::new(),
            include_defaults: true,
        }
    }
}

impl UnauthorizedRequestPaths {
    pub fn add_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn include_defaults(mut self, include_defaults: bool) -> Self {
        self.include_defaults = include_defaults;
        self
    }

    fn patterns(&self) -> Vec<PathPattern> {
        let defaults = DEFAULT_UNAUTHORIZED_PATHS
            .iter()
            .copied()
            .filter(|_| self.include_defaults);
        defaults
            .chain(self.add_paths.iter().map(String::as_str))
            .map(PathPattern::new)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideStyle {
    HttpRequests,
    Exchange,
}

#[derive(Debug, Clone)]
pub enum Authorization {
    /// Default public paths, everything else authenticated
    Default,
    Targeted {
        unauthorized_paths: Vec<PathPattern>,
        any_request_role: Option<String>,
    },
    /// Rule table supplied whole by the service
    Override {
        style: OverrideStyle,
        rules: AuthorizeRules,
    },
}

impl Authorization {
    fn rules(&self) -> AuthorizeRules {
        match self {
            Self::Default => {
                let defaults: Vec<PathPattern> = DEFAULT_UNAUTHORIZED_PATHS
                    .iter()
                    .map(|path| PathPattern::new(path))
                    .collect();
                AuthorizeRules::permitting(&defaults)
            }
            Self::Targeted {
                unauthorized_paths,
                any_request_role,
            } => {
                let any_request = match any_request_role {
                    Some(role) => Access::has_role(role.clone()),
                    None => Access::Authenticated,
                };
                AuthorizeRules::permitting(unauthorized_paths).any_request(any_request)
            }
            Self::Override { rules, .. } => rules.clone(),
        }
    }
}

/// Immutable resource server configuration built by [`ResourceServerCustomizerBuilder`].
#[derive(Clone)]
pub struct ResourceServerCustomizer {
    security_matcher: Vec<PathPattern>,
    authorization: Authorization,
    rules: AuthorizeRules,
    token_converter: Arc<dyn TokenConverter>,
}

impl fmt::Debug for ResourceServerCustomizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceServerCustomizer")
            .field("security_matcher", &self.security_matcher)
            .field("authorization", &self.authorization)
            .finish_non_exhaustive()
    }
}

impl Default for ResourceServerCustomizer {
    fn default() -> Self {
        Self::from_parts(
            Vec::new(),
            Authorization::Default,
            Arc::new(AuthAwareTokenConverter),
        )
    }
}

impl ResourceServerCustomizer {
    pub fn builder() -> ResourceServerCustomizerBuilder {
        ResourceServerCustomizerBuilder::default()
    }

    fn from_parts(
        security_matcher: Vec<PathPattern>,
        authorization: Authorization,
        token_converter: Arc<dyn TokenConverter>,
    ) -> Self {
        let rules = authorization.rules();
        Self {
            security_matcher,
            authorization,
            rules,
            token_converter,
        }
    }

    /// Whether the security layer applies to `path` at all
    pub fn secures(&self, path: &str) -> bool {
        self.security_matcher.is_empty() || self.security_matcher.iter().any(|p| p.matches(path))
    }

    pub fn access_for(&self, method: &Method, path: &str) -> &Access {
        self.rules.access_for(method, path)
    }

    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    pub fn token_converter(&self) -> &Arc<dyn TokenConverter> {
        &self.token_converter
    }
}

#[derive(Default)]
pub struct ResourceServerCustomizerBuilder {
    security_matcher: Vec<String>,
    unauthorized_request_paths: Option<UnauthorizedRequestPaths>,
    any_request_role: Option<String>,
    authorize_http_requests: Option<AuthorizeRules>,
    authorize_exchange: Option<AuthorizeRules>,
    token_converter: Option<Arc<dyn TokenConverter>>,
}

impl ResourceServerCustomizerBuilder {
    pub fn security_matcher<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.security_matcher = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn unauthorized_request_paths(
        mut self,
        customize: impl FnOnce(UnauthorizedRequestPaths) -> UnauthorizedRequestPaths,
    ) -> Self {
        self.unauthorized_request_paths = Some(customize(UnauthorizedRequestPaths::default()));
        self
    }

    pub fn any_request_role(mut self, role: impl Into<String>) -> Self {
        self.any_request_role = Some(role.into());
        self
    }

    pub fn authorize_http_requests(mut self, rules: AuthorizeRules) -> Self {
        self.authorize_http_requests = Some(rules);
        self
    }

    pub fn authorize_exchange(mut self, rules: AuthorizeRules) -> Self {
        self.authorize_exchange = Some(rules);
        self
    }

    pub fn token_converter(mut self, converter: Arc<dyn TokenConverter>) -> Self {
        self.token_converter = Some(converter);
        self
    }

    pub fn build(self) -> Result<ResourceServerCustomizer, CustomizerError> {
        let targeted =
            self.unauthorized_request_paths.is_some() || self.any_request_role.is_some();

        if self.authorize_http_requests.is_some() && targeted {
            return Err(CustomizerError::ConflictingHttpRequests);
        }
        if self.authorize_exchange.is_some() && targeted {
            return Err(CustomizerError::ConflictingExchange);
        }

        let authorization = match (self.authorize_http_requests, self.authorize_exchange) {
            (Some(_), Some(_)) => return Err(CustomizerError::BothOverrides),
            (Some(rules), None) => Authorization::Override {
                style: OverrideStyle::HttpRequests,
                rules,
            },
            (None, Some(rules)) => Authorization::Override {
                style: OverrideStyle::Exchange,
                rules,
            },
            (None, None) if targeted => Authorization::Targeted {
                unauthorized_paths: self
                    .unauthorized_request_paths
                    .unwrap_or_default()
                    .patterns(),
                any_request_role: self.any_request_role,
            },
            (None, None) => Authorization::Default,
        };

        let security_matcher = self
            .security_matcher
            .iter()
            .map(|path| PathPattern::new(path))
            .collect();
        let token_converter = self
            .token_converter
            .unwrap_or_else(|| Arc::new(AuthAwareTokenConverter));

        Ok(ResourceServerCustomizer::from_parts(
            security_matcher,
            authorization,
            token_converter,
        ))
    }
}
