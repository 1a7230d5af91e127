//! OAuth2 resource server support: bearer token verification, the
//! authenticated principal derived from token claims, and the rules deciding
//! which requests need which roles.

pub mod customizer;
pub mod holder;
pub mod matcher;
pub mod middleware;
pub mod token;
pub mod verifier;

pub use customizer::{
    Access, AuthorizeRules, Authorization, CustomizerError, Decision, OverrideStyle,
    ResourceServerCustomizer, ResourceServerCustomizerBuilder, UnauthorizedRequestPaths,
    DEFAULT_UNAUTHORIZED_PATHS,
};
pub use holder::{has_any_role, AuthenticationError, AuthenticationHolder};
pub use matcher::{PathMatchRule, PathPattern};
pub use middleware::{require_any_role, resource_server_middleware, ResourceServer};
pub use token::{
    AuthAwareAuthentication, AuthAwareTokenConverter, AuthSource, Authentication, Jwt,
    JwtAuthentication, JwtTokenConverter, TokenConversionError, TokenConverter,
};
pub use verifier::{JwtVerifier, KeySource, VerificationError};
