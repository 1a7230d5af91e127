use confique::Config;

/// Resource server token verification settings
#[derive(Debug, Config, Clone)]
pub struct AuthConfig {
    /// JWK set endpoint of the token issuer, e.g. `{hmpps-auth}/.well-known/jwks.json`
    #[config(env = "HMPPS_AUTH_JWK_SET_URI")]
    pub jwk_set_uri: Option<String>,

    /// Expected `iss` claim; not checked when unset
    #[config(env = "HMPPS_AUTH_ISSUER")]
    pub issuer: Option<String>,

    /// Clock skew allowed when checking `exp` and `nbf`, in seconds (default: 60)
    #[config(env = "HMPPS_AUTH_LEEWAY", default = 60)]
    pub leeway: u64,

    /// How long a fetched JWK set is reused, in seconds (default: 300)
    #[config(env = "HMPPS_AUTH_JWKS_CACHE_TTL", default = 300)]
    pub jwks_cache_ttl: u64,

    /// Minimum time between JWK set refetches caused by unknown key ids, in seconds (default: 30)
    #[config(env = "HMPPS_AUTH_JWKS_MIN_REFRESH_INTERVAL", default = 30)]
    pub jwks_min_refresh_interval: u64,
}
