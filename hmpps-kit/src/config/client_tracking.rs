use crate::auth::matcher::PathMatchRule;
use confique::Config;

/// Paths on which bearer token details are attached to the active span
#[derive(Debug, Config, Clone)]
pub struct ClientTrackingConfig {
    /// Comma-separated path patterns to track (default: "/**")
    #[config(
        env = "HMPPS_CLIENT_TRACKING_INCLUDE",
        parse_env = confique::env::parse::list_by_comma,
        default = ["/**"]
    )]
    pub include: Vec<String>,

    /// Comma-separated path patterns never tracked (default: none)
    #[config(
        env = "HMPPS_CLIENT_TRACKING_EXCLUDE",
        parse_env = confique::env::parse::list_by_comma,
        default = []
    )]
    pub exclude: Vec<String>,
}

impl ClientTrackingConfig {
    pub fn path_match_rule(&self) -> PathMatchRule {
        PathMatchRule::new(&self.include, &self.exclude)
    }
}
