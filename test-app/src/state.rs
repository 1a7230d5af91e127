use crate::api::caseload::ActiveCaseloadTokenConverter;
use crate::config::{TestAppConfig, PRISON_API_REGISTRATION};
use crate::services::{PrisonApiService, TestAppSarService};
use hmpps_kit::auth::{
    CustomizerError, JwtVerifier, ResourceServer, ResourceServerCustomizer, VerificationError,
};
use hmpps_kit::cache::Cache;
use hmpps_kit::client_tracking::ClientTracking;
use hmpps_kit::health::{CacheHealthIndicator, HealthState, PingHealthCheck};
use hmpps_kit::oauth2::{
    authorised_web_client, health_web_client, AuthorizedClientManager,
    CacheAuthorizedClientService, GlobalPrincipalAuthorizedClientService, OAuth2Error,
    WebClientError,
};
use hmpps_kit::sar::{SarConfigError, SarState, SubjectAccessRequestService};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid security configuration: {0}")]
    Customizer(#[from] CustomizerError),
    #[error("Failed to create token verifier: {0}")]
    Verification(#[from] VerificationError),
    #[error("Failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to create token manager: {0}")]
    OAuth2(#[from] OAuth2Error),
    #[error("Failed to create web client: {0}")]
    WebClient(#[from] WebClientError),
    #[error(transparent)]
    Sar(#[from] SarConfigError),
}

#[derive(Clone)]
pub struct AppState {
    pub prison_api: PrisonApiService,
    pub resource_server: ResourceServer,
    pub client_tracking: ClientTracking,
    pub health: HealthState,
    pub sar: SarState,
}

/// Scalar UI, public alongside the library's default paths
const SCALAR_PATHS: &str = "/scalar/**";

/// Default security for the app: the library's public paths plus the docs UI,
/// any other request authenticated, and tokens carrying the configured active caseload.
pub fn resource_server_customizer(
    config: &TestAppConfig,
) -> Result<ResourceServerCustomizer, CustomizerError> {
    let caseload = config.active_caseload.clone();
    ResourceServerCustomizer::builder()
        .unauthorized_request_paths(|paths| paths.add_paths([SCALAR_PATHS]))
        .token_converter(Arc::new(ActiveCaseloadTokenConverter::new(move || {
            caseload.clone()
        })))
        .build()
}

impl AppState {
    pub fn new(
        config: &TestAppConfig,
        cache: Cache,
        customizer: ResourceServerCustomizer,
    ) -> Result<Self, StartupError> {
        let http = &config.hmpps.http_client;

        let mut auth = config.hmpps.auth.clone();
        auth.jwk_set_uri = Some(config.jwk_set_uri());
        let jwks_client = reqwest::Client::builder()
            .timeout(http.timeout())
            .connect_timeout(http.connect_timeout())
            .build()?;
        let verifier = JwtVerifier::from_config(&auth, jwks_client)?;

        // Client credentials tokens are shared by every caller, while the
        // username aware tokens are stored per principal.
        let registrations = vec![config.prison_api_registration()];
        let store = CacheAuthorizedClientService::new(cache.clone());
        let global_manager = AuthorizedClientManager::new(
            registrations.clone(),
            Arc::new(GlobalPrincipalAuthorizedClientService::new(store.clone())),
            http.timeout(),
        )?;
        let username_aware_manager =
            AuthorizedClientManager::new(registrations, Arc::new(store), http.timeout())?
                .with_username_in_token_request();

        let prison_api = PrisonApiService::new(
            authorised_web_client(
                global_manager,
                PRISON_API_REGISTRATION,
                &config.api.prison_api_url,
                http.timeout(),
            )?,
            authorised_web_client(
                username_aware_manager,
                PRISON_API_REGISTRATION,
                &config.api.prison_api_url,
                http.timeout(),
            )?,
        );

        let health_client = health_web_client(http.health_timeout())?;
        let health = HealthState::new(
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            &config.hmpps.info,
            http.health_timeout(),
        )
        .with_indicator(PingHealthCheck::new(
            "hmppsAuth",
            health_client.clone(),
            &config.api.hmpps_auth_url,
        ))
        .with_indicator(PingHealthCheck::new(
            "prisonApi",
            health_client,
            &config.api.prison_api_url,
        ))
        .with_indicator(CacheHealthIndicator::new(cache));

        let sar = SarState::new(
            SubjectAccessRequestService::prison(TestAppSarService),
            &config.hmpps.sar,
        )?;

        Ok(Self {
            prison_api,
            resource_server: ResourceServer::new(verifier, customizer),
            client_tracking: ClientTracking::new(config.hmpps.client_tracking.path_match_rule()),
            health,
            sar,
        })
    }
}
