use hmpps_kit::auth::{AuthenticationError, AuthenticationHolder};
use hmpps_kit::oauth2::{principal_name, AuthorisedWebClient, WebClientError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OffenderBooking {
    pub booking_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub(crate) struct AuthResponse {
    pub greeting: String,
}

/// Calls prison-api with either a shared system token or one issued for the caller
#[derive(Clone)]
pub(crate) struct PrisonApiService {
    client: AuthorisedWebClient,
    username_aware_client: AuthorisedWebClient,
}

fn greeting(principal: &str) -> AuthResponse {
    AuthResponse {
        greeting: format!("Hello there {principal}"),
    }
}

fn offender_path(prison_number: &str) -> String {
    format!("/api/offender/{prison_number}")
}

impl PrisonApiService {
    pub fn new(client: AuthorisedWebClient, username_aware_client: AuthorisedWebClient) -> Self {
        Self {
            client,
            username_aware_client,
        }
    }

    /// `None` when prison-api does not know the prisoner
    pub async fn get_offender_booking(
        &self,
        prison_number: &str,
        holder: &AuthenticationHolder,
    ) -> Result<Option<OffenderBooking>, WebClientError> {
        self.client
            .get_json(&offender_path(prison_number), principal_name(holder))
            .await
    }

    pub async fn get_offender_booking_with_user_in_context(
        &self,
        prison_number: &str,
        holder: &AuthenticationHolder,
    ) -> Result<Option<OffenderBooking>, WebClientError> {
        self.username_aware_client
            .get_json(&offender_path(prison_number), principal_name(holder))
            .await
    }

    pub fn get_auth_token(
        &self,
        holder: &AuthenticationHolder,
    ) -> Result<AuthResponse, AuthenticationError> {
        Ok(greeting(holder.principal()?))
    }

    pub fn get_auth_token_or_none(&self, holder: &AuthenticationHolder) -> AuthResponse {
        match holder.authentication_or_none() {
            Some(authentication) => greeting(authentication.principal()),
            None => AuthResponse {
                greeting: "No authentication provided".to_string(),
            },
        }
    }
}
