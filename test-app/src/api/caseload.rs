use crate::openapi::TEST_APP_TAG;
use crate::state::AppState;
use axum::{routing::get, Json, Router};
use hmpps_kit::auth::{
    require_any_role, AuthAwareTokenConverter, Authentication, AuthenticationHolder, Jwt,
    TokenConversionError, TokenConverter,
};
use hmpps_kit::errors::{ApiError, ErrorResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

const ACTIVE_CASELOAD: &str = "active_caseload";
const CUSTOM_CONVERTER_ROLE: &str = "ROLE_CUSTOM_CONVERTER";

/// HMPPS authentication with the caller's active caseload attached
pub(crate) struct ActiveCaseloadTokenConverter {
    provider: Arc<dyn Fn() -> String + Send + Sync>,
}

impl ActiveCaseloadTokenConverter {
    pub fn new(provider: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

impl TokenConverter for ActiveCaseloadTokenConverter {
    fn convert(&self, jwt: Jwt) -> Result<Authentication, TokenConversionError> {
        let mut authentication = AuthAwareTokenConverter.extract(jwt)?;
        authentication
            .attributes
            .insert(ACTIVE_CASELOAD.to_string(), Value::String((self.provider)()));
        Ok(Authentication::AuthAware(authentication))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaseloadDetails {
    active_caseload: String,
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/active-caseload", get(get_active_caseload))
}

#[utoipa::path(
    get,
    path = "/active-caseload",
    tag = TEST_APP_TAG,
    responses(
        (status = 200, description = "Active caseload of the caller", body = CaseloadDetails),
        (status = 401, description = "No valid bearer token", body = ErrorResponse),
        (status = 403, description = "Requires ROLE_CUSTOM_CONVERTER", body = ErrorResponse),
        (status = 500, description = "Token was not converted with an active caseload", body = ErrorResponse)
    )
)]
pub(crate) async fn get_active_caseload(
    holder: AuthenticationHolder,
) -> Result<Json<CaseloadDetails>, ApiError> {
    require_any_role(&holder, &[CUSTOM_CONVERTER_ROLE])?;
    let active_caseload = holder
        .authentication()?
        .attribute_as_str(ACTIVE_CASELOAD)
        .ok_or_else(|| ApiError::internal("Authentication has no active caseload"))?
        .to_string();
    Ok(Json(CaseloadDetails { active_caseload }))
}
