use crate::api::{caseload, prison, security_matcher, unprotected};
use crate::services::{AuthResponse, OffenderBooking};
use hmpps_kit::openapi::HmppsApiDoc;
use utoipa::OpenApi;

pub(crate) const TEST_APP_TAG: &str = "Test App";

#[derive(OpenApi)]
#[openapi(
    paths(
        prison::get_time,
        prison::get_offender_booking,
        prison::get_offender_booking_with_user,
        prison::get_auth_token,
        unprotected::get_auth_token,
        caseload::get_active_caseload,
        security_matcher::get_security_matcher_endpoint,
    ),
    components(schemas(OffenderBooking, AuthResponse, caseload::CaseloadDetails)),
    tags(
        (name = TEST_APP_TAG, description = "Endpoints exercising the HMPPS security setup"),
    ),
    info(
        title = "HMPPS Test App",
        description = "Demonstrates resource server security, client credentials and SAR support",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;

/// The app's own endpoints plus the health and SAR endpoints from the kit
pub(crate) fn api_doc() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.merge(HmppsApiDoc::openapi());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_app_and_kit_endpoints() {
        let doc = api_doc();
        for path in [
            "/time",
            "/prisoner/{prison_number}/booking",
            "/unprotected/auth/token",
            "/active-caseload",
            "/health",
            "/subject-access-request",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert_eq!(doc.info.title, "HMPPS Test App");
    }
}
