use crate::errors::ErrorResponse;
use crate::health::{BuildInfo, Health, HealthResponse, HealthStatus, InfoResponse};
use crate::sar::{Attachment, SubjectAccessRequestContent};
use utoipa::OpenApi;

pub const HEALTH_TAG: &str = "Health";
pub const SAR_TAG: &str = "Subject Access Request";

/// Documentation for the endpoints this crate contributes. Services merge it
/// into their own `OpenApi` document.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health::handlers::health,
        crate::health::handlers::readiness,
        crate::health::handlers::ping,
        crate::health::handlers::liveness,
        crate::health::handlers::info,
        crate::sar::handlers::subject_access_request,
        crate::sar::handlers::template,
    ),
    components(schemas(
        ErrorResponse,
        Health,
        HealthStatus,
        HealthResponse,
        BuildInfo,
        InfoResponse,
        SubjectAccessRequestContent,
        Attachment,
    )),
    tags(
        (name = HEALTH_TAG, description = "Health and build information"),
        (name = SAR_TAG, description = "Subject access request content for this service"),
    )
)]
pub struct HmppsApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_shared_endpoints() {
        let doc = HmppsApiDoc::openapi();
        for path in [
            "/health",
            "/health/ping",
            "/info",
            "/subject-access-request",
            "/subject-access-request/template",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
