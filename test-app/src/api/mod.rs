pub(crate) mod caseload;
pub(crate) mod prison;
pub(crate) mod security_matcher;
pub(crate) mod unprotected;

use crate::state::AppState;
use crate::telemetry::request_span_middleware;
use axum::{middleware, Router};
use hmpps_kit::auth::resource_server_middleware;
use hmpps_kit::client_tracking::client_tracking_middleware;
use hmpps_kit::{health, sar};

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(prison::router())
        .merge(unprotected::router())
        .merge(caseload::router())
        .merge(security_matcher::router())
        .merge(health::router(state.health.clone()))
        .merge(sar::router(state.sar.clone()))
}

/// Wraps the complete app in the resource server and client tracking layers,
/// inside a request span.
///
/// Must be applied after every merge: a layer only covers the fallback of the
/// router it is added to, and merging replaces an unlayered fallback.
pub(super) fn secured(app: Router<AppState>, state: &AppState) -> Router<AppState> {
    app.layer(middleware::from_fn_with_state(
        state.resource_server.clone(),
        resource_server_middleware,
    ))
    .layer(middleware::from_fn_with_state(
        state.client_tracking.clone(),
        client_tracking_middleware,
    ))
    .layer(middleware::from_fn(request_span_middleware))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::TestApp;
    use hmpps_kit::test_support::TokenOptions;
    use http::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_health_reports_dependencies() {
        let app = TestApp::new().await;
        for server in [&app.hmpps_auth, &app.prison_api] {
            Mock::given(method("GET"))
                .and(path("/health/ping"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "UP"})))
                .mount(server)
                .await;
        }

        let response = app.fixture.get("/health").await;
        response.assert_ok();
        let body = response.json();
        assert_eq!(body["status"], "UP");
        assert_eq!(body["components"]["hmppsAuth"]["status"], "UP");
        assert_eq!(body["components"]["prisonApi"]["details"]["HttpStatus"], "200 OK");
        assert_eq!(body["components"]["tokenCache"]["status"], "UP");
    }

    #[tokio::test]
    async fn test_health_down_when_prison_api_down() {
        let app = TestApp::new().await;
        Mock::given(method("GET"))
            .and(path("/health/ping"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&app.hmpps_auth)
            .await;
        Mock::given(method("GET"))
            .and(path("/health/ping"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&app.prison_api)
            .await;

        let response = app.fixture.get("/health").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body = response.json();
        assert_eq!(body["status"], "DOWN");
        assert_eq!(body["components"]["prisonApi"]["details"]["body"], "unavailable");
        assert_eq!(body["components"]["hmppsAuth"]["status"], "UP");
    }

    #[tokio::test]
    async fn test_info_is_public() {
        let app = TestApp::new().await;
        let response = app.fixture.get("/info").await;
        response.assert_ok();
        assert_eq!(response.json()["build"]["name"], "test-app");
    }

    #[tokio::test]
    async fn test_unknown_path_requires_authentication() {
        let app = TestApp::new().await;
        app.fixture
            .get("/no-such-endpoint")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let token = app.jwt.authorisation_header(TokenOptions::default());
        app.fixture
            .get_with_token("/no-such-endpoint", &token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_subject_access_request() {
        let app = TestApp::new().await;
        let token = app.jwt.authorisation_header(TokenOptions {
            roles: vec!["SAR_DATA_ACCESS".to_string()],
            ..Default::default()
        });

        let response = app
            .fixture
            .get_with_token("/subject-access-request?prn=A1234BC", &token)
            .await;
        response.assert_ok();
        assert_eq!(
            response.json(),
            json!({"content": {"prisonerNumber": "A1234BC", "commentText": "some useful comment"}})
        );

        app.fixture
            .get_with_token("/subject-access-request?prn=B1234BC", &token)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let response = app
            .fixture
            .get_with_token("/subject-access-request?crn=X123456", &token)
            .await;
        assert_eq!(response.status.as_u16(), 209);
    }

    #[tokio::test]
    async fn test_subject_access_request_requires_role() {
        let app = TestApp::new().await;
        let token = app.jwt.authorisation_header(TokenOptions {
            roles: vec!["TEST_APP".to_string()],
            ..Default::default()
        });
        app.fixture
            .get_with_token("/subject-access-request?prn=A1234BC", &token)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        app.fixture
            .get("/subject-access-request/template")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_openapi_docs_served() {
        let app = TestApp::new().await;
        let response = app.fixture.get("/scalar").await;
        response.assert_ok();
    }

    #[tokio::test]
    async fn test_unknown_path_with_bad_token_is_rejected() {
        let app = TestApp::new().await;
        let response = app
            .fixture
            .get_with_token("/no-such-endpoint", "Bearer not-a-jwt")
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.header("www-authenticate"),
            Some("Bearer error=\"invalid_token\"")
        );
    }
}
