use crate::openapi::TEST_APP_TAG;
use crate::services::{AuthResponse, OffenderBooking};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDateTime};
use hmpps_kit::auth::{require_any_role, AuthenticationHolder};
use hmpps_kit::errors::{ApiError, ErrorResponse};
use hmpps_kit::oauth2::WebClientError;
use log::error;

const TEST_APP_ROLE: &str = "ROLE_TEST_APP";

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/time", get(get_time))
        .route("/prisoner/{prison_number}/booking", get(get_offender_booking))
        .route(
            "/prisoner/{prison_number}/booking/user",
            get(get_offender_booking_with_user),
        )
        .route("/auth/token", get(get_auth_token))
}

fn prison_api_error(err: WebClientError) -> ApiError {
    error!("Failed to call prison-api: {}", err);
    ApiError::internal("Unexpected error calling prison-api").with_developer_message(err)
}

#[utoipa::path(
    get,
    path = "/time",
    tag = TEST_APP_TAG,
    responses(
        (status = 200, description = "Current local time", body = String),
        (status = 401, description = "No valid bearer token", body = ErrorResponse),
        (status = 403, description = "Requires ROLE_TEST_APP", body = ErrorResponse)
    )
)]
pub(crate) async fn get_time(holder: AuthenticationHolder) -> Result<Json<NaiveDateTime>, ApiError> {
    require_any_role(&holder, &[TEST_APP_ROLE])?;
    Ok(Json(Local::now().naive_local()))
}

/// Booking looked up with the shared system token, `null` when prison-api does not know the prisoner
#[utoipa::path(
    get,
    path = "/prisoner/{prison_number}/booking",
    tag = TEST_APP_TAG,
    params(("prison_number" = String, Path, description = "Prison number, e.g. A1234BC")),
    responses(
        (status = 200, description = "Latest booking", body = OffenderBooking),
        (status = 401, description = "No valid bearer token", body = ErrorResponse),
        (status = 403, description = "Requires ROLE_TEST_APP", body = ErrorResponse),
        (status = 500, description = "prison-api call failed", body = ErrorResponse)
    )
)]
pub(crate) async fn get_offender_booking(
    State(state): State<AppState>,
    holder: AuthenticationHolder,
    Path(prison_number): Path<String>,
) -> Result<Json<Option<OffenderBooking>>, ApiError> {
    require_any_role(&holder, &[TEST_APP_ROLE])?;
    let booking = state
        .prison_api
        .get_offender_booking(&prison_number, &holder)
        .await
        .map_err(prison_api_error)?;
    Ok(Json(booking))
}

/// Booking looked up with a token issued for the caller's username
#[utoipa::path(
    get,
    path = "/prisoner/{prison_number}/booking/user",
    tag = TEST_APP_TAG,
    params(("prison_number" = String, Path, description = "Prison number, e.g. A1234BC")),
    responses(
        (status = 200, description = "Latest booking", body = OffenderBooking),
        (status = 401, description = "No valid bearer token", body = ErrorResponse),
        (status = 403, description = "Requires ROLE_TEST_APP", body = ErrorResponse),
        (status = 500, description = "prison-api call failed", body = ErrorResponse)
    )
)]
pub(crate) async fn get_offender_booking_with_user(
    State(state): State<AppState>,
    holder: AuthenticationHolder,
    Path(prison_number): Path<String>,
) -> Result<Json<Option<OffenderBooking>>, ApiError> {
    require_any_role(&holder, &[TEST_APP_ROLE])?;
    let booking = state
        .prison_api
        .get_offender_booking_with_user_in_context(&prison_number, &holder)
        .await
        .map_err(prison_api_error)?;
    Ok(Json(booking))
}

#[utoipa::path(
    get,
    path = "/auth/token",
    tag = TEST_APP_TAG,
    responses(
        (status = 200, description = "Greeting for the authenticated principal", body = AuthResponse),
        (status = 401, description = "No valid bearer token", body = ErrorResponse),
        (status = 403, description = "Requires ROLE_TEST_APP", body = ErrorResponse)
    )
)]
pub(crate) async fn get_auth_token(
    State(state): State<AppState>,
    holder: AuthenticationHolder,
) -> Result<Json<AuthResponse>, ApiError> {
    require_any_role(&holder, &[TEST_APP_ROLE])?;
    Ok(Json(state.prison_api.get_auth_token(&holder)?))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::TestApp;
    use hmpps_kit::test_support::TokenOptions;
    use http::StatusCode;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn test_app_token(username: Option<&str>) -> TokenOptions {
        TokenOptions {
            username: username.map(str::to_string),
            roles: vec!["TEST_APP".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_time_requires_token() {
        let app = TestApp::new().await;
        let response = app.fixture.get("/time").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.header("www-authenticate"), Some("Bearer"));
    }

    #[tokio::test]
    async fn test_time_requires_role() {
        let app = TestApp::new().await;
        let token = app.jwt.authorisation_header(TokenOptions::default());
        let response = app.fixture.get_with_token("/time", &token).await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json()["userMessage"], "Access Denied");
    }

    #[tokio::test]
    async fn test_time_with_role() {
        let app = TestApp::new().await;
        let token = app.jwt.authorisation_header(test_app_token(None));
        let response = app.fixture.get_with_token("/time", &token).await;
        response.assert_ok();
        assert!(response.json().is_string());
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let app = TestApp::new().await;
        let token = app.jwt.authorisation_header(TokenOptions {
            expiry: chrono::Duration::hours(-2),
            ..test_app_token(None)
        });
        let response = app.fixture.get_with_token("/time", &token).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.header("www-authenticate"),
            Some("Bearer error=\"invalid_token\"")
        );
    }

    #[tokio::test]
    async fn test_auth_token_greets_principal() {
        let app = TestApp::new().await;
        let token = app.jwt.authorisation_header(test_app_token(Some("AUTH_ADM")));
        let response = app.fixture.get_with_token("/auth/token", &token).await;
        response.assert_ok();
        assert_eq!(response.json(), json!({"greeting": "Hello there AUTH_ADM"}));

        let token = app.jwt.authorisation_header(test_app_token(None));
        let response = app.fixture.get_with_token("/auth/token", &token).await;
        assert_eq!(
            response.json(),
            json!({"greeting": "Hello there test-client-id"})
        );
    }

    #[tokio::test]
    async fn test_booking_uses_shared_token() {
        let app = TestApp::new().await;
        app.mount_token_endpoint().await;
        Mock::given(method("GET"))
            .and(path("/api/offender/A1234BC"))
            .and(header("Authorization", "Bearer prison-api-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bookingId": 1234})))
            .expect(2)
            .mount(&app.prison_api)
            .await;

        for username in ["AUTH_ADM", "ITAG_USER"] {
            let token = app.jwt.authorisation_header(test_app_token(Some(username)));
            let response = app
                .fixture
                .get_with_token("/prisoner/A1234BC/booking", &token)
                .await;
            response.assert_ok();
            assert_eq!(response.json(), json!({"bookingId": 1234}));
        }

        let token_requests = app
            .hmpps_auth
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|request| request.url.path() == "/oauth/token")
            .count();
        assert_eq!(token_requests, 1);
    }

    #[tokio::test]
    async fn test_booking_not_found_is_null() {
        let app = TestApp::new().await;
        app.mount_token_endpoint().await;
        Mock::given(method("GET"))
            .and(path("/api/offender/Z9999ZZ"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&app.prison_api)
            .await;

        let token = app.jwt.authorisation_header(test_app_token(Some("AUTH_ADM")));
        let response = app
            .fixture
            .get_with_token("/prisoner/Z9999ZZ/booking", &token)
            .await;
        response.assert_ok();
        assert_eq!(response.body, "null");
    }

    #[tokio::test]
    async fn test_booking_prison_api_failure() {
        let app = TestApp::new().await;
        app.mount_token_endpoint().await;
        Mock::given(method("GET"))
            .and(path("/api/offender/A1234BC"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&app.prison_api)
            .await;

        let token = app.jwt.authorisation_header(test_app_token(Some("AUTH_ADM")));
        let response = app
            .fixture
            .get_with_token("/prisoner/A1234BC/booking", &token)
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.json();
        assert_eq!(body["status"], json!(500));
        assert_eq!(body["userMessage"], "Unexpected error calling prison-api");
        assert!(body["developerMessage"]
            .as_str()
            .is_some_and(|message| message.contains("500")));
    }

    #[tokio::test]
    async fn test_user_booking_sends_username() {
        let app = TestApp::new().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("username=AUTH_ADM"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "user-token",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&app.hmpps_auth)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/offender/A1234BC"))
            .and(header("Authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bookingId": 99})))
            .mount(&app.prison_api)
            .await;

        let token = app.jwt.authorisation_header(test_app_token(Some("AUTH_ADM")));
        let response = app
            .fixture
            .get_with_token("/prisoner/A1234BC/booking/user", &token)
            .await;
        response.assert_ok();
        let body: Value = response.json();
        assert_eq!(body["bookingId"], 99);
    }
}
