use crate::openapi::TEST_APP_TAG;
use crate::state::AppState;
use axum::{routing::get, Router};

pub(super) fn router() -> Router<AppState> {
    Router::new().route(
        "/protected-by-custom-security-matcher",
        get(get_security_matcher_endpoint),
    )
}

/// Only secured when the resource server is limited to this path
#[utoipa::path(
    get,
    path = "/protected-by-custom-security-matcher",
    tag = TEST_APP_TAG,
    responses((status = 200, description = "OK", body = String))
)]
pub(crate) async fn get_security_matcher_endpoint() -> &'static str {
    "OK"
}
