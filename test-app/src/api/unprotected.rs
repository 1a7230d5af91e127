use crate::openapi::TEST_APP_TAG;
use crate::services::AuthResponse;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use hmpps_kit::auth::AuthenticationHolder;

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/unprotected/auth/token", get(get_auth_token))
}

/// Greets the caller when a token was sent, without requiring one
#[utoipa::path(
    get,
    path = "/unprotected/auth/token",
    tag = TEST_APP_TAG,
    responses(
        (status = 200, description = "Greeting, or a note that no token was sent", body = AuthResponse)
    )
)]
pub(crate) async fn get_auth_token(
    State(state): State<AppState>,
    holder: AuthenticationHolder,
) -> Json<AuthResponse> {
    Json(state.prison_api.get_auth_token_or_none(&holder))
}
