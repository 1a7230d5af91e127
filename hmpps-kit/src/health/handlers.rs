use super::checkers::run_health_check;
use super::models::{Health, HealthResponse, InfoResponse};
use super::HealthState;
use crate::openapi::HEALTH_TAG;
use axum::{extract::State, response::IntoResponse, Json};
use log::{debug, error, info};
use std::collections::BTreeMap;

/// Runs every indicator concurrently and aggregates the results
pub(super) async fn check_all_health(state: &HealthState) -> HealthResponse {
    let handles: Vec<_> = state
        .indicators
        .iter()
        .map(|indicator| {
            let name = indicator.name().to_string();
            let handle = tokio::spawn(run_health_check(indicator.clone(), state.timeout));
            (name, handle)
        })
        .collect();

    let mut components = BTreeMap::new();
    for (name, handle) in handles {
        let health = handle.await.unwrap_or_else(|e| {
            error!("{name} check task panicked: {e:?}");
            Health::down().with_detail("error", format!("{name} check task failed"))
        });
        components.insert(name, health);
    }

    let response = HealthResponse::from_components(components);
    if response.status_code.is_success() {
        debug!("Health check passed for all components");
    } else {
        let issues: Vec<&str> = response
            .components
            .iter()
            .filter(|(_, health)| !health.is_up())
            .map(|(name, _)| name.as_str())
            .collect();
        info!("Health check failed: {}", issues.join(", "));
    }
    response
}

#[utoipa::path(
    get,
    path = "/health",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "All components are up", body = HealthResponse),
        (status = 503, description = "At least one component is down", body = HealthResponse)
    )
)]
pub(crate) async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    check_all_health(&state).await
}

#[utoipa::path(
    get,
    path = "/health/readiness",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Service is not ready", body = HealthResponse)
    )
)]
pub(crate) async fn readiness(State(state): State<HealthState>) -> impl IntoResponse {
    check_all_health(&state).await
}

#[utoipa::path(
    get,
    path = "/health/ping",
    tag = HEALTH_TAG,
    responses((status = 200, description = "Service is running", body = Health))
)]
pub(crate) async fn ping() -> Json<Health> {
    Json(Health::up())
}

#[utoipa::path(
    get,
    path = "/health/liveness",
    tag = HEALTH_TAG,
    responses((status = 200, description = "Service is alive", body = Health))
)]
pub(crate) async fn liveness() -> Json<Health> {
    Json(Health::up())
}

#[utoipa::path(
    get,
    path = "/info",
    tag = HEALTH_TAG,
    responses((status = 200, description = "Build information", body = InfoResponse))
)]
pub(crate) async fn info(State(state): State<HealthState>) -> Json<InfoResponse> {
    Json(state.info.as_ref().clone())
}
