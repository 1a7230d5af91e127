use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Health of a single component, with free-form details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Health {
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    #[schema(value_type = Object)]
    pub details: Map<String, Value>,
}

impl Health {
    pub fn up() -> Self {
        Self {
            status: HealthStatus::Up,
            details: Map::new(),
        }
    }

    pub fn down() -> Self {
        Self {
            status: HealthStatus::Down,
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

/// Aggregate health: `UP` only when every component is up
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, Health>,
    #[serde(skip)]
    pub status_code: StatusCode,
}

impl HealthResponse {
    pub fn from_components(components: BTreeMap<String, Health>) -> Self {
        let all_up = components.values().all(Health::is_up);
        let (status, status_code) = if all_up {
            (HealthStatus::Up, StatusCode::OK)
        } else {
            (HealthStatus::Down, StatusCode::SERVICE_UNAVAILABLE)
        };
        Self {
            status,
            components,
            status_code,
        }
    }
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BuildInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub build: BuildInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_health_serialization() {
        let health = Health::up().with_detail("HttpStatus", "200 OK");
        assert_eq!(
            serde_json::to_value(&health).unwrap(),
            json!({ "status": "UP", "details": { "HttpStatus": "200 OK" } })
        );
        assert_eq!(
            serde_json::to_value(Health::down()).unwrap(),
            json!({ "status": "DOWN" })
        );
    }

    #[test]
    fn test_aggregate_status() {
        let mut components = BTreeMap::new();
        components.insert("a".to_string(), Health::up());
        let response = HealthResponse::from_components(components.clone());
        assert_eq!(response.status, HealthStatus::Up);
        assert_eq!(response.status_code, StatusCode::OK);

        components.insert("b".to_string(), Health::down());
        let response = HealthResponse::from_components(components);
        assert_eq!(response.status, HealthStatus::Down);
        assert_eq!(response.status_code, StatusCode::SERVICE_UNAVAILABLE);
    }
}
