use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every HMPPS API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more_info: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status_code: StatusCode,
    pub user_message: String,
    pub developer_message: String,
}

impl ApiError {
    /// Same text for the user and developer message
    pub fn new<S: ToString>(message: S, status_code: StatusCode) -> Self {
        let message = message.to_string();
        Self {
            status_code,
            user_message: message.clone(),
            developer_message: message,
        }
    }

    pub fn with_developer_message<S: ToString>(mut self, developer_message: S) -> Self {
        self.developer_message = developer_message.to_string();
        self
    }

    pub fn internal<S: ToString>(message: S) -> Self {
        Self::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request<S: ToString>(message: S) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn unauthorized<S: ToString>(message: S) -> Self {
        Self::new(message, StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden<S: ToString>(message: S) -> Self {
        Self::new(message, StatusCode::FORBIDDEN)
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            status: self.status_code.as_u16(),
            error_code: None,
            user_message: Some(self.user_message.clone()),
            developer_message: Some(self.developer_message.clone()),
            more_info: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self.to_error_response())).into_response()
    }
}
