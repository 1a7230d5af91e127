use super::models::{SarQuery, SubjectAccessRequestContent};
use super::service::SubjectAccessRequestService;
use super::SarState;
use crate::auth::{require_any_role, AuthenticationHolder};
use crate::errors::{ApiError, ErrorResponse};
use crate::openapi::SAR_TAG;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use log::{debug, error};

const SUBJECT_NOT_RECOGNISED: u16 = 209;
const MISSING_IDENTIFIER: &str = "One of prn or crn must be supplied.";
const TEMPLATE_ERROR: &str = "Unexpected error getting subject access request template";

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

fn subject_not_recognised() -> Response {
    StatusCode::from_u16(SUBJECT_NOT_RECOGNISED)
        .unwrap_or(StatusCode::NO_CONTENT)
        .into_response()
}

/// Provides content for a prisoner to satisfy the needs of a subject access request on their behalf
#[utoipa::path(
    get,
    path = "/subject-access-request",
    tag = SAR_TAG,
    params(SarQuery),
    responses(
        (status = 200, description = "Request successfully processed - content found", body = SubjectAccessRequestContent),
        (status = 204, description = "Request successfully processed - no content found"),
        (status = 209, description = "Subject Identifier is not recognised by this service"),
        (status = 400, description = "Neither prn nor crn supplied, or an invalid date", body = ErrorResponse),
        (status = 401, description = "The client does not have authorisation to make this request", body = ErrorResponse),
        (status = 403, description = "Forbidden, requires an appropriate role", body = ErrorResponse),
        (status = 500, description = "Unexpected error occurred", body = ErrorResponse)
    )
)]
pub(crate) async fn subject_access_request(
    State(state): State<SarState>,
    holder: AuthenticationHolder,
    query: Result<Query<SarQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    require_any_role(&holder, &state.roles[..])?;
    let Query(query) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let prn = present(&query.prn);
    let crn = present(&query.crn);
    if prn.is_none() && crn.is_none() {
        return Err(ApiError::bad_request(MISSING_IDENTIFIER));
    }

    let (from_date, to_date) = (query.from_date, query.to_date);
    let content = match (&state.service, prn, crn) {
        (SubjectAccessRequestService::Prison(service), Some(prn), _) => {
            service.get_prison_content_for(prn, from_date, to_date).await
        }
        (SubjectAccessRequestService::Probation(service), _, Some(crn)) => {
            service
                .get_probation_content_for(crn, from_date, to_date)
                .await
        }
        (SubjectAccessRequestService::PrisonProbation(service), _, _) => {
            service
                .get_content_for(query.prn.as_deref(), query.crn.as_deref(), from_date, to_date)
                .await
        }
        _ => {
            debug!("Subject access request identifier not recognised by this service");
            return Ok(subject_not_recognised());
        }
    };

    match content {
        Ok(Some(content)) => Ok(Json(content).into_response()),
        Ok(None) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(err) => {
            error!("Subject access request lookup failed: {}", err);
            Err(ApiError::internal(err))
        }
    }
}

/// Returns the template the SAR service uses to render this service's content
#[utoipa::path(
    get,
    path = "/subject-access-request/template",
    tag = SAR_TAG,
    responses(
        (status = 200, description = "Request successfully processed - return template file content", body = String, content_type = "text/plain"),
        (status = 401, description = "The client does not have authorisation to make this request", body = ErrorResponse),
        (status = 403, description = "Forbidden, requires an appropriate role", body = ErrorResponse),
        (status = 500, description = "Unexpected error occurred", body = ErrorResponse)
    )
)]
pub(crate) async fn template(
    State(state): State<SarState>,
    holder: AuthenticationHolder,
) -> Result<Response, ApiError> {
    require_any_role(&holder, &state.roles[..])?;
    let Some(template) = &state.template else {
        return Err(ApiError::new("Not Found", StatusCode::NOT_FOUND));
    };
    let text = template
        .read()
        .await
        .map_err(|_| ApiError::internal(TEMPLATE_ERROR))?;
    Ok(([(header::CONTENT_TYPE, "text/plain")], text).into_response())
}
