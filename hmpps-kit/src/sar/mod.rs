//! Subject access request (SAR) endpoint.
//!
//! A service plugs in its lookup as a [`SubjectAccessRequestService`]; the
//! endpoint handles access control, identifier validation and the status
//! codes expected by the central SAR service.

pub(crate) mod handlers;
mod models;
mod service;
mod template;

pub use models::{Attachment, SarQuery, SubjectAccessRequestContent};
pub use service::{
    PrisonProbationSubjectAccessRequestService, PrisonSubjectAccessRequestService,
    ProbationSubjectAccessRequestService, SarError, SubjectAccessRequestService,
};
pub use template::{SarConfigError, SarTemplate};

use crate::config::SarConfig;
use axum::{routing::get, Router};
use std::sync::Arc;

pub const SAR_DATA_ACCESS_ROLE: &str = "SAR_DATA_ACCESS";

#[derive(Clone)]
pub struct SarState {
    service: SubjectAccessRequestService,
    roles: Arc<[String]>,
    template: Option<SarTemplate>,
}

impl SarState {
    /// Fails when the template endpoint is enabled but misconfigured
    pub fn new(
        service: SubjectAccessRequestService,
        config: &SarConfig,
    ) -> Result<Self, SarConfigError> {
        Ok(Self {
            service,
            roles: config.access_roles().into(),
            template: SarTemplate::load(&config.template)?,
        })
    }
}

pub fn router<S>(state: SarState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let mut router = Router::new().route(
        "/subject-access-request",
        get(handlers::subject_access_request),
    );
    if state.template.is_some() {
        router = router.route("/subject-access-request/template", get(handlers::template));
    }
    router.with_state(state)
}
