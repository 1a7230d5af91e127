mod prison_api;
mod subject_access_request;

pub(crate) use prison_api::{AuthResponse, OffenderBooking, PrisonApiService};
pub(crate) use subject_access_request::TestAppSarService;
