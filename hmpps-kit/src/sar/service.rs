use super::models::SubjectAccessRequestContent;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SarError {
    #[error("{0}")]
    Lookup(String),
}

/// For services that only hold data by prison number
#[async_trait]
pub trait PrisonSubjectAccessRequestService: Send + Sync {
    async fn get_prison_content_for(
        &self,
        prn: &str,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
    ) -> Result<Option<SubjectAccessRequestContent>, SarError>;
}

/// For services that only hold data by probation case reference
#[async_trait]
pub trait ProbationSubjectAccessRequestService: Send + Sync {
    async fn get_probation_content_for(
        &self,
        crn: &str,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
    ) -> Result<Option<SubjectAccessRequestContent>, SarError>;
}

/// For services holding data by either identifier
#[async_trait]
pub trait PrisonProbationSubjectAccessRequestService: Send + Sync {
    async fn get_content_for(
        &self,
        prn: Option<&str>,
        crn: Option<&str>,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
    ) -> Result<Option<SubjectAccessRequestContent>, SarError>;
}

/// The lookup a service supplies, tagged by which identifiers it understands
#[derive(Clone)]
pub enum SubjectAccessRequestService {
    Prison(Arc<dyn PrisonSubjectAccessRequestService>),
    Probation(Arc<dyn ProbationSubjectAccessRequestService>),
    PrisonProbation(Arc<dyn PrisonProbationSubjectAccessRequestService>),
}

impl SubjectAccessRequestService {
    pub fn prison(service: impl PrisonSubjectAccessRequestService + 'static) -> Self {
        Self::Prison(Arc::new(service))
    }

    pub fn probation(service: impl ProbationSubjectAccessRequestService + 'static) -> Self {
        Self::Probation(Arc::new(service))
    }

    pub fn prison_probation(
        service: impl PrisonProbationSubjectAccessRequestService + 'static,
    ) -> Self {
        Self::PrisonProbation(Arc::new(service))
    }
}
