use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

/// Response envelope of `GET /subject-access-request`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubjectAccessRequestContent {
    /// The content of the subject access request response
    #[schema(value_type = Object)]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

impl SubjectAccessRequestContent {
    pub fn new(content: Value) -> Self {
        Self {
            content,
            attachments: None,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = Some(attachments);
        self
    }
}

/// A file held about the subject, fetched separately by the SAR service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub attachment_number: u32,
    pub name: String,
    pub content_type: String,
    pub url: String,
    pub filesize: u64,
    pub filename: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct SarQuery {
    /// NOMIS Prison Reference Number
    pub prn: Option<String>,
    /// nDelius Case Reference Number
    pub crn: Option<String>,
    /// Minimum date of event occurrence which should be returned in the response
    pub from_date: Option<NaiveDate>,
    /// Maximum date of event occurrence which should be returned in the response
    pub to_date: Option<NaiveDate>,
}
