use async_trait::async_trait;
use chrono::NaiveDate;
use hmpps_kit::sar::{PrisonSubjectAccessRequestService, SarError, SubjectAccessRequestContent};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TestContent<'a> {
    prisoner_number: &'a str,
    comment_text: &'a str,
}

/// Only prisoners whose number starts with `A` have content
pub(crate) struct TestAppSarService;

#[async_trait]
impl PrisonSubjectAccessRequestService for TestAppSarService {
    async fn get_prison_content_for(
        &self,
        prn: &str,
        _from_date: Option<NaiveDate>,
        _to_date: Option<NaiveDate>,
    ) -> Result<Option<SubjectAccessRequestContent>, SarError> {
        if !prn.starts_with('A') {
            return Ok(None);
        }
        let content = serde_json::to_value(TestContent {
            prisoner_number: prn,
            comment_text: "some useful comment",
        })
        .map_err(|err| SarError::Lookup(err.to_string()))?;
        Ok(Some(SubjectAccessRequestContent::new(content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_content_for_matching_prisoner() {
        let content = TestAppSarService
            .get_prison_content_for("A1234BC", None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            content.content,
            json!({"prisonerNumber": "A1234BC", "commentText": "some useful comment"})
        );
        assert!(content.attachments.is_none());
    }

    #[tokio::test]
    async fn test_no_content_for_other_prisoners() {
        let content = TestAppSarService
            .get_prison_content_for("B1234BC", None, None)
            .await
            .unwrap();
        assert!(content.is_none());
    }
}
