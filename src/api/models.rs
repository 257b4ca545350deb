//! Typed records for the test-management API.
//!
//! Wire records mirror the JSON the service returns; they are validated once
//! into [`TestRun`] and [`Attachment`] so the rest of the crate never sees a
//! missing or empty field.

use serde::Deserialize;
use url::Url;

use super::ApiError;

/// Attachment type the service assigns to test-run summary files.
pub const SUMMARY_ATTACHMENT_TYPE: &str = "tmiTestRunSummary";

/// Standard `{ "count": n, "value": [...] }` list envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub(crate) value: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestRunRecord {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttachmentRecord {
    file_name: String,
    url: String,
    #[serde(default)]
    attachment_type: Option<String>,
}

/// One execution unit of a test suite within a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRun {
    /// Service-assigned run id, when reported.
    pub id: Option<i64>,
    /// Display name, when reported.
    pub name: Option<String>,
    /// API URL of the run; attachment listing hangs off it.
    pub url: Url,
}

impl TestRun {
    /// Label used in log lines.
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.id, &self.name) {
            (Some(id), Some(name)) => format!("{id} ({name})"),
            (Some(id), None) => id.to_string(),
            (None, Some(name)) => name.clone(),
            (None, None) => self.url.to_string(),
        }
    }
}

/// A file associated with a test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name as declared by the service. Not unique within a run.
    pub name: String,
    /// Where the content can be fetched.
    pub remote_location: Url,
    /// Service-declared attachment type, if any.
    pub declared_type: Option<String>,
}

impl Attachment {
    /// Builds an attachment directly; used by callers that already hold typed values.
    #[must_use]
    pub fn new(name: impl Into<String>, remote_location: Url, declared_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            remote_location,
            declared_type,
        }
    }
}

impl TestRunRecord {
    pub(crate) fn into_test_run(self, source_url: &str) -> Result<TestRun, ApiError> {
        let url = Url::parse(&self.url).map_err(|e| {
            ApiError::invalid_record("test run", source_url, format!("url '{}': {e}", self.url))
        })?;
        Ok(TestRun {
            id: self.id,
            name: self.name,
            url,
        })
    }
}

impl AttachmentRecord {
    pub(crate) fn into_attachment(self, source_url: &str) -> Result<Attachment, ApiError> {
        if self.file_name.trim().is_empty() {
            return Err(ApiError::invalid_record(
                "attachment",
                source_url,
                "empty fileName",
            ));
        }
        let remote_location = Url::parse(&self.url).map_err(|e| {
            ApiError::invalid_record(
                "attachment",
                source_url,
                format!("url '{}' for {}: {e}", self.url, self.file_name),
            )
        })?;
        Ok(Attachment {
            name: self.file_name,
            remote_location,
            declared_type: self.attachment_type.filter(|t| !t.is_empty()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SOURCE: &str = "https://dev.azure.com/org/proj/_apis/test/runs/7/attachments";

    #[test]
    fn test_attachment_record_with_type_decodes() {
        let json = r#"{"count":1,"value":[{"id":3,"fileName":"a.xml","url":"https://x/att/3","attachmentType":"tmiTestRunSummary"}]}"#;
        let envelope: ListEnvelope<AttachmentRecord> = serde_json::from_str(json).unwrap();
        let attachment = envelope
            .value
            .into_iter()
            .next()
            .unwrap()
            .into_attachment(SOURCE)
            .unwrap();
        assert_eq!(attachment.name, "a.xml");
        assert_eq!(attachment.declared_type.as_deref(), Some(SUMMARY_ATTACHMENT_TYPE));
        assert_eq!(attachment.remote_location.as_str(), "https://x/att/3");
    }

    #[test]
    fn test_attachment_record_without_type_is_none() {
        let json = r#"{"fileName":"run1.trx","url":"https://x/att/1"}"#;
        let record: AttachmentRecord = serde_json::from_str(json).unwrap();
        let attachment = record.into_attachment(SOURCE).unwrap();
        assert!(attachment.declared_type.is_none());
    }

    #[test]
    fn test_attachment_record_missing_file_name_fails_decode() {
        let json = r#"{"url":"https://x/att/1"}"#;
        assert!(serde_json::from_str::<AttachmentRecord>(json).is_err());
    }

    #[test]
    fn test_attachment_record_empty_file_name_rejected() {
        let json = r#"{"fileName":"  ","url":"https://x/att/1"}"#;
        let record: AttachmentRecord = serde_json::from_str(json).unwrap();
        let err = record.into_attachment(SOURCE).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRecord { record: "attachment", .. }));
    }

    #[test]
    fn test_attachment_record_bad_url_rejected() {
        let json = r#"{"fileName":"x.coverage","url":"not a url"}"#;
        let record: AttachmentRecord = serde_json::from_str(json).unwrap();
        assert!(record.into_attachment(SOURCE).is_err());
    }

    #[test]
    fn test_test_run_record_decodes_and_labels() {
        let json = r#"{"value":[{"id":42,"name":"VSTest run","url":"https://x/_apis/test/Runs/42"}]}"#;
        let envelope: ListEnvelope<TestRunRecord> = serde_json::from_str(json).unwrap();
        let run = envelope
            .value
            .into_iter()
            .next()
            .unwrap()
            .into_test_run(SOURCE)
            .unwrap();
        assert_eq!(run.id, Some(42));
        assert_eq!(run.label(), "42 (VSTest run)");
    }

    #[test]
    fn test_list_envelope_missing_value_is_empty() {
        let envelope: ListEnvelope<TestRunRecord> =
            serde_json::from_str(r#"{"count":0}"#).unwrap();
        assert!(envelope.value.is_empty());
    }

    #[test]
    fn test_list_envelope_of_attachments_decodes_in_order() {
        let envelope: ListEnvelope<AttachmentRecord> = serde_json::from_str(
            r#"{"count":2,"value":[
                {"fileName":"a.trx","url":"https://x/1"},
                {"fileName":"b.coverage","url":"https://x/2"}
            ]}"#,
        )
        .unwrap();
        let names: Vec<String> = envelope
            .value
            .into_iter()
            .map(|record| record.into_attachment("https://x/list").unwrap().name)
            .collect();
        assert_eq!(names, vec!["a.trx", "b.coverage"]);
    }
}
