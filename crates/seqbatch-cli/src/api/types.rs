//! API request and response types
//!
//! Matches the VirusSeq portal submission and upload-status payloads.

use serde::{Deserialize, Serialize};

/// Body of a successful `POST /submissions`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    #[serde(default)]
    pub submission_id: Option<String>,
}

/// Error body shared by the portal endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub error_info: ErrorInfo,
}

/// Structured error detail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    #[serde(default)]
    pub invalid_fields: Vec<InvalidField>,

    #[serde(default)]
    pub unknown_headers: Vec<String>,

    #[serde(default)]
    pub missing_headers: Vec<String>,
}

/// One rejected metadata field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvalidField {
    pub field_name: String,

    #[serde(default)]
    pub value: Option<String>,

    pub reason: String,

    /// Row number within the uploaded metadata file
    #[serde(default)]
    pub index: u64,
}

impl InvalidField {
    /// One-line report: `row <index> "<field>" <reason> value: <value>`
    pub fn report_line(&self) -> String {
        format!(
            "row {} \"{}\" {} value: {}",
            self.index,
            self.field_name,
            self.reason,
            self.value.as_deref().unwrap_or("")
        )
    }
}

/// Body of `GET /uploads`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UploadsResponse {
    #[serde(default)]
    pub data: Vec<UploadRecord>,
}

/// Processing status of one uploaded sample
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub submitter_sample_id: String,

    pub status: String,

    /// `#`-delimited `path:message` segments, present for errors
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_with_invalid_fields() {
        let body = r#"{"status":"BAD_REQUEST","message":"Found records with invalid fields","errorInfo":{"invalidFields":[{"fieldName":"specimen collector sample ID","value":"","reason":"NOT_ALLOWED_TO_BE_EMPTY","index":1},{"fieldName":"study_id","value":" 23434","reason":"UNAUTHORIZED_FOR_STUDY_UPLOAD","index":1}]}}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.status, "BAD_REQUEST");
        assert_eq!(parsed.error_info.invalid_fields.len(), 2);
        assert_eq!(
            parsed.error_info.invalid_fields[1].report_line(),
            "row 1 \"study_id\" UNAUTHORIZED_FOR_STUDY_UPLOAD value:  23434"
        );
    }

    #[test]
    fn test_error_response_with_empty_info() {
        let parsed: ErrorResponse =
            serde_json::from_str(r#"{"status":"FORBIDDEN","message":"Denied","errorInfo":{}}"#)
                .unwrap();
        assert_eq!(parsed.status, "FORBIDDEN");
        assert!(parsed.error_info.invalid_fields.is_empty());
    }

    #[test]
    fn test_invalid_field_null_value() {
        let field: InvalidField = serde_json::from_str(
            r#"{"fieldName":"age","value":null,"reason":"NOT_A_NUMBER","index":4}"#,
        )
        .unwrap();
        assert_eq!(field.report_line(), "row 4 \"age\" NOT_A_NUMBER value: ");
    }

    #[test]
    fn test_uploads_response() {
        let body = r##"{"data":[{"submitterSampleId":"S1","status":"QUEUED"},{"submitterSampleId":"S3","status":"ERROR","error":"#sample/host_age:must be a number"}]}"##;
        let parsed: UploadsResponse = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].error, None);
        assert_eq!(parsed.data[1].submitter_sample_id, "S3");
    }
}
