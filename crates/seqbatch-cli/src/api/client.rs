//! HTTP API client for the submission portal
//!
//! Transport failures are mapped to [`ApiError::Transport`]; status codes and
//! bodies are handed back untouched for the submission and status phases to
//! classify.

use crate::api::endpoints;
use crate::batch::BatchPair;
use crate::error::{ApiError, PipelineError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Name of both multipart file parts
pub const FILES_PART: &str = "files";

/// Status code and body text of a response
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// API client holding the bearer credential
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Create a client with an explicit request timeout
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    /// Upload one batch pair: sequence file first, metadata file second
    pub async fn submit_batch(&self, pair: &BatchPair) -> Result<RawResponse> {
        let url = endpoints::submissions_url(&self.base_url);

        let form = Form::new()
            .part(FILES_PART, file_part(&pair.fasta)?)
            .part(FILES_PART, file_part(&pair.table)?);

        debug!(url = %url, batch = pair.key.index, "POST submission");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(&url, e))?;

        read_response(&url, response).await
    }

    /// Fetch processing status of every record in a submission
    pub async fn upload_status(&self, submission_id: &str, page_size: usize) -> Result<RawResponse> {
        let url = endpoints::uploads_url(&self.base_url, submission_id, page_size);

        debug!(url = %url, "GET upload status");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| transport(&url, e))?;

        read_response(&url, response).await
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn file_part(path: &Path) -> Result<Part> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Part::bytes(bytes).file_name(name))
}

async fn read_response(url: &str, response: reqwest::Response) -> Result<RawResponse> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| transport(url, e))?;
    Ok(RawResponse { status, body })
}

fn transport(url: &str, err: reqwest::Error) -> PipelineError {
    ApiError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
    .into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::batch::{BatchKey, BatchNamespace};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_pair(dir: &Path) -> BatchPair {
        let namespace = BatchNamespace::new(dir, "output");
        let pair = namespace.pair(&BatchKey::queued(0));
        std::fs::write(&pair.fasta, ">S1\nACGT\n").unwrap();
        std::fs::write(&pair.table, "sample_id\nS1\n").unwrap();
        pair
    }

    #[test]
    fn test_api_client_creation() {
        let client = ApiClient::new("http://localhost:8000", "t", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_submit_sends_bearer_and_both_files() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"submissionId":"abc"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pair = write_pair(dir.path());
        let client = ApiClient::new(server.uri(), "secret", Duration::from_secs(5)).unwrap();

        let response = client.submit_batch(&pair).await.unwrap();
        assert_eq!(response.status, 200);

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body).into_owned();
        let fasta_at = body.find("filename=\"output.0.queued.fasta\"").unwrap();
        let table_at = body.find("filename=\"output.0.queued.tsv\"").unwrap();
        assert!(fasta_at < table_at);
        assert_eq!(body.matches("name=\"files\"").count(), 2);
    }

    #[tokio::test]
    async fn test_upload_status_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uploads"))
            .and(query_param("size", "11"))
            .and(query_param("submissionId", "abc"))
            .and(query_param("sortField", "submitterSampleId"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), "secret", Duration::from_secs(5)).unwrap();
        let response = client.upload_status("abc", 11).await.unwrap();
        assert_eq!(response.body, r#"{"data":[]}"#);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let client = ApiClient::new("http://127.0.0.1:9", "t", Duration::from_secs(2)).unwrap();
        let err = client.upload_status("abc", 2).await.unwrap_err();
        assert!(matches!(err, PipelineError::Api(ApiError::Transport { .. })));
    }
}
