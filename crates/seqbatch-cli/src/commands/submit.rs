//! Submission driver
//!
//! Uploads every queued pair in index order. An accepted pair is renamed to
//! the returned submission id; a rejected pair stays queued. Fatal responses
//! stop the loop because every later batch would fail the same way.

use crate::api::{ApiClient, ErrorResponse, SubmissionResponse};
use crate::batch::{BatchNamespace, BatchState};
use crate::batch::namespace::QUEUED;
use crate::error::{ApiError, PipelineError, Result, MSG_HEADERS_INCORRECT, MSG_INVALID_FIELDS};
use tracing::{info, warn};

/// Driver options
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Only submit this batch index
    pub batch_number: Option<usize>,

    /// Cap on reported invalid-field lines per batch
    pub short: Option<usize>,
}

/// Outcome of one submission pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitSummary {
    /// (batch index, submission id)
    pub submitted: Vec<(usize, String)>,

    /// Batches left queued after a recoverable error
    pub rejected: Vec<usize>,
}

/// Classify a `POST /submissions` response
pub fn classify_submission(status: u16, body: &str) -> std::result::Result<String, ApiError> {
    match status {
        200 => {
            let id = serde_json::from_str::<SubmissionResponse>(body)
                .ok()
                .and_then(|r| r.submission_id)
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ApiError::MissingSubmissionId {
                    body: body.to_string(),
                })?;
            check_submission_id(id)
        },
        401 => Err(ApiError::Unauthorized),
        403 => Err(ApiError::Forbidden {
            message: serde_json::from_str::<ErrorResponse>(body)
                .map(|e| e.message)
                .unwrap_or_else(|_| body.to_string()),
        }),
        404 => Err(ApiError::EndpointNotFound),
        400 => {
            let Ok(error) = serde_json::from_str::<ErrorResponse>(body) else {
                return Err(unexpected(status, body));
            };
            if error.status == "FORBIDDEN" {
                Err(ApiError::Forbidden {
                    message: error.message,
                })
            } else if error.message == MSG_HEADERS_INCORRECT {
                Err(ApiError::Schema {
                    unknown: error.error_info.unknown_headers,
                    missing: error.error_info.missing_headers,
                })
            } else if error.message == MSG_INVALID_FIELDS {
                Err(ApiError::Validation {
                    fields: error.error_info.invalid_fields,
                })
            } else {
                Err(unexpected(status, body))
            }
        },
        500 => Err(match serde_json::from_str::<ErrorResponse>(body) {
            Ok(error) => ApiError::Server {
                status: error.status,
                message: error.message,
            },
            Err(_) => ApiError::Server {
                status: status.to_string(),
                message: body.to_string(),
            },
        }),
        _ => Err(unexpected(status, body)),
    }
}

/// Submission ids become file name tokens
fn check_submission_id(id: String) -> std::result::Result<String, ApiError> {
    let unusable = id == QUEUED
        || id
            .chars()
            .any(|c| c == '.' || c == '/' || c == '\\' || c.is_whitespace());
    if unusable {
        Err(ApiError::InvalidSubmissionId { id })
    } else {
        Ok(id)
    }
}

fn unexpected(status: u16, body: &str) -> ApiError {
    ApiError::UnexpectedResponse {
        status,
        body: body.to_string(),
    }
}

/// Upload every queued pair, or only `options.batch_number`
pub async fn submit_queued(
    client: &ApiClient,
    namespace: &BatchNamespace,
    options: &SubmitOptions,
) -> Result<SubmitSummary> {
    let scan = namespace.consistent_scan()?;
    let queued: Vec<_> = scan
        .queued()
        .filter(|p| options.batch_number.is_none_or(|n| p.key.index == n))
        .collect();

    if let Some(n) = options.batch_number {
        if queued.is_empty() {
            warn!(batch = n, "No queued batch with this number");
        }
    }

    let mut summary = SubmitSummary::default();
    for pair in queued {
        info!(batch = pair.key.index, "Submitting batch");
        let response = client.submit_batch(pair).await?;

        match classify_submission(response.status, &response.body) {
            Ok(id) => {
                info!(batch = pair.key.index, submission_id = %id, "Batch accepted");
                namespace
                    .rename_pair(pair, BatchState::Submitted(id.clone()))
                    .map_err(|e| PipelineError::UnrecordedSubmission {
                        batch: pair.key.index,
                        submission_id: id.clone(),
                        source: Box::new(e),
                    })?;
                summary.submitted.push((pair.key.index, id));
            },
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                report_rejection(pair.key.index, &err, options.short);
                summary.rejected.push(pair.key.index);
            },
        }
    }

    Ok(summary)
}

fn report_rejection(batch: usize, err: &ApiError, short: Option<usize>) {
    warn!(batch, "Batch rejected: {}", err);

    if let ApiError::Validation { fields } = err {
        let shown = short.unwrap_or(fields.len()).min(fields.len());
        for field in &fields[..shown] {
            warn!(batch, "{}", field.report_line());
        }
        if shown < fields.len() {
            warn!(batch, "{} more not shown", fields.len() - shown);
        }
    }

    if let Some(hint) = err.hint() {
        warn!(batch, "{}", hint);
    }
}
