//! API endpoint URL builders

/// Column the upload listing is sorted by
pub const SORT_FIELD: &str = "submitterSampleId";

fn trim_base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// Build batch submission URL
pub fn submissions_url(base_url: &str) -> String {
    format!("{}/submissions", trim_base(base_url))
}

/// Build upload status URL for one submission
pub fn uploads_url(base_url: &str, submission_id: &str, page_size: usize) -> String {
    format!(
        "{}/uploads?page=0&size={}&sortDirection=ASC&sortField={}&submissionId={}",
        trim_base(base_url),
        page_size,
        SORT_FIELD,
        urlencoding::encode(submission_id)
    )
}
