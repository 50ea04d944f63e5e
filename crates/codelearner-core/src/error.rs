use thiserror::Error;

/// Failures talking to the learning backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(
        "word search size {0} is outside {min}..={max}",
        min = crate::word_search::MIN_SIZE,
        max = crate::word_search::MAX_SIZE
    )]
    InvalidSize(u8),
}

impl ApiError {
    pub fn is_status(&self) -> bool {
        matches!(self, ApiError::Status { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ApiError::Decode { .. })
    }
}
