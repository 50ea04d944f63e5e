use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::exercise::{CodeArtifact, Language};
use crate::word_search::{self, Answer, WordSearchPuzzle};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct WordSearchEnvelope {
    word_search: WordSearchPayload,
}

#[derive(Debug, Deserialize)]
struct WordSearchPayload {
    word_search: String,
    answers: Vec<Answer>,
}

/// Client for the three GET endpoints of the learning backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let client = match Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(
                    error = %e,
                    ?timeout,
                    "failed to build HTTP client, requests will not time out"
                );
                Client::new()
            }
        };

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask a free-form question; the reply body is plain text.
    pub async fn ask(&self, question: &str) -> Result<String, ApiError> {
        let url = format!("{}/api/ask", self.base_url);
        self.get_text(&url, &[("question", question)]).await
    }

    pub async fn generate_code(
        &self,
        prompt: &str,
        language: Language,
        explanation: bool,
    ) -> Result<CodeArtifact, ApiError> {
        let url = format!("{}/api/generate-code", self.base_url);
        let explanation = if explanation { "true" } else { "false" };

        let body = self
            .get_text(
                &url,
                &[
                    ("prompt", prompt),
                    ("language", language.as_str()),
                    ("explanation", explanation),
                ],
            )
            .await?;

        decode(&url, &body)
    }

    pub async fn word_search(&self, topic: &str, size: u8) -> Result<WordSearchPuzzle, ApiError> {
        if !(word_search::MIN_SIZE..=word_search::MAX_SIZE).contains(&size) {
            return Err(ApiError::InvalidSize(size));
        }

        let url = format!("{}/api/word-search", self.base_url);
        let size = size.to_string();
        let body = self
            .get_text(&url, &[("topic", topic), ("size", size.as_str())])
            .await?;

        let envelope: WordSearchEnvelope = decode(&url, &body)?;
        let puzzle = WordSearchPuzzle::from_parts(
            &envelope.word_search.word_search,
            envelope.word_search.answers,
        );

        if !puzzle.answers_in_bounds() {
            warn!(topic, "word search answers fall outside the grid");
        }

        Ok(puzzle)
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ApiError> {
        debug!(url, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}
