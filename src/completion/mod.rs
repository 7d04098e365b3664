//! Client for the hosted generative model that turns prompts into JSON text.
//!
//! The Gemini adapter issues `generateContent` requests directly over HTTP. Each attempt is
//! bounded by a timeout, and transient failures (transport errors, 429, 5xx) are retried a
//! limited number of times before the error is handed back to the caller.

use crate::config::get_config;
use crate::processing::normalize::{FailureKind, error_record, normalize_with_raw};
use crate::processing::ParsedRecord;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Endpoint could not be reached or the request timed out.
    #[error("failed to reach model endpoint: {0}")]
    Unreachable(String),
    /// Endpoint answered with a non-success status.
    #[error("model endpoint returned {status}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Response body did not contain candidate text.
    #[error("model response missing candidate text: {reason}")]
    MalformedEnvelope {
        /// Description of what was missing or undecodable.
        reason: String,
        /// Body payload that failed to decode.
        body: String,
    },
}

impl CompletionError {
    /// Classification used to tag the resulting error record.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Unreachable(_) => FailureKind::UpstreamUnreachable,
            Self::UnexpectedStatus { .. } => FailureKind::UpstreamStatus,
            Self::MalformedEnvelope { .. } => FailureKind::MalformedEnvelope,
        }
    }

    /// Provider body received before the failure, or empty when nothing arrived.
    pub fn raw_output(&self) -> &str {
        match self {
            Self::Unreachable(_) => "",
            Self::UnexpectedStatus { body, .. } | Self::MalformedEnvelope { body, .. } => body,
        }
    }

    fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::UnexpectedStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::MalformedEnvelope { .. } => false,
        }
    }
}

/// Candidate text together with the provider body it was taken from.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Text of the first candidate's first part.
    pub text: String,
    /// Full response body, reported back when the text fails to parse.
    pub raw_body: String,
}

/// Interface implemented by completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` to the model and return its raw reply.
    async fn complete(&self, prompt: &str) -> Result<Completion, CompletionError>;
}

/// Ask the model to fill in a schema and parse its reply. Never fails: errors become an
/// `{error, raw_output}` record.
pub async fn call_model(client: &dyn CompletionClient, prompt: &str) -> ParsedRecord {
    match client.complete(prompt).await {
        Ok(completion) => normalize_with_raw(&completion.text, &completion.raw_body),
        Err(error) => {
            tracing::warn!(kind = %error.kind(), error = %error, "Model call failed");
            error_record(error.kind(), &error.to_string(), error.raw_output())
        }
    }
}

/// Build the Gemini client described by the global configuration.
pub fn get_completion_client() -> Result<Box<dyn CompletionClient>, CompletionError> {
    let config = get_config();
    let client = GeminiClient::new(
        config.gemini_base_url.clone(),
        config.gemini_model.clone(),
        config.gemini_api_key.clone(),
        config.model_timeout,
    )?
    .with_retries(config.model_max_retries, DEFAULT_RETRY_BACKOFF);
    Ok(Box::new(client))
}

/// Gemini `generateContent` adapter.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl GeminiClient {
    /// Create a client with a per-attempt `timeout` and a single retry.
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let http = Client::builder()
            .user_agent("docparse/0.1")
            .timeout(timeout)
            .build()
            .map_err(|error| {
                CompletionError::Unreachable(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self {
            http,
            base_url,
            model,
            api_key,
            max_retries: 1,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        })
    }

    /// Override how many times a transient failure is retried and the pause between attempts.
    pub fn with_retries(mut self, max_retries: u32, retry_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = retry_backoff;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn attempt(&self, prompt: &str) -> Result<Completion, CompletionError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| CompletionError::Unreachable(error.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| CompletionError::Unreachable(error.to_string()))?;

        if !status.is_success() {
            return Err(CompletionError::UnexpectedStatus { status, body });
        }

        match candidate_text(&body) {
            Ok(text) => Ok(Completion {
                text,
                raw_body: body,
            }),
            Err(reason) => Err(CompletionError::MalformedEnvelope { reason, body }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

fn candidate_text(body: &str) -> Result<String, String> {
    let envelope: GenerateContentResponse =
        serde_json::from_str(body).map_err(|error| error.to_string())?;
    envelope
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| "response has no candidates".to_string())?
        .content
        .ok_or_else(|| "candidate has no content".to_string())?
        .parts
        .into_iter()
        .next()
        .ok_or_else(|| "candidate content has no parts".to_string())?
        .text
        .ok_or_else(|| "first part has no text".to_string())
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<Completion, CompletionError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::debug!(
                attempt,
                model = %self.model,
                prompt_length = prompt.len(),
                "Requesting completion"
            );
            match self.attempt(prompt).await {
                Ok(completion) => return Ok(completion),
                Err(error) if error.is_transient() && attempt <= self.max_retries => {
                    tracing::warn!(attempt, error = %error, "Transient model failure; retrying");
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
