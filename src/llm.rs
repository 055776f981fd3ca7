//! Chat client abstraction and the Gemini adapter.
//!
//! Answers are generated with a single non-streaming `generateContent` call at
//! a fixed sampling temperature. There is no automatic retry; a failed call
//! fails the enclosing pipeline invocation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Sampling temperature applied to every answer.
const ANSWER_TEMPERATURE: f64 = 0.5;

/// Errors surfaced while generating an answer with the chat model.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider was unreachable.
    #[error("Chat provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate answer: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or contained no text.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by chat backends.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Generate the answer text for a fully composed prompt.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// HTTP client for the Gemini `generateContent` endpoint.
pub struct GeminiChatClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiChatClient {
    /// Construct a client for the public Gemini endpoint.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_base_url(GEMINI_BASE_URL, api_key, model)
    }

    /// Construct a client against an alternate endpoint (used by tests).
    pub fn with_base_url(base_url: &str, api_key: &str, model: &str) -> Self {
        let http = Client::builder()
            .user_agent("docchat/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to construct reqwest::Client for chat");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.trim_start_matches("models/").to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
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

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": ANSWER_TEMPERATURE,
            }
        });

        tracing::debug!(model = %self.model, "Generating answer");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LlmError::ProviderUnavailable(format!(
                    "failed to reach Gemini at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LlmError::ProviderUnavailable(format!(
                "Gemini endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::GenerationFailed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(|error| {
            LlmError::InvalidResponse(format!("failed to decode Gemini response: {error}"))
        })?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::InvalidResponse(
                "response contained no candidate text".into(),
            ));
        }

        Ok(text.trim().to_string())
    }
}
