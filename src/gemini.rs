//! Gemini AI client for gift recommendations.
//! Handles communication with the Google Gemini API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::AppConfig;

/// Errors raised while calling the generation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Gemini request failed: {0}")]
    Transport(String),
    #[error("Gemini request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("failed to decode Gemini response: {0}")]
    Decode(String),
    #[error("Gemini returned no text")]
    EmptyResponse,
}

/// One call to the provider: a single free-text prompt for a given model.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub api_key: &'a str,
    pub model: &'a str,
    pub prompt: &'a str,
}

/// Anything that turns a prompt into free text.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, ProviderError>;
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<ContentResponse>,
}

#[derive(Deserialize, Debug)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize, Debug)]
struct PartResponse {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiErrorResponse {
    error: GeminiApiError,
}

#[derive(Deserialize, Debug)]
struct GeminiApiError {
    message: String,
}

/// Gemini client backed by a shared reqwest connection pool.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(GeminiClient {
            client,
            base_url,
            timeout,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Self::new(config.base_url.clone(), config.request_timeout)
    }

    fn endpoint(&self, model: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(&format!("v1beta/models/{}:generateContent", model))
            .map_err(|e| ProviderError::Transport(format!("invalid Gemini endpoint: {}", e)))
    }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, ProviderError> {
        let url = self.endpoint(request.model)?;

        let request_body = GeminiRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: request.prompt.to_string(),
                }],
            }],
        };

        let res = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", request.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout)
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Gemini API error: {}", body);
            return Err(api_error(status.as_u16(), &body));
        }

        extract_text(&body)
    }
}

/// Prefer the message from Gemini's `{ "error": { "message": ... } }` body.
fn api_error(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<GeminiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    ProviderError::Api { status, message }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, ProviderError> {
    let response: GeminiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
}
