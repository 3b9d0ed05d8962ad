//! Recommendation pipeline: credential guard, prompt, model call, cleanup, parse.

use actix_web::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::config::AppConfig;
use crate::gemini::{GenerationProvider, GenerationRequest, ProviderError};
use crate::models::{RecommendationBody, ResponseEnvelope};
use crate::prompt::compose_prompt;

/// Shown to the user when the model answered with something that is not JSON.
pub const FORMAT_ERROR_MESSAGE: &str = "Could not parse the model's answer, but it did respond";

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("API key is not configured")]
    MissingCredential,
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl RecommendError {
    /// HTTP status used when this error reaches the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RecommendError::MissingCredential
            | RecommendError::InvalidBody(_)
            | RecommendError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Fail early when no API key is configured, before touching the body or the provider.
pub fn require_credential(config: &AppConfig) -> Result<&str, RecommendError> {
    config
        .api_key
        .as_deref()
        .ok_or(RecommendError::MissingCredential)
}

/// Parse the raw request body. Any JSON value is accepted.
pub fn parse_body(bytes: &[u8]) -> Result<RecommendationBody, RecommendError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| RecommendError::InvalidBody(e.to_string()))?;
    Ok(RecommendationBody::from_value(value))
}

/// Remove every ``` marker. A language tag is removed with it only when the
/// marker opens a block: the tag is followed by a line break, or is `json`.
///
/// The result never contains three consecutive backticks, so applying it
/// twice gives the same output as applying it once.
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        let tag_len = opening_tag_len(rest);
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    out
}

/// Length of the language tag directly after a fence, or 0 when the fence
/// is followed by ordinary text (e.g. a closing fence before "Note: ...").
fn opening_tag_len(after_fence: &str) -> usize {
    let tag_len = after_fence
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+'))
        .unwrap_or(after_fence.len());
    let tag = &after_fence[..tag_len];
    let ends_line = matches!(after_fence[tag_len..].chars().next(), Some('\n') | Some('\r'));

    if tag.eq_ignore_ascii_case("json") || ends_line {
        tag_len
    } else {
        0
    }
}

/// Strip fences, then surrounding whitespace.
pub fn clean_model_output(text: &str) -> String {
    strip_code_fences(text).trim().to_string()
}

/// Turn the model's text into a response envelope, falling back to the raw text.
pub fn interpret_model_output(raw: &str) -> ResponseEnvelope {
    let cleaned = clean_model_output(raw);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(suggestions) => ResponseEnvelope::suggestions(suggestions),
        Err(e) => {
            tracing::warn!("JSON parse error in model output: {}", e);
            ResponseEnvelope::unparsed(raw, FORMAT_ERROR_MESSAGE)
        }
    }
}

/// Run one recommendation request end to end.
///
/// Exactly one provider call is made when the credential is present and the
/// body parses; none otherwise.
pub async fn recommend(
    config: &AppConfig,
    provider: &dyn GenerationProvider,
    body: &[u8],
) -> Result<ResponseEnvelope, RecommendError> {
    let api_key = require_credential(config)?;
    let body = parse_body(body)?;

    if matches!(body, RecommendationBody::Opaque(_)) {
        tracing::debug!("request body is not a chat envelope, forwarding it whole");
    }

    let prompt = compose_prompt(&body.user_message());

    let text = provider
        .generate(GenerationRequest {
            api_key,
            model: &config.model,
            prompt: &prompt,
        })
        .await?;

    tracing::debug!(output = %text, "model output");

    Ok(interpret_model_output(&text))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Provider stub that counts calls and remembers the last prompt.
    pub(crate) struct StubProvider {
        reply: Result<String, String>,
        pub calls: Arc<AtomicUsize>,
        pub last_prompt: Mutex<Option<String>>,
        pub last_model: Mutex<Option<String>>,
    }

    impl StubProvider {
        pub(crate) fn replying(text: &str) -> Self {
            StubProvider {
                reply: Ok(text.to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
                last_prompt: Mutex::new(None),
                last_model: Mutex::new(None),
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            StubProvider {
                reply: Err(message.to_string()),
                ..Self::replying("")
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationProvider for StubProvider {
        async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(request.prompt.to_string());
            *self.last_model.lock().unwrap() = Some(request.model.to_string());
            self.reply
                .clone()
                .map_err(ProviderError::Transport)
        }
    }

    fn configured() -> AppConfig {
        AppConfig::default().with_api_key("test-key")
    }

    #[test]
    fn strips_fences_with_and_without_tag() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "\n[1]\n");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "\n[1]\n");
        assert_eq!(strip_code_fences("```javascript\n{}```"), "\n{}");
    }

    #[test]
    fn text_after_closing_fence_is_kept() {
        assert_eq!(strip_code_fences("[1]\n```Note: done"), "[1]\nNote: done");
        assert_eq!(strip_code_fences("```\n[1]\n```Enjoy"), "\n[1]\nEnjoy");
        assert_eq!(strip_code_fences("```json[1]```"), "[1]");
        assert_eq!(strip_code_fences("```python\r\n[1]```"), "\r\n[1]");
    }

    #[test]
    fn stripping_is_idempotent() {
        for input in [
            "```json\n[1]\n```",
            "`````json`",
            "````json``",
            "``````",
            "a ``` b ```json c",
            "[1]\n```Note ```js\n",
            "plain text",
        ] {
            let once = strip_code_fences(input);
            assert!(!once.contains("```"), "fence left in {:?}", once);
            assert_eq!(strip_code_fences(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn stripping_fence_free_text_is_noop() {
        let text = "[{\"name\": \"Mug `code` ``x``\"}]";
        assert_eq!(strip_code_fences(text), text);
    }

    #[test]
    fn clean_trims_whitespace() {
        assert_eq!(clean_model_output("  ```json\n [1] \n```  \n"), "[1]");
    }

    #[test]
    fn fenced_json_becomes_suggestions() {
        let raw = "```json\n[{\"name\":\"Mug\",\"price\":500,\"reason\":\"r\",\"shoppingTips\":\"t\"}]\n```";
        let envelope = interpret_model_output(raw);
        assert_eq!(
            envelope,
            ResponseEnvelope::suggestions(json!([
                { "name": "Mug", "price": 500, "reason": "r", "shoppingTips": "t" }
            ]))
        );
    }

    #[test]
    fn non_json_output_keeps_raw_text() {
        let envelope = interpret_model_output("not json at all");
        assert_eq!(envelope.suggestions, Some(json!([])));
        assert_eq!(envelope.raw.as_deref(), Some("not json at all"));
        assert!(!envelope.error.unwrap_or_default().is_empty());
    }

    #[test]
    fn raw_field_holds_uncleaned_text() {
        let raw = "```json\n[oops\n```";
        let envelope = interpret_model_output(raw);
        assert_eq!(envelope.raw.as_deref(), Some(raw));
    }

    #[test]
    fn any_json_shape_is_passed_through() {
        let envelope = interpret_model_output("[\"a mug\", \"a book\"]");
        assert_eq!(envelope.suggestions, Some(json!(["a mug", "a book"])));
        assert!(envelope.error.is_none());
    }

    #[tokio::test]
    async fn missing_credential_makes_no_provider_call() {
        let provider = StubProvider::replying("[]");
        let result = recommend(&AppConfig::default(), &provider, b"{}").await;

        assert!(matches!(result, Err(RecommendError::MissingCredential)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_credential_is_checked_before_body() {
        let provider = StubProvider::replying("[]");
        let result = recommend(&AppConfig::default(), &provider, b"not json").await;
        assert!(matches!(result, Err(RecommendError::MissingCredential)));
    }

    #[tokio::test]
    async fn invalid_body_is_a_server_error() {
        let provider = StubProvider::replying("[]");
        let err = recommend(&configured(), &provider, b"{ nope").await.unwrap_err();

        assert!(matches!(err, RecommendError::InvalidBody(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn opaque_body_is_forwarded_whole() {
        let provider = StubProvider::replying("[]");
        let envelope = recommend(&configured(), &provider, br#"{"foo":"bar"}"#)
            .await
            .unwrap();

        assert_eq!(envelope.suggestions, Some(json!([])));
        assert_eq!(provider.call_count(), 1);
        let prompt = provider.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.ends_with(r#"{"foo":"bar"}"#));
    }

    #[tokio::test]
    async fn chat_body_uses_last_message_and_configured_model() {
        let provider = StubProvider::replying("[]");
        let body = json!({ "messages": [
            { "role": "user", "content": "old" },
            { "role": "user", "content": "Target: Friend" }
        ]});
        recommend(&configured(), &provider, body.to_string().as_bytes())
            .await
            .unwrap();

        let prompt = provider.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.starts_with(crate::prompt::GIFT_GURU_INSTRUCTIONS));
        assert!(prompt.ends_with("Target: Friend"));
        assert!(!prompt.contains("old"));
        assert_eq!(
            provider.last_model.lock().unwrap().as_deref(),
            Some(crate::config::DEFAULT_MODEL)
        );
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let provider = StubProvider::failing("connection reset");
        let err = recommend(&configured(), &provider, b"{}").await.unwrap_err();

        assert!(matches!(err, RecommendError::Provider(_)));
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(provider.call_count(), 1);
    }
}
