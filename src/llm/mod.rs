//! Hosted language model clients.
//!
//! The assistant only ever needs "prompt in, text out", so both providers
//! implement the narrow [`LanguageModel`] trait:
//!
//! - [`GeminiModel`]: Google Gemini `generateContent`
//! - [`OpenAiModel`]: any OpenAI-compatible chat completions server

pub mod error;
pub mod gemini;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{LlmConfig, LlmProvider};

pub use error::LlmError;
pub use gemini::GeminiModel;
pub use openai::OpenAiModel;

/// A hosted text-generation model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Send a single prompt and return the completion text.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on transport, authentication or response failures.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Build the configured provider.
///
/// # Errors
///
/// Returns [`LlmError::ConfigError`] when the model name is empty or the
/// HTTP client cannot be built.
pub fn build_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>, LlmError> {
    if config.model.trim().is_empty() {
        return Err(LlmError::ConfigError("llm.model must not be empty".into()));
    }
    let model: Arc<dyn LanguageModel> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiModel::new(config)?),
        LlmProvider::OpenAi => Arc::new(OpenAiModel::new(config)?),
    };
    Ok(model)
}

/// Build an HTTP client with the configured timeout.
pub(crate) fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| LlmError::ConfigError(format!("failed to build HTTP client: {e}")))
}

/// Map a transport error to an [`LlmError`].
pub(crate) fn map_send_error(provider: &str, err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::TimeoutError(format!("{provider} request timed out: {err}"))
    } else {
        LlmError::RequestError(format!("{provider} request failed: {err}"))
    }
}

/// Map an HTTP error status to the appropriate [`LlmError`].
pub(crate) fn map_http_error(provider: &str, status: reqwest::StatusCode, body: &str) -> LlmError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 | 403 => LlmError::AuthError(format!("{provider} authentication failed: {message}")),
        429 => LlmError::RequestError(format!("{provider} rate limited: {message}")),
        code => LlmError::ProviderError(format!("{provider} HTTP {code}: {message}")),
    }
}

/// Extract `error.message` from a provider error body; both Gemini and
/// OpenAI use this shape.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
