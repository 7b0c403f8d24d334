//! OpenAI-compatible chat completions client.
//!
//! Works with any server implementing `POST /v1/chat/completions`:
//! OpenAI itself, Ollama (`http://localhost:11434`), vLLM, LM Studio,
//! llama.cpp server. Requests are non-streaming; the first choice's
//! message content is returned.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{LanguageModel, LlmError, build_http_client, map_http_error, map_send_error};
use crate::config::LlmConfig;

/// Chat completions client.
pub struct OpenAiModel {
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiModel {
    /// Create a client from config. `api_url` may include or omit `/v1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let url = config.effective_api_url();
        let base_url = url.strip_suffix("/v1").unwrap_or(&url).to_owned();
        Ok(Self {
            base_url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: build_http_client(config.timeout_secs)?,
        })
    }

    /// Build the JSON request body.
    pub fn build_request(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut request = self.client.post(&url).json(&self.build_request(prompt));
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_send_error("OpenAI", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error("OpenAI", status, &body));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(format!("invalid completion body: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LlmError::ResponseError("completion contained no text".into()))?;

        debug!(model = %self.model, chars = text.len(), "completion received");
        Ok(text)
    }
}
