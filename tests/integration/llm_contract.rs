//! HTTP contract tests for the language model providers.

use kunna::config::{LlmConfig, LlmProvider};
use kunna::llm::{GeminiModel, LanguageModel, LlmError, OpenAiModel, build_model};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(provider: LlmProvider, server: &MockServer, model: &str) -> LlmConfig {
    LlmConfig {
        provider,
        api_url: server.uri(),
        model: model.into(),
        api_key: "test-key".into(),
        ..LlmConfig::default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn openai_request_and_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": false,
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hi there"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model = OpenAiModel::new(&config(LlmProvider::OpenAi, &server, "gpt-4o-mini")).unwrap();
    assert_eq!(model.complete("Hello").await.unwrap(), "Hi there");
}

#[tokio::test]
async fn openai_error_statuses_are_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let model = OpenAiModel::new(&config(LlmProvider::OpenAi, &server, "gpt-4o-mini")).unwrap();

    let auth = model.complete("x").await.unwrap_err();
    assert!(matches!(auth, LlmError::AuthError(_)), "{auth}");
    assert!(auth.message().contains("Incorrect API key"));

    let limited = model.complete("x").await.unwrap_err();
    assert!(matches!(limited, LlmError::RequestError(_)), "{limited}");

    let provider = model.complete("x").await.unwrap_err();
    assert!(matches!(provider, LlmError::ProviderError(_)), "{provider}");
    assert!(provider.is_retryable());
}

#[tokio::test]
async fn openai_empty_choice_is_a_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let model = OpenAiModel::new(&config(LlmProvider::OpenAi, &server, "m")).unwrap();
    let err = model.complete("x").await.unwrap_err();
    assert_eq!(err.code(), "RESPONSE_INVALID");
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn gemini_request_and_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Hello"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hi "}, {"text": "there"}]},
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model =
        GeminiModel::new(&config(LlmProvider::Gemini, &server, "gemini-1.5-flash")).unwrap();
    assert_eq!(model.complete("Hello").await.unwrap(), "Hi there");
}

#[tokio::test]
async fn gemini_blocked_prompt_is_a_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let model =
        GeminiModel::new(&config(LlmProvider::Gemini, &server, "gemini-1.5-flash")).unwrap();
    let err = model.complete("x").await.unwrap_err();
    assert!(matches!(err, LlmError::ResponseError(_)));
    assert!(err.message().contains("SAFETY"));
}

#[tokio::test]
async fn gemini_without_key_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut cfg = config(LlmProvider::Gemini, &server, "gemini-1.5-flash");
    cfg.api_key.clear();
    let model = build_model(&cfg).unwrap();
    assert_eq!(model.name(), "gemini");
    assert!(matches!(model.complete("x").await, Err(LlmError::AuthError(_))));
}
