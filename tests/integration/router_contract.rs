//! Router behaviour against scripted model output.

use std::sync::Arc;

use chrono::{Local, TimeZone};
use kunna::{ActionDescriptor, ActionKind, LanguageModel, LlmError, Router};
use serde_json::json;

use crate::helpers::ScriptedModel;

fn router(model: &Arc<ScriptedModel>) -> Router {
    Router::new(Arc::clone(model) as Arc<dyn LanguageModel>)
}

fn now() -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
}

#[tokio::test]
async fn prompt_lists_every_action_and_quotes_the_request() {
    let model = ScriptedModel::replying(&[r#"{"action": "general_chat", "params": {}}"#]);
    router(&model).classify("what's on tomorrow?", now()).await;

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    for kind in ActionKind::ALL {
        assert!(prompt.contains(kind.as_str()), "prompt is missing {kind}");
    }
    assert!(prompt.contains("2026-03-14 09:30:00"));
    assert!(prompt.contains("\"what's on tomorrow?\""));
}

#[tokio::test]
async fn noisy_answer_is_parsed() {
    let model = ScriptedModel::replying(&[
        r#"Sure! {"action": "google_search", "params": {"query": "weather"}} Hope that helps!"#,
    ]);
    let descriptor = router(&model).classify("weather?", now()).await;
    assert_eq!(
        descriptor,
        ActionDescriptor::new("google_search", [("query", json!("weather"))])
    );
}

#[tokio::test]
async fn fenced_answer_is_parsed() {
    let model = ScriptedModel::replying(&[
        "```json\n{\"action\": \"recall_info\", \"params\": {\"key\": \"wifi {password}\"}}\n```",
    ]);
    let descriptor = router(&model).classify("what's the wifi password", now()).await;
    assert_eq!(descriptor.action, "recall_info");
    assert_eq!(descriptor.param("key").as_deref(), Some("wifi {password}"));
}

#[tokio::test]
async fn prose_falls_back_to_general_chat() {
    let model = ScriptedModel::replying(&["I think you want the weather."]);
    let descriptor = router(&model).classify("weather please", now()).await;
    assert_eq!(descriptor, ActionDescriptor::general_chat("weather please"));
}

#[tokio::test]
async fn model_failure_falls_back_to_general_chat() {
    let model = ScriptedModel::new([Err(LlmError::TimeoutError("slow".into()))]);
    let descriptor = router(&model).classify("tell me a joke", now()).await;
    assert_eq!(descriptor.action, "general_chat");
    assert_eq!(descriptor.param("prompt").as_deref(), Some("tell me a joke"));
}
