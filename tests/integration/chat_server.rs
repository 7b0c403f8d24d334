//! Assistant turns and the HTTP chat surface.

use std::sync::Arc;

use kunna::handlers::reminders::ReminderScheduler;
use kunna::{Assistant, ChatServer, LanguageModel, Notifier};
use serde_json::{Value, json};

use crate::helpers::{ScriptedModel, SentinelHandlers, handlers, sentinel};

fn assistant(model: &Arc<ScriptedModel>, stub: &Arc<SentinelHandlers>) -> Assistant {
    Assistant::new(
        Arc::clone(model) as Arc<dyn LanguageModel>,
        handlers(stub),
        Notifier::default(),
    )
}

/// Sentinel handlers except for a real reminder scheduler.
fn with_reminders(model: &Arc<ScriptedModel>, stub: &Arc<SentinelHandlers>) -> Assistant {
    let notifier = Notifier::default();
    let mut handlers = handlers(stub);
    handlers.reminders = Arc::new(ReminderScheduler::new(notifier.clone()));
    Assistant::new(Arc::clone(model) as Arc<dyn LanguageModel>, handlers, notifier)
}

const STRETCH_IN_2S: &str = r#"{"action": "set_reminder", "params": {"time_value": 2, "time_unit": "seconds", "message": "stretch"}}"#;

#[tokio::test]
async fn turn_routes_then_dispatches() {
    let model = ScriptedModel::replying(&[
        r#"{"action": "set_reminder", "params": {"time_value": 5, "time_unit": "minutes", "message": "stretch"}}"#,
    ]);
    let stub = Arc::new(SentinelHandlers::default());
    let turn = assistant(&model, &stub)
        .respond("remind me to stretch in 5 minutes")
        .await;

    assert_eq!(turn.descriptor.action, "set_reminder");
    assert_eq!(turn.response, sentinel("set_reminder"));
    assert_eq!(stub.calls(), ["set_reminder"]);
}

#[tokio::test]
async fn chat_endpoint_returns_descriptor_and_response() {
    let model = ScriptedModel::replying(&[
        r#"{"action": "get_stock_price", "params": {"ticker": "MSFT"}}"#,
    ]);
    let stub = Arc::new(SentinelHandlers::default());
    let server = ChatServer::start(assistant(&model, &stub), "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let base = format!("http://{}", server.addr());
    let client = reqwest::Client::new();

    let health = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.unwrap(), "ok");

    let response = client
        .post(format!("{base}/api/chat"))
        .json(&json!({"message": "how is microsoft doing?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "descriptor": {"action": "get_stock_price", "params": {"ticker": "MSFT"}},
            "response": "SENTINEL:stock_price"
        })
    );
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let model = ScriptedModel::replying(&[]);
    let stub = Arc::new(SentinelHandlers::default());
    let server = ChatServer::start(assistant(&model, &stub), "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/chat", server.addr()))
        .json(&json!({"message": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert!(model.prompts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reminders_are_streamed_to_http_clients() {
    let model = ScriptedModel::replying(&[STRETCH_IN_2S]);
    let stub = Arc::new(SentinelHandlers::default());
    let assistant = with_reminders(&model, &stub);
    let server = ChatServer::start(assistant, "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let base = format!("http://{}", server.addr());
    let client = reqwest::Client::new();

    let mut events = client
        .get(format!("{base}/api/notifications"))
        .send()
        .await
        .unwrap();
    assert_eq!(events.status(), 200);
    let content_type = events.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");

    let reply: Value = client
        .post(format!("{base}/api/chat"))
        .json(&json!({"message": "remind me in 2 seconds to stretch"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reply["response"], "Okay, reminder set: 'stretch' in 2 seconds");

    // Keep-alive comments may arrive first; bound the read.
    let mut received = String::new();
    for _ in 0..50 {
        let Some(chunk) = events.chunk().await.unwrap() else {
            break;
        };
        received.push_str(&String::from_utf8_lossy(&chunk));
        if received.contains("Hey, this is your reminder: stretch") {
            break;
        }
    }
    assert!(received.contains("event: reminder"), "{received:?}");
    assert!(
        received.contains(r#""message":"Hey, this is your reminder: stretch""#),
        "{received:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn pending_reminder_keeps_background_work_alive() {
    let model = ScriptedModel::replying(&[STRETCH_IN_2S]);
    let stub = Arc::new(SentinelHandlers::default());
    let assistant = with_reminders(&model, &stub);
    assert!(!assistant.has_background_work());

    assistant.respond("remind me in 2 seconds to stretch").await;
    assert!(assistant.has_background_work());

    let mut delivered = Vec::new();
    assistant
        .drain_background_work(|n| delivered.push(n.message))
        .await;
    assert_eq!(delivered, ["Hey, this is your reminder: stretch"]);
    assert!(!assistant.has_background_work());
}

#[tokio::test]
async fn plain_turns_leave_no_background_work() {
    let model = ScriptedModel::replying(&[
        r#"{"action": "get_stock_price", "params": {"ticker": "MSFT"}}"#,
    ]);
    let stub = Arc::new(SentinelHandlers::default());
    let assistant = with_reminders(&model, &stub);

    assistant.respond("how is microsoft doing?").await;
    assert!(!assistant.has_background_work());
    // Returns at once when there is nothing to wait for.
    assistant.drain_background_work(|_| panic!("no notifications expected")).await;
}
