//! Dispatcher behaviour against stub handlers.

use std::sync::Arc;

use kunna::{ActionDescriptor, ActionKind, Dispatcher, LanguageModel, LlmError};
use serde_json::json;

use crate::helpers::{MODEL_FALLBACK, ScriptedModel, SentinelHandlers, handlers, sentinel};

fn dispatcher(model: &Arc<ScriptedModel>, stub: &Arc<SentinelHandlers>) -> Dispatcher {
    Dispatcher::new(Arc::clone(model) as Arc<dyn LanguageModel>, handlers(stub))
}

/// Stub operation each action should reach.
fn operation(kind: ActionKind) -> Option<&'static str> {
    Some(match kind {
        ActionKind::DailyBriefing => "daily_briefing",
        ActionKind::CreateEvent => "create_event",
        ActionKind::WebSearch => "search",
        ActionKind::Remember => "remember",
        ActionKind::Recall => "recall",
        ActionKind::Forget => "forget",
        ActionKind::StockPrice => "stock_price",
        ActionKind::SetPriceAlert => "set_price_alert",
        ActionKind::ActiveAlerts => "active_alerts",
        ActionKind::LogHealthMetric => "log_metric",
        ActionKind::HealthSummary => "health_summary",
        ActionKind::SetReminder => "set_reminder",
        ActionKind::PendingReminders => "pending_reminders",
        ActionKind::StartListening => "start_listening",
        ActionKind::StopListening => "stop_listening",
        ActionKind::ShoppingSearch => "search_shopping",
        ActionKind::SummarizeFile => "summarize",
        ActionKind::OpenApplication => "open_application",
        ActionKind::FindFile => "find_file",
        ActionKind::GeneralChat => return None,
    })
}

fn example(kind: ActionKind) -> ActionDescriptor {
    let value: serde_json::Value = serde_json::from_str(kind.entry().example).unwrap();
    ActionDescriptor::from_value(value).unwrap()
}

#[tokio::test]
async fn every_action_reaches_its_handler() {
    let model = ScriptedModel::replying(&[]);
    let stub = Arc::new(SentinelHandlers::default());
    let dispatcher = dispatcher(&model, &stub);

    for kind in ActionKind::ALL {
        let Some(op) = operation(kind) else {
            continue;
        };
        let reply = dispatcher.execute(&example(kind), "utterance").await;
        assert_eq!(reply, sentinel(op), "{kind} should reach {op}");
        assert_eq!(stub.count(op), 1, "{kind} should call {op} once");
    }
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn general_chat_uses_prompt_or_utterance() {
    let model = ScriptedModel::replying(&["  a joke  ", "hello there"]);
    let stub = Arc::new(SentinelHandlers::default());
    let dispatcher = dispatcher(&model, &stub);

    let reply = dispatcher
        .execute(&ActionDescriptor::general_chat("tell me a joke"), "joke pls")
        .await;
    assert_eq!(reply, "a joke");

    let bare = ActionDescriptor::new("general_chat", []);
    assert_eq!(dispatcher.execute(&bare, "hi kunna").await, "hello there");

    assert_eq!(model.prompts(), ["tell me a joke", "hi kunna"]);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn unknown_action_is_answered_by_the_model() {
    let model = ScriptedModel::replying(&[]);
    let stub = Arc::new(SentinelHandlers::default());
    let dispatcher = dispatcher(&model, &stub);

    let descriptor = ActionDescriptor::new("launch_rocket", [("target", json!("moon"))]);
    let reply = dispatcher.execute(&descriptor, "fly me to the moon").await;

    assert_eq!(reply, MODEL_FALLBACK);
    assert_eq!(
        model.prompts(),
        ["The command 'launch_rocket' is unknown. Please answer this user prompt directly: fly me to the moon"]
    );
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn unknown_action_with_failing_model_still_answers() {
    let model = ScriptedModel::new([Err(LlmError::RequestError("offline".into()))]);
    let stub = Arc::new(SentinelHandlers::default());
    let reply = dispatcher(&model, &stub)
        .execute(&ActionDescriptor::new("???", []), "anything")
        .await;
    assert!(!reply.trim().is_empty());
}

#[tokio::test]
async fn event_without_start_time_asks_and_skips_handler() {
    let model = ScriptedModel::replying(&[]);
    let stub = Arc::new(SentinelHandlers::default());
    let dispatcher = dispatcher(&model, &stub);

    let descriptor =
        ActionDescriptor::new("create_calendar_event", [("summary", json!("Dentist"))]);
    let reply = dispatcher.execute(&descriptor, "book the dentist").await;

    assert!(reply.contains("When should the event start?"), "{reply}");
    assert_eq!(stub.count("create_event"), 0);
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn invalid_parameters_are_clarified() {
    let model = ScriptedModel::replying(&[]);
    let stub = Arc::new(SentinelHandlers::default());
    let dispatcher = dispatcher(&model, &stub);

    let sideways = ActionDescriptor::new(
        "set_price_alert",
        [
            ("ticker", json!("AAPL")),
            ("direction", json!("sideways")),
            ("target_price", json!(250)),
        ],
    );
    assert_eq!(
        dispatcher.execute(&sideways, "x").await,
        "Invalid direction. Please specify 'above' or 'below'."
    );

    let fortnight = ActionDescriptor::new(
        "set_reminder",
        [
            ("time_value", json!(2)),
            ("time_unit", json!("fortnights")),
            ("message", json!("x")),
        ],
    );
    assert_eq!(
        dispatcher.execute(&fortnight, "x").await,
        "Unknown time unit: fortnights. Use seconds, minutes or hours."
    );
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn same_descriptor_same_reply() {
    let model = ScriptedModel::replying(&[]);
    let stub = Arc::new(SentinelHandlers::default());
    let dispatcher = dispatcher(&model, &stub);

    let descriptor = example(ActionKind::StockPrice);
    let first = dispatcher.execute(&descriptor, "msft?").await;
    let second = dispatcher.execute(&descriptor, "msft?").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn handler_errors_become_apologies() {
    let model = ScriptedModel::replying(&[]);
    let stub = SentinelHandlers::failing();
    let reply = dispatcher(&model, &stub)
        .execute(&example(ActionKind::WebSearch), "weather")
        .await;
    assert_eq!(
        reply,
        "I'm sorry, an error occurred while I was trying to perform that action: system error: search exploded"
    );
}

#[tokio::test]
async fn empty_handler_output_is_acknowledged() {
    let model = ScriptedModel::replying(&[]);
    let stub = SentinelHandlers::silent();
    let reply = dispatcher(&model, &stub)
        .execute(&example(ActionKind::Remember), "remember it")
        .await;
    assert_eq!(reply, kunna::dispatcher::EMPTY_REPLY);
}

#[tokio::test]
async fn flattened_params_are_accepted() {
    let model = ScriptedModel::replying(&[]);
    let stub = Arc::new(SentinelHandlers::default());
    let descriptor = ActionDescriptor::from_value(json!({
        "command": "get_stock_price",
        "ticker": "TSLA"
    }))
    .unwrap();
    let reply = dispatcher(&model, &stub).execute(&descriptor, "tesla").await;
    assert_eq!(reply, sentinel("stock_price"));
}
