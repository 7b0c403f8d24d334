//! Production handlers built from a config file, driven through the
//! dispatcher. Only local services are exercised here.

use std::sync::Arc;

use kunna::config::AssistantConfig;
use kunna::{ActionDescriptor, Dispatcher, Handlers, LanguageModel, Notifier};
use serde_json::json;
use tempfile::TempDir;

use crate::helpers::ScriptedModel;

fn config_in(dir: &TempDir) -> AssistantConfig {
    let toml = format!(
        r#"
[llm]
provider = "openai"
api_url = "http://127.0.0.1:9"
model = "test-model"

[memory]
persist = true
path = "{root}/memory.json"

[health]
log_path = "{root}/health_log.jsonl"

[meeting]
output_dir = "{root}/meetings"

[files]
search_root = "{root}"
"#,
        root = dir.path().display()
    );
    let path = dir.path().join("config.toml");
    std::fs::write(&path, toml).unwrap();
    AssistantConfig::from_file(&path).unwrap()
}

fn dispatcher(config: &AssistantConfig) -> Dispatcher {
    let model: Arc<dyn LanguageModel> = ScriptedModel::replying(&[]);
    let handlers = Handlers::from_config(config, Arc::clone(&model), Notifier::default()).unwrap();
    Dispatcher::new(model, handlers)
}

#[tokio::test]
async fn memory_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);

    let first = dispatcher(&config);
    let reply = first
        .execute(
            &ActionDescriptor::new(
                "remember_info",
                [("key", json!("Parking Spot")), ("value", json!("level 3, B12"))],
            ),
            "remember my parking spot",
        )
        .await;
    assert!(reply.starts_with("Okay, I've remembered that"), "{reply}");
    drop(first);

    let second = dispatcher(&config);
    let recall = ActionDescriptor::new("recall_info", [("key", json!("parking spot"))]);
    assert_eq!(
        second.execute(&recall, "where did I park").await,
        "I remember that 'parking spot' is 'level 3, B12'."
    );

    let forget = ActionDescriptor::new("forget_info", [("key", json!("parking spot"))]);
    second.execute(&forget, "forget it").await;
    assert_eq!(
        second.execute(&recall, "where did I park").await,
        "I'm sorry, I don't have any information stored for 'parking spot'."
    );
}

#[tokio::test]
async fn health_log_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&config_in(&dir));

    let log = ActionDescriptor::new(
        "log_health_metric",
        [
            ("metric_type", json!("Water")),
            ("value", json!(500)),
            ("unit", json!("ml")),
        ],
    );
    assert_eq!(
        dispatcher.execute(&log, "I drank 500ml").await,
        "Got it. I've logged that for you."
    );
    assert!(dir.path().join("health_log.jsonl").exists());

    let summary = dispatcher
        .execute(
            &ActionDescriptor::new("get_health_summary", [("metric_type", json!("water"))]),
            "how much water",
        )
        .await;
    assert!(summary.starts_with("Here are your last 5 entries for 'Water':"));
    assert!(summary.ends_with("you logged: 500 ml"));
}

#[tokio::test]
async fn reminders_and_alerts_start_empty() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&config_in(&dir));

    let pending = ActionDescriptor::new("get_pending_reminders", []);
    assert_eq!(dispatcher.execute(&pending, "reminders?").await, "No pending reminders.");

    let set = ActionDescriptor::new(
        "set_reminder",
        [
            ("time_value", json!("10")),
            ("time_unit", json!("minutes")),
            ("message", json!("check the oven")),
        ],
    );
    assert_eq!(
        dispatcher.execute(&set, "remind me").await,
        "Okay, reminder set: 'check the oven' in 10 minutes"
    );
    assert!(
        dispatcher
            .execute(&pending, "reminders?")
            .await
            .starts_with("Pending reminders:\n- 'check the oven' in 10 minutes (due at ")
    );

    let alerts = ActionDescriptor::new("get_active_alerts", []);
    assert_eq!(
        dispatcher.execute(&alerts, "alerts?").await,
        "You have no active price alerts."
    );
}

#[tokio::test]
async fn find_file_uses_configured_root() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("docs");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(nested.join("budget.xlsx"), b"").unwrap();
    let dispatcher = dispatcher(&config_in(&dir));

    let reply = dispatcher
        .execute(
            &ActionDescriptor::new("find_file", [("file_name", json!("budget.xlsx"))]),
            "where is budget.xlsx",
        )
        .await;
    assert_eq!(
        reply,
        format!(
            "I found the file. It is located at: {}",
            nested.join("budget.xlsx").display()
        )
    );
}

#[tokio::test]
async fn stop_without_start() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&config_in(&dir));
    assert_eq!(
        dispatcher
            .execute(&ActionDescriptor::new("stop_listening", []), "stop")
            .await,
        "I wasn't listening."
    );
}
