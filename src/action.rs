//! Action model: the closed vocabulary, the wire descriptor the router
//! produces, and the typed [`Action`] the dispatcher executes.
//!
//! Canonical wire shape:
//!
//! ```json
//! {"action": "google_search", "params": {"query": "weather"}}
//! ```
//!
//! `command` is accepted as an alias for `action`, and a flattened object
//! (parameters next to `action`) is folded into `params`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Every action the dispatcher knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    DailyBriefing,
    CreateEvent,
    WebSearch,
    Remember,
    Recall,
    Forget,
    GeneralChat,
    StockPrice,
    SetPriceAlert,
    ActiveAlerts,
    LogHealthMetric,
    HealthSummary,
    SetReminder,
    PendingReminders,
    StartListening,
    StopListening,
    ShoppingSearch,
    SummarizeFile,
    OpenApplication,
    FindFile,
}

/// One catalog row used to build the routing prompt.
#[derive(Debug, Clone, Copy)]
pub struct ActionEntry {
    /// Wire tag.
    pub tag: &'static str,
    /// Parameters that must be present.
    pub required: &'static [&'static str],
    /// Parameters with a default.
    pub optional: &'static [&'static str],
    /// When the model should choose this action.
    pub use_for: &'static str,
    /// Example JSON output.
    pub example: &'static str,
}

impl ActionKind {
    /// The full vocabulary, in prompt order.
    pub const ALL: [ActionKind; 20] = [
        Self::DailyBriefing,
        Self::CreateEvent,
        Self::WebSearch,
        Self::Remember,
        Self::Recall,
        Self::Forget,
        Self::StockPrice,
        Self::SetPriceAlert,
        Self::ActiveAlerts,
        Self::LogHealthMetric,
        Self::HealthSummary,
        Self::SetReminder,
        Self::PendingReminders,
        Self::StartListening,
        Self::StopListening,
        Self::ShoppingSearch,
        Self::SummarizeFile,
        Self::OpenApplication,
        Self::FindFile,
        Self::GeneralChat,
    ];

    /// Wire tag for this action.
    pub fn as_str(self) -> &'static str {
        self.entry().tag
    }

    /// Catalog entry for this action.
    pub fn entry(self) -> ActionEntry {
        match self {
            Self::DailyBriefing => ActionEntry {
                tag: "get_daily_briefing",
                required: &[],
                optional: &["day"],
                use_for: "checking the calendar, schedule or meetings for today or tomorrow",
                example: r#"{"action": "get_daily_briefing", "params": {"day": "tomorrow"}}"#,
            },
            Self::CreateEvent => ActionEntry {
                tag: "create_calendar_event",
                required: &["summary", "start_time"],
                optional: &[],
                use_for: "creating or scheduling a new calendar event; start_time is YYYY-MM-DDTHH:MM:SS",
                example: r#"{"action": "create_calendar_event", "params": {"summary": "Dentist", "start_time": "2026-03-14T15:00:00"}}"#,
            },
            Self::WebSearch => ActionEntry {
                tag: "google_search",
                required: &["query"],
                optional: &[],
                use_for: "current events, facts and general knowledge that need the web",
                example: r#"{"action": "google_search", "params": {"query": "weather in Pune"}}"#,
            },
            Self::Remember => ActionEntry {
                tag: "remember_info",
                required: &["key", "value"],
                optional: &[],
                use_for: "storing a piece of information the user wants kept",
                example: r#"{"action": "remember_info", "params": {"key": "wifi password", "value": "hunter2"}}"#,
            },
            Self::Recall => ActionEntry {
                tag: "recall_info",
                required: &["key"],
                optional: &[],
                use_for: "retrieving previously stored information",
                example: r#"{"action": "recall_info", "params": {"key": "wifi password"}}"#,
            },
            Self::Forget => ActionEntry {
                tag: "forget_info",
                required: &["key"],
                optional: &[],
                use_for: "deleting previously stored information",
                example: r#"{"action": "forget_info", "params": {"key": "wifi password"}}"#,
            },
            Self::GeneralChat => ActionEntry {
                tag: "general_chat",
                required: &[],
                optional: &["prompt"],
                use_for: "greetings, jokes, poems, advice or anything no other action covers",
                example: r#"{"action": "general_chat", "params": {"prompt": "tell me a joke"}}"#,
            },
            Self::StockPrice => ActionEntry {
                tag: "get_stock_price",
                required: &["ticker"],
                optional: &[],
                use_for: "the current price of a stock or crypto ticker (e.g. MSFT, BTC-USD)",
                example: r#"{"action": "get_stock_price", "params": {"ticker": "MSFT"}}"#,
            },
            Self::SetPriceAlert => ActionEntry {
                tag: "set_price_alert",
                required: &["ticker", "direction", "target_price"],
                optional: &[],
                use_for: "alerting when a ticker goes above or below a price",
                example: r#"{"action": "set_price_alert", "params": {"ticker": "AAPL", "direction": "above", "target_price": 250}}"#,
            },
            Self::ActiveAlerts => ActionEntry {
                tag: "get_active_alerts",
                required: &[],
                optional: &[],
                use_for: "listing the active price alerts",
                example: r#"{"action": "get_active_alerts", "params": {}}"#,
            },
            Self::LogHealthMetric => ActionEntry {
                tag: "log_health_metric",
                required: &["metric_type", "value"],
                optional: &["unit"],
                use_for: "logging water, exercise, sleep, weight or other health data",
                example: r#"{"action": "log_health_metric", "params": {"metric_type": "water", "value": "500", "unit": "ml"}}"#,
            },
            Self::HealthSummary => ActionEntry {
                tag: "get_health_summary",
                required: &["metric_type"],
                optional: &[],
                use_for: "reviewing recently logged health data",
                example: r#"{"action": "get_health_summary", "params": {"metric_type": "water"}}"#,
            },
            Self::SetReminder => ActionEntry {
                tag: "set_reminder",
                required: &["time_value", "time_unit", "message"],
                optional: &[],
                use_for: "reminding the user after a number of seconds, minutes or hours",
                example: r#"{"action": "set_reminder", "params": {"time_value": 5, "time_unit": "minutes", "message": "take the pizza out"}}"#,
            },
            Self::PendingReminders => ActionEntry {
                tag: "get_pending_reminders",
                required: &[],
                optional: &[],
                use_for: "listing reminders that have not fired yet",
                example: r#"{"action": "get_pending_reminders", "params": {}}"#,
            },
            Self::StartListening => ActionEntry {
                tag: "start_listening",
                required: &[],
                optional: &[],
                use_for: "starting to record a meeting for transcription",
                example: r#"{"action": "start_listening", "params": {}}"#,
            },
            Self::StopListening => ActionEntry {
                tag: "stop_listening",
                required: &[],
                optional: &[],
                use_for: "stopping the meeting recording and producing the transcript summary",
                example: r#"{"action": "stop_listening", "params": {}}"#,
            },
            Self::ShoppingSearch => ActionEntry {
                tag: "search_shopping",
                required: &["item_name"],
                optional: &["platform"],
                use_for: "searching for food or products on a shopping platform (zomato, amazon)",
                example: r#"{"action": "search_shopping", "params": {"platform": "zomato", "item_name": "biryani"}}"#,
            },
            Self::SummarizeFile => ActionEntry {
                tag: "summarize_file",
                required: &["file_path"],
                optional: &[],
                use_for: "summarising a local .pdf, .docx or .txt document",
                example: r#"{"action": "summarize_file", "params": {"file_path": "/home/me/report.pdf"}}"#,
            },
            Self::OpenApplication => ActionEntry {
                tag: "open_application",
                required: &["app_name"],
                optional: &[],
                use_for: "launching a desktop application",
                example: r#"{"action": "open_application", "params": {"app_name": "calculator"}}"#,
            },
            Self::FindFile => ActionEntry {
                tag: "find_file",
                required: &["file_name"],
                optional: &["search_directory"],
                use_for: "locating a file on disk by its exact name",
                example: r#"{"action": "find_file", "params": {"file_name": "report.pdf"}}"#,
            },
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    /// Case-insensitive; `-` and spaces are treated as `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalised)
            .ok_or_else(|| ActionError::UnknownAction(s.trim().to_owned()))
    }
}

/// Direction of a price alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceDirection {
    Above,
    Below,
}

impl PriceDirection {
    /// Whether `price` satisfies the alert against `target`.
    pub fn is_triggered(self, price: f64, target: f64) -> bool {
        match self {
            Self::Above => price > target,
            Self::Below => price < target,
        }
    }
}

impl fmt::Display for PriceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Above => "above",
            Self::Below => "below",
        })
    }
}

impl FromStr for PriceDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" => Ok(Self::Above),
            "below" => Ok(Self::Below),
            _ => Err(()),
        }
    }
}

/// Unit of a reminder delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    pub fn seconds(self) -> u64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3600,
        }
    }

    /// Singular or plural label for `amount`.
    pub fn label(self, amount: u64) -> &'static str {
        match (self, amount == 1) {
            (Self::Seconds, true) => "second",
            (Self::Seconds, false) => "seconds",
            (Self::Minutes, true) => "minute",
            (Self::Minutes, false) => "minutes",
            (Self::Hours, true) => "hour",
            (Self::Hours, false) => "hours",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ();

    /// Matches on the unit word appearing anywhere, so `"mins"`, `"Minutes"`
    /// and `"minute(s)"` all work.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s.contains("sec") {
            Ok(Self::Seconds)
        } else if s.contains("min") {
            Ok(Self::Minutes)
        } else if s.contains("hour") || s == "h" || s == "hr" || s == "hrs" {
            Ok(Self::Hours)
        } else {
            Err(())
        }
    }
}

/// Why a descriptor could not become an [`Action`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    /// The tag is not in the vocabulary.
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    /// A required parameter is absent or blank.
    #[error("{action} is missing required parameter '{param}'")]
    MissingParam {
        action: ActionKind,
        param: &'static str,
    },

    /// A parameter is present but cannot be interpreted.
    #[error("{action} has invalid value '{value}' for parameter '{param}'")]
    InvalidParam {
        action: ActionKind,
        param: &'static str,
        value: String,
    },
}

impl ActionError {
    /// A question or explanation to show the user instead of running a handler.
    pub fn clarification(&self) -> String {
        match self {
            Self::UnknownAction(tag) => {
                format!("I'm not sure how to do '{tag}'. Could you rephrase that?")
            }
            Self::MissingParam { action, param } => match (action, *param) {
                (ActionKind::CreateEvent, "summary") => {
                    "What should I call the event?".to_owned()
                }
                (ActionKind::CreateEvent, "start_time") => {
                    "When should the event start? Please tell me the date and time.".to_owned()
                }
                (ActionKind::Remember, "key") => {
                    "I need both a topic (key) and the information (value) to remember.".to_owned()
                }
                (ActionKind::Remember, "value") => {
                    "What information should I remember about that?".to_owned()
                }
                (ActionKind::Recall, _) => "What topic do you want me to recall?".to_owned(),
                (ActionKind::Forget, _) => "What topic do you want me to forget?".to_owned(),
                (ActionKind::SetReminder, "message") => {
                    "What should I remind you about?".to_owned()
                }
                (ActionKind::SetReminder, _) => {
                    "When should I remind you? For example, 'in 10 minutes'.".to_owned()
                }
                (_, param) => format!(
                    "I need the {} to do that. Could you tell me?",
                    param.replace('_', " ")
                ),
            },
            Self::InvalidParam {
                action,
                param,
                value,
            } => match (action, *param) {
                (ActionKind::SetPriceAlert, "direction") => {
                    "Invalid direction. Please specify 'above' or 'below'.".to_owned()
                }
                (ActionKind::SetPriceAlert, "target_price") => {
                    format!("Invalid target price '{value}'. Please provide a number.")
                }
                (ActionKind::SetReminder, "time_unit") => {
                    format!("Unknown time unit: {value}. Use seconds, minutes or hours.")
                }
                (ActionKind::SetReminder, "time_value") => {
                    format!("'{value}' isn't a whole number of time units. How long should I wait?")
                }
                (_, param) => format!(
                    "I couldn't understand '{value}' as the {}.",
                    param.replace('_', " ")
                ),
            },
        }
    }
}

/// The structured output of classification: action tag plus parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Action tag (see [`ActionKind`]).
    #[serde(alias = "command")]
    pub action: String,
    /// Parameter name → JSON primitive.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl ActionDescriptor {
    /// Build a descriptor from a tag and parameter pairs.
    pub fn new<'a>(
        action: impl Into<String>,
        params: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Self {
        Self {
            action: action.into(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        }
    }

    /// The fail-open default: chat about the original utterance.
    pub fn general_chat(prompt: &str) -> Self {
        Self::new(
            ActionKind::GeneralChat.as_str(),
            [("prompt", Value::String(prompt.to_owned()))],
        )
    }

    /// Interpret a parsed JSON value as a descriptor.
    ///
    /// Accepts the canonical nested shape, the `command` alias, and the
    /// flattened shape. Returns `None` for anything without a string tag.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut obj) = value else {
            return None;
        };
        let action = match obj.remove("action").or_else(|| obj.remove("command")) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_owned(),
            _ => return None,
        };
        let params = match obj.remove("params") {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => obj,
            Some(_) => return None,
        };
        Some(Self { action, params })
    }

    /// A parameter rendered as trimmed text; `None` when absent, null or blank.
    pub fn param(&self, name: &str) -> Option<String> {
        let text = match self.params.get(name)? {
            Value::String(s) => s.trim().to_owned(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    /// The action kind, if the tag is in the vocabulary.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownAction`] for tags outside the vocabulary.
    pub fn kind(&self) -> Result<ActionKind, ActionError> {
        self.action.parse()
    }
}

/// A typed, validated action. One variant per [`ActionKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    DailyBriefing { day: String },
    CreateEvent { summary: String, start_time: String },
    WebSearch { query: String },
    Remember { key: String, value: String },
    Recall { key: String },
    Forget { key: String },
    GeneralChat { prompt: Option<String> },
    StockPrice { ticker: String },
    SetPriceAlert { ticker: String, direction: PriceDirection, target_price: f64 },
    ActiveAlerts,
    LogHealthMetric { metric_type: String, value: String, unit: String },
    HealthSummary { metric_type: String },
    SetReminder { amount: u64, unit: TimeUnit, message: String },
    PendingReminders,
    StartListening,
    StopListening,
    ShoppingSearch { platform: String, item_name: String },
    SummarizeFile { path: String },
    OpenApplication { app_name: String },
    FindFile { file_name: String, search_directory: Option<String> },
}

impl Action {
    /// Validate a descriptor and build the typed action.
    ///
    /// Optional parameters get their defaults here (`day` → `today`,
    /// `platform` → `zomato`, `unit` → empty).
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] for unknown tags, missing required parameters
    /// or unparseable typed parameters.
    pub fn from_descriptor(d: &ActionDescriptor) -> Result<Self, ActionError> {
        let kind = d.kind()?;
        let required = |param: &'static str| {
            d.param(param)
                .ok_or(ActionError::MissingParam { action: kind, param })
        };
        let invalid = |param: &'static str, value: String| ActionError::InvalidParam {
            action: kind,
            param,
            value,
        };

        let action = match kind {
            ActionKind::DailyBriefing => Self::DailyBriefing {
                day: d.param("day").unwrap_or_else(|| "today".to_owned()),
            },
            ActionKind::CreateEvent => Self::CreateEvent {
                summary: required("summary")?,
                start_time: required("start_time")?,
            },
            ActionKind::WebSearch => Self::WebSearch {
                query: required("query")?,
            },
            ActionKind::Remember => Self::Remember {
                key: required("key")?,
                value: required("value")?,
            },
            ActionKind::Recall => Self::Recall {
                key: required("key")?,
            },
            ActionKind::Forget => Self::Forget {
                key: required("key")?,
            },
            ActionKind::GeneralChat => Self::GeneralChat {
                prompt: d.param("prompt"),
            },
            ActionKind::StockPrice => Self::StockPrice {
                ticker: required("ticker")?,
            },
            ActionKind::SetPriceAlert => {
                let ticker = required("ticker")?;
                let direction_raw = required("direction")?;
                let direction = direction_raw
                    .parse()
                    .map_err(|()| invalid("direction", direction_raw.clone()))?;
                let price_raw = required("target_price")?;
                let target_price = price_raw
                    .trim_start_matches('$')
                    .replace(',', "")
                    .parse::<f64>()
                    .ok()
                    .filter(|p| p.is_finite() && *p > 0.0)
                    .ok_or_else(|| invalid("target_price", price_raw.clone()))?;
                Self::SetPriceAlert {
                    ticker,
                    direction,
                    target_price,
                }
            }
            ActionKind::ActiveAlerts => Self::ActiveAlerts,
            ActionKind::LogHealthMetric => Self::LogHealthMetric {
                metric_type: required("metric_type")?,
                value: required("value")?,
                unit: d.param("unit").unwrap_or_default(),
            },
            ActionKind::HealthSummary => Self::HealthSummary {
                metric_type: required("metric_type")?,
            },
            ActionKind::SetReminder => {
                let amount_raw = required("time_value")?;
                let amount = parse_amount(&amount_raw)
                    .ok_or_else(|| invalid("time_value", amount_raw.clone()))?;
                let unit_raw = required("time_unit")?;
                let unit = unit_raw
                    .parse()
                    .map_err(|()| invalid("time_unit", unit_raw.clone()))?;
                Self::SetReminder {
                    amount,
                    unit,
                    message: required("message")?,
                }
            }
            ActionKind::PendingReminders => Self::PendingReminders,
            ActionKind::StartListening => Self::StartListening,
            ActionKind::StopListening => Self::StopListening,
            ActionKind::ShoppingSearch => Self::ShoppingSearch {
                platform: d.param("platform").unwrap_or_else(|| "zomato".to_owned()),
                item_name: required("item_name")?,
            },
            ActionKind::SummarizeFile => Self::SummarizeFile {
                path: required("file_path")?,
            },
            ActionKind::OpenApplication => Self::OpenApplication {
                app_name: required("app_name")?,
            },
            ActionKind::FindFile => Self::FindFile {
                file_name: required("file_name")?,
                search_directory: d.param("search_directory"),
            },
        };
        Ok(action)
    }

    /// The kind of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::DailyBriefing { .. } => ActionKind::DailyBriefing,
            Self::CreateEvent { .. } => ActionKind::CreateEvent,
            Self::WebSearch { .. } => ActionKind::WebSearch,
            Self::Remember { .. } => ActionKind::Remember,
            Self::Recall { .. } => ActionKind::Recall,
            Self::Forget { .. } => ActionKind::Forget,
            Self::GeneralChat { .. } => ActionKind::GeneralChat,
            Self::StockPrice { .. } => ActionKind::StockPrice,
            Self::SetPriceAlert { .. } => ActionKind::SetPriceAlert,
            Self::ActiveAlerts => ActionKind::ActiveAlerts,
            Self::LogHealthMetric { .. } => ActionKind::LogHealthMetric,
            Self::HealthSummary { .. } => ActionKind::HealthSummary,
            Self::SetReminder { .. } => ActionKind::SetReminder,
            Self::PendingReminders => ActionKind::PendingReminders,
            Self::StartListening => ActionKind::StartListening,
            Self::StopListening => ActionKind::StopListening,
            Self::ShoppingSearch { .. } => ActionKind::ShoppingSearch,
            Self::SummarizeFile { .. } => ActionKind::SummarizeFile,
            Self::OpenApplication { .. } => ActionKind::OpenApplication,
            Self::FindFile { .. } => ActionKind::FindFile,
        }
    }
}

/// Parse a positive whole amount; accepts `"5"`, `5`, and `"5.0"`.
fn parse_amount(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}
