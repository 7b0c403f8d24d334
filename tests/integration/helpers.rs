//! Shared stubs for integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kunna::action::{PriceDirection, TimeUnit};
use kunna::handlers::{
    CalendarService, FileSummarizer, HealthLog, MarketData, MeetingRecorder, MemoryStore,
    ReminderService, ShoppingSearch, SystemControl, WebSearch,
};
use kunna::{AssistantError, Handlers, LanguageModel, LlmError, Result};

/// Language model that replays scripted answers, then echoes a fixed reply.
#[derive(Default)]
pub(crate) struct ScriptedModel {
    answers: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
    pub(crate) prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub(crate) fn new<I>(answers: I) -> Arc<Self>
    where
        I: IntoIterator<Item = std::result::Result<String, LlmError>>,
    {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn replying(answers: &[&str]) -> Arc<Self> {
        Self::new(answers.iter().map(|a| Ok((*a).to_owned())))
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

/// Reply once the script is exhausted.
pub(crate) const MODEL_FALLBACK: &str = "MODEL_REPLY";

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(MODEL_FALLBACK.to_owned()))
    }
}

/// Every handler trait, answering `SENTINEL:<operation>` and counting calls.
#[derive(Default)]
pub(crate) struct SentinelHandlers {
    calls: Mutex<Vec<String>>,
    pub(crate) fail: bool,
    pub(crate) empty: bool,
}

impl SentinelHandlers {
    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub(crate) fn silent() -> Arc<Self> {
        Arc::new(Self {
            empty: true,
            ..Self::default()
        })
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == op).count()
    }

    fn answer(&self, op: &str) -> Result<String> {
        self.calls.lock().unwrap().push(op.to_owned());
        if self.fail {
            return Err(AssistantError::System(format!("{op} exploded")));
        }
        if self.empty {
            return Ok("   ".to_owned());
        }
        Ok(sentinel(op))
    }
}

pub(crate) fn sentinel(op: &str) -> String {
    format!("SENTINEL:{op}")
}

#[async_trait]
impl CalendarService for SentinelHandlers {
    async fn daily_briefing(&self, _day: &str) -> Result<String> {
        self.answer("daily_briefing")
    }
    async fn create_event(&self, _summary: &str, _start_time: &str) -> Result<String> {
        self.answer("create_event")
    }
}

#[async_trait]
impl WebSearch for SentinelHandlers {
    async fn search(&self, _query: &str) -> Result<String> {
        self.answer("search")
    }
}

impl MemoryStore for SentinelHandlers {
    fn remember(&self, _key: &str, _value: &str) -> Result<String> {
        self.answer("remember")
    }
    fn recall(&self, _key: &str) -> Result<String> {
        self.answer("recall")
    }
    fn forget(&self, _key: &str) -> Result<String> {
        self.answer("forget")
    }
}

#[async_trait]
impl MarketData for SentinelHandlers {
    async fn stock_price(&self, _ticker: &str) -> Result<String> {
        self.answer("stock_price")
    }
    async fn set_price_alert(
        &self,
        _ticker: &str,
        _direction: PriceDirection,
        _target_price: f64,
    ) -> Result<String> {
        self.answer("set_price_alert")
    }
    fn active_alerts(&self) -> Result<String> {
        self.answer("active_alerts")
    }
}

impl HealthLog for SentinelHandlers {
    fn log_metric(&self, _metric_type: &str, _value: &str, _unit: &str) -> Result<String> {
        self.answer("log_metric")
    }
    fn summary(&self, _metric_type: &str) -> Result<String> {
        self.answer("health_summary")
    }
}

impl ReminderService for SentinelHandlers {
    fn set_reminder(&self, _amount: u64, _unit: TimeUnit, _message: &str) -> Result<String> {
        self.answer("set_reminder")
    }
    fn pending(&self) -> Result<String> {
        self.answer("pending_reminders")
    }
}

#[async_trait]
impl MeetingRecorder for SentinelHandlers {
    fn start_listening(&self) -> Result<String> {
        self.answer("start_listening")
    }
    async fn stop_listening(&self) -> Result<String> {
        self.answer("stop_listening")
    }
}

impl ShoppingSearch for SentinelHandlers {
    fn search_shopping(&self, _platform: &str, _item_name: &str) -> Result<String> {
        self.answer("search_shopping")
    }
}

#[async_trait]
impl FileSummarizer for SentinelHandlers {
    async fn summarize(&self, _file_path: &str) -> Result<String> {
        self.answer("summarize")
    }
}

#[async_trait]
impl SystemControl for SentinelHandlers {
    fn open_application(&self, _app_name: &str) -> Result<String> {
        self.answer("open_application")
    }
    async fn find_file(&self, _file_name: &str, _search_directory: Option<&str>) -> Result<String> {
        self.answer("find_file")
    }
}

/// A [`Handlers`] bundle where every slot is `stub`.
pub(crate) fn handlers(stub: &Arc<SentinelHandlers>) -> Handlers {
    Handlers {
        calendar: stub.clone(),
        search: stub.clone(),
        memory: stub.clone(),
        finance: stub.clone(),
        health: stub.clone(),
        reminders: stub.clone(),
        meeting: stub.clone(),
        shopping: stub.clone(),
        files: stub.clone(),
        system: stub.clone(),
    }
}
