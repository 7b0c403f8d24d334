//! Action handlers.
//!
//! Each capability sits behind a narrow trait so the dispatcher can be
//! driven by real services or by test stubs. Handlers return the
//! user-facing text on success; an `Err` is turned into an apology by the
//! dispatcher.
//!
//! | Trait | Default implementation |
//! |-------|------------------------|
//! | [`CalendarService`] | [`calendar::GoogleCalendar`] |
//! | [`WebSearch`] | [`search::SummarizingSearch`] |
//! | [`MemoryStore`] | [`memory::JsonMemoryStore`] |
//! | [`MarketData`] | [`finance::YahooFinance`] |
//! | [`HealthLog`] | [`health::JsonlHealthLog`] |
//! | [`ReminderService`] | [`reminders::ReminderScheduler`] |
//! | [`MeetingRecorder`] | [`meeting::MeetingTranscriber`] |
//! | [`ShoppingSearch`] | [`shopping::BrowserShopping`] |
//! | [`FileSummarizer`] | [`files::DocumentSummarizer`] |
//! | [`SystemControl`] | [`system::DesktopSystem`] |

pub mod calendar;
pub mod files;
pub mod finance;
pub mod health;
pub mod meeting;
pub mod memory;
pub mod notify;
pub mod reminders;
pub mod search;
pub mod shopping;
pub mod system;

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::{PriceDirection, TimeUnit};
use crate::config::AssistantConfig;
use crate::error::Result;
use crate::llm::LanguageModel;

pub use notify::{Notification, NotificationKind, Notifier};

/// Calendar lookups and event creation.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Schedule for `day` (`today` or `tomorrow`).
    async fn daily_briefing(&self, day: &str) -> Result<String>;
    /// Create an event starting at `start_time` (ISO 8601, local wall time).
    async fn create_event(&self, summary: &str, start_time: &str) -> Result<String>;
}

/// Web search answered from result snippets.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<String>;
}

/// Key/value memory.
pub trait MemoryStore: Send + Sync {
    fn remember(&self, key: &str, value: &str) -> Result<String>;
    fn recall(&self, key: &str) -> Result<String>;
    fn forget(&self, key: &str) -> Result<String>;
}

/// Stock quotes and price alerts.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn stock_price(&self, ticker: &str) -> Result<String>;
    async fn set_price_alert(
        &self,
        ticker: &str,
        direction: PriceDirection,
        target_price: f64,
    ) -> Result<String>;
    fn active_alerts(&self) -> Result<String>;
    /// Whether any price alert is still being watched.
    fn has_active_alerts(&self) -> bool {
        false
    }
}

/// Health metric log.
pub trait HealthLog: Send + Sync {
    fn log_metric(&self, metric_type: &str, value: &str, unit: &str) -> Result<String>;
    fn summary(&self, metric_type: &str) -> Result<String>;
}

/// Delayed reminders.
pub trait ReminderService: Send + Sync {
    fn set_reminder(&self, amount: u64, unit: TimeUnit, message: &str) -> Result<String>;
    fn pending(&self) -> Result<String>;
    /// Whether any reminder has yet to fire.
    fn has_pending(&self) -> bool {
        false
    }
}

/// Meeting capture and transcription.
#[async_trait]
pub trait MeetingRecorder: Send + Sync {
    fn start_listening(&self) -> Result<String>;
    async fn stop_listening(&self) -> Result<String>;
    fn is_recording(&self) -> bool {
        false
    }
}

/// Shopping and food delivery search.
pub trait ShoppingSearch: Send + Sync {
    fn search_shopping(&self, platform: &str, item_name: &str) -> Result<String>;
}

/// Document summaries.
#[async_trait]
pub trait FileSummarizer: Send + Sync {
    async fn summarize(&self, file_path: &str) -> Result<String>;
}

/// Desktop integration: launching apps and finding files.
#[async_trait]
pub trait SystemControl: Send + Sync {
    fn open_application(&self, app_name: &str) -> Result<String>;
    async fn find_file(&self, file_name: &str, search_directory: Option<&str>) -> Result<String>;
}

/// The full set of collaborators the dispatcher calls.
#[derive(Clone)]
pub struct Handlers {
    pub calendar: Arc<dyn CalendarService>,
    pub search: Arc<dyn WebSearch>,
    pub memory: Arc<dyn MemoryStore>,
    pub finance: Arc<dyn MarketData>,
    pub health: Arc<dyn HealthLog>,
    pub reminders: Arc<dyn ReminderService>,
    pub meeting: Arc<dyn MeetingRecorder>,
    pub shopping: Arc<dyn ShoppingSearch>,
    pub files: Arc<dyn FileSummarizer>,
    pub system: Arc<dyn SystemControl>,
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers").finish_non_exhaustive()
    }
}

impl Handlers {
    /// Whether a reminder, price alert or recording is still running in the
    /// background. That work ends with the process.
    pub fn has_background_work(&self) -> bool {
        self.reminders.has_pending()
            || self.finance.has_active_alerts()
            || self.meeting.is_recording()
    }

    /// Build the production handlers from configuration.
    ///
    /// Must be called inside a Tokio runtime (the price alert watcher and
    /// reminders spawn tasks).
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built or the memory file
    /// exists but cannot be read.
    pub fn from_config(
        config: &AssistantConfig,
        model: Arc<dyn LanguageModel>,
        notifier: Notifier,
    ) -> Result<Self> {
        let memory_path = config.memory.persist.then(|| config.memory_path());
        Ok(Self {
            calendar: Arc::new(calendar::GoogleCalendar::new(&config.calendar)?),
            search: Arc::new(search::SummarizingSearch::new(
                &config.search.to_search_config(),
                Arc::clone(&model),
            )?),
            memory: Arc::new(memory::JsonMemoryStore::open(memory_path)?),
            finance: Arc::new(finance::YahooFinance::new(&config.finance, notifier.clone())?),
            health: Arc::new(health::JsonlHealthLog::new(config.health_log_path())),
            reminders: Arc::new(reminders::ReminderScheduler::new(notifier)),
            meeting: Arc::new(meeting::MeetingTranscriber::new(
                &config.meeting,
                config.meetings_dir(),
                Arc::clone(&model),
            )?),
            shopping: Arc::new(shopping::BrowserShopping::system()),
            files: Arc::new(files::DocumentSummarizer::new(
                config.files.max_summary_chars,
                model,
            )),
            system: Arc::new(system::DesktopSystem::new(
                config.apps.applications.clone(),
                config.search_root(),
            )),
        })
    }
}
