//! Executes routed actions.
//!
//! [`Dispatcher::execute`] always produces a user-facing string:
//!
//! - missing or invalid parameters become a clarifying question and the
//!   handler is not called
//! - unknown action tags are answered directly by the language model
//! - handler errors become an apology naming the error
//! - empty handler output is replaced by a short acknowledgement

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::action::{Action, ActionDescriptor, ActionError};
use crate::error::Result;
use crate::handlers::Handlers;
use crate::llm::{LanguageModel, LlmError};

/// Reply used when a handler succeeds without saying anything.
pub const EMPTY_REPLY: &str = "Done.";

/// Runs one handler per descriptor.
#[derive(Clone)]
pub struct Dispatcher {
    model: Arc<dyn LanguageModel>,
    handlers: Handlers,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("model", &self.model.name())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(model: Arc<dyn LanguageModel>, handlers: Handlers) -> Self {
        Self { model, handlers }
    }

    /// Run the action described by `descriptor`. `utterance` is the user's
    /// original text, used for general chat and unknown actions.
    pub async fn execute(&self, descriptor: &ActionDescriptor, utterance: &str) -> String {
        let reply = match Action::from_descriptor(descriptor) {
            Ok(action) => {
                let kind = action.kind();
                debug!(action = %kind, "dispatching");
                match self.run(action, utterance).await {
                    Ok(text) => text,
                    Err(e) => {
                        error!(action = %kind, "handler failed: {e}");
                        format!(
                            "I'm sorry, an error occurred while I was trying to perform that action: {e}"
                        )
                    }
                }
            }
            Err(ActionError::UnknownAction(tag)) => {
                info!(%tag, "unknown action, answering directly");
                self.chat(&format!(
                    "The command '{tag}' is unknown. Please answer this user prompt directly: {utterance}"
                ))
                .await
            }
            Err(e) => {
                info!(action = %descriptor.action, "asking for clarification: {e}");
                e.clarification()
            }
        };

        if reply.trim().is_empty() {
            EMPTY_REPLY.to_owned()
        } else {
            reply
        }
    }

    async fn run(&self, action: Action, utterance: &str) -> Result<String> {
        let h = &self.handlers;
        match action {
            Action::DailyBriefing { day } => h.calendar.daily_briefing(&day).await,
            Action::CreateEvent {
                summary,
                start_time,
            } => h.calendar.create_event(&summary, &start_time).await,
            Action::WebSearch { query } => h.search.search(&query).await,
            Action::Remember { key, value } => h.memory.remember(&key, &value),
            Action::Recall { key } => h.memory.recall(&key),
            Action::Forget { key } => h.memory.forget(&key),
            Action::GeneralChat { prompt } => {
                let prompt = prompt.as_deref().unwrap_or(utterance);
                Ok(self.chat(prompt).await)
            }
            Action::StockPrice { ticker } => h.finance.stock_price(&ticker).await,
            Action::SetPriceAlert {
                ticker,
                direction,
                target_price,
            } => {
                h.finance
                    .set_price_alert(&ticker, direction, target_price)
                    .await
            }
            Action::ActiveAlerts => h.finance.active_alerts(),
            Action::LogHealthMetric {
                metric_type,
                value,
                unit,
            } => h.health.log_metric(&metric_type, &value, &unit),
            Action::HealthSummary { metric_type } => h.health.summary(&metric_type),
            Action::SetReminder {
                amount,
                unit,
                message,
            } => h.reminders.set_reminder(amount, unit, &message),
            Action::PendingReminders => h.reminders.pending(),
            Action::StartListening => h.meeting.start_listening(),
            Action::StopListening => h.meeting.stop_listening().await,
            Action::ShoppingSearch {
                platform,
                item_name,
            } => h.shopping.search_shopping(&platform, &item_name),
            Action::SummarizeFile { path } => h.files.summarize(&path).await,
            Action::OpenApplication { app_name } => h.system.open_application(&app_name),
            Action::FindFile {
                file_name,
                search_directory,
            } => {
                h.system
                    .find_file(&file_name, search_directory.as_deref())
                    .await
            }
        }
    }

    /// Free-form answer from the language model. Errors become readable text.
    async fn chat(&self, prompt: &str) -> String {
        match self.model.complete(prompt).await {
            Ok(text) => text.trim().to_owned(),
            Err(e) => {
                warn!(model = self.model.name(), code = e.code(), "chat request failed: {e}");
                chat_failure(&e)
            }
        }
    }
}

fn chat_failure(err: &LlmError) -> String {
    match err {
        LlmError::AuthError(_) | LlmError::ConfigError(_) => format!(
            "I can't reach my language model right now. Please check the API key and model settings. ({})",
            err.message()
        ),
        LlmError::TimeoutError(_) => {
            "Sorry, the language model took too long to answer. Please try again.".to_owned()
        }
        _ => format!("Sorry, I had trouble generating a response: {err}"),
    }
}
