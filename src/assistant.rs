//! One conversational turn: classify, then execute.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::action::ActionDescriptor;
use crate::config::AssistantConfig;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::handlers::{Handlers, Notification, Notifier};
use crate::llm::{self, LanguageModel};
use crate::router::Router;

/// Result of one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    /// The routed action, as shown by `--show-route` and the HTTP API.
    pub descriptor: ActionDescriptor,
    pub response: String,
}

/// Router and dispatcher wired to one language model.
#[derive(Debug, Clone)]
pub struct Assistant {
    router: Router,
    dispatcher: Dispatcher,
    handlers: Handlers,
    notifier: Notifier,
}

impl Assistant {
    /// Build the production assistant. Must run inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the language model or a handler cannot be built.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let model = llm::build_model(&config.llm)?;
        info!(provider = model.name(), model = %config.llm.model, "language model ready");
        let notifier = Notifier::default();
        let handlers = Handlers::from_config(config, Arc::clone(&model), notifier.clone())?;
        Ok(Self::new(model, handlers, notifier))
    }

    /// Assemble from parts, e.g. with stub handlers.
    pub fn new(model: Arc<dyn LanguageModel>, handlers: Handlers, notifier: Notifier) -> Self {
        Self {
            router: Router::new(Arc::clone(&model)),
            dispatcher: Dispatcher::new(model, handlers.clone()),
            handlers,
            notifier,
        }
    }

    /// Answer one utterance.
    pub async fn respond(&self, utterance: &str) -> Turn {
        let descriptor = self.router.classify(utterance, Local::now()).await;
        let response = self.dispatcher.execute(&descriptor, utterance).await;
        Turn {
            descriptor,
            response,
        }
    }

    /// Whether earlier turns left reminders, price alerts or a recording
    /// running. They are lost when the process exits.
    pub fn has_background_work(&self) -> bool {
        self.handlers.has_background_work()
    }

    /// Hand notifications to `deliver` until no background work is left.
    ///
    /// Price alerts and recordings never finish on their own, so callers
    /// usually race this against Ctrl-C.
    pub async fn drain_background_work(&self, mut deliver: impl FnMut(Notification)) {
        let mut rx = self.notifier.subscribe();
        let mut poll = tokio::time::interval(Duration::from_millis(500));
        while self.has_background_work() {
            tokio::select! {
                received = rx.recv() => match received {
                    Ok(notification) => deliver(notification),
                    Err(RecvError::Lagged(missed)) => warn!(missed, "notifications dropped"),
                    Err(RecvError::Closed) => break,
                },
                _ = poll.tick() => {}
            }
        }
    }

    /// Channel for reminders and price alerts raised in the background.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}
