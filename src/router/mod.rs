//! Utterance classification.
//!
//! The [`Router`] asks the language model to pick one action for an
//! utterance and parses its answer into an [`ActionDescriptor`]. It never
//! fails: any model error or unreadable output routes to `general_chat`
//! with the original utterance as the prompt.

pub mod extract;
pub mod prompt;

use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::action::ActionDescriptor;
use crate::llm::LanguageModel;

pub use extract::{ExtractError, extract_json_object};
pub use prompt::routing_prompt;

/// Why a model answer could not be turned into a descriptor.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON object has no action tag")]
    MissingAction,
}

/// Classifies utterances with a language model.
#[derive(Clone)]
pub struct Router {
    model: Arc<dyn LanguageModel>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("model", &self.model.name())
            .finish()
    }
}

impl Router {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Classify `utterance` into an action descriptor.
    pub async fn classify(&self, utterance: &str, now: DateTime<Local>) -> ActionDescriptor {
        let prompt = routing_prompt(utterance, &now);
        let raw = match self.model.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(model = self.model.name(), code = e.code(), "routing request failed: {e}");
                return ActionDescriptor::general_chat(utterance);
            }
        };
        debug!(raw = %raw, "routing response");
        Self::interpret(&raw, utterance)
    }

    /// Turn raw model output into a descriptor, falling back to general chat.
    pub fn interpret(raw: &str, utterance: &str) -> ActionDescriptor {
        match parse_descriptor(raw) {
            Ok(descriptor) => {
                info!(action = %descriptor.action, "routed");
                descriptor
            }
            Err(e) => {
                warn!("could not parse routing output, using general chat: {e}");
                ActionDescriptor::general_chat(utterance)
            }
        }
    }
}

/// Extract and decode the descriptor in `raw`.
///
/// # Errors
///
/// Returns [`ParseError`] when no object is present, the object is not valid
/// JSON, or it carries no `action`/`command` tag.
pub fn parse_descriptor(raw: &str) -> Result<ActionDescriptor, ParseError> {
    let payload = extract_json_object(raw)?;
    let value: serde_json::Value = serde_json::from_str(payload)?;
    ActionDescriptor::from_value(value).ok_or(ParseError::MissingAction)
}
