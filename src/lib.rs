//! Kunna: a natural-language personal assistant.
//!
//! Each user utterance goes through two stages:
//!
//! - **Router**: a language model classifies the utterance into an
//!   [`ActionDescriptor`] (action tag plus parameters)
//! - **Dispatcher**: the descriptor is validated into an [`Action`] and run
//!   by exactly one handler (calendar, web search, memory, finance, health
//!   log, reminders, meeting transcription, shopping, file summaries,
//!   desktop control)
//!
//! Both stages are total: classification failures fall back to general
//! chat, and every dispatch yields a non-empty reply.
//!
//! Replies can also be spoken ([`Speaker`]) and commands dictated
//! ([`VoiceInput`]).

pub mod action;
pub mod assistant;
pub mod audio;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod logging;
pub mod paths;
pub mod router;
pub mod server;
pub mod speech;

pub use action::{Action, ActionDescriptor, ActionError, ActionKind};
pub use assistant::{Assistant, Turn};
pub use config::AssistantConfig;
pub use dispatcher::Dispatcher;
pub use error::{AssistantError, Result};
pub use handlers::{Handlers, Notification, NotificationKind, Notifier};
pub use llm::{LanguageModel, LlmError};
pub use router::Router;
pub use server::ChatServer;
pub use speech::{Speaker, VoiceInput};
