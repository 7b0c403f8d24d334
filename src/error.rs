//! Error types for the assistant.

/// Top-level error type for handlers and infrastructure.
///
/// Handlers return these; the dispatcher turns them into apology messages
/// so nothing here ever reaches the user as a crash.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Language model call failed.
    #[error("language model error: {0}")]
    Llm(#[from] crate::llm::LlmError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Calendar access error (authentication, API, parsing).
    #[error("calendar error: {0}")]
    Calendar(String),

    /// Web search error.
    #[error("search error: {0}")]
    Search(#[from] kunna_search::SearchError),

    /// Memory store error.
    #[error("memory error: {0}")]
    Memory(String),

    /// Market data / price alert error.
    #[error("finance error: {0}")]
    Finance(String),

    /// Health log error.
    #[error("health log error: {0}")]
    Health(String),

    /// Reminder scheduling error.
    #[error("reminder error: {0}")]
    Reminder(String),

    /// Meeting recording or transcription error.
    #[error("meeting error: {0}")]
    Meeting(String),

    /// Audio device or WAV encoding error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech synthesis or voice input error.
    #[error("speech error: {0}")]
    Speech(String),

    /// File reading or document extraction error.
    #[error("file error: {0}")]
    File(String),

    /// Application launch or desktop integration error.
    #[error("system error: {0}")]
    System(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;
