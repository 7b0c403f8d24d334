//! Error types for the kunna-search crate.
//!
//! Messages never include the API key.

/// Errors that can occur during a web search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// No API key was configured for the search provider.
    #[error("missing search API key (set SERPER_API_KEY)")]
    MissingApiKey,

    /// The request timed out before the provider answered.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// An HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered with a non-success status.
    #[error("search API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error message, if any.
        message: String,
    },

    /// Failed to parse the provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    /// Whether the failure is an authentication problem the user must fix.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::MissingApiKey)
            || matches!(self, Self::Api { status, .. } if *status == 401 || *status == 403)
    }
}

/// Convenience type alias for kunna-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
