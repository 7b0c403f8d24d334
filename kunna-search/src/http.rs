//! Shared HTTP client construction.

use std::time::Duration;

use crate::config::SearchConfig;
use crate::error::SearchError;

const USER_AGENT: &str = concat!("kunna-search/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for the search provider.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

/// Map a transport error to a [`SearchError`].
pub(crate) fn map_request_error(err: reqwest::Error) -> SearchError {
    if err.is_timeout() {
        SearchError::Timeout(err.to_string())
    } else {
        SearchError::Http(err.to_string())
    }
}

/// Extract a human-readable message from a provider error body.
pub(crate) fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}
