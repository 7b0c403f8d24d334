//! Search configuration with sensible defaults.

use crate::error::SearchError;

/// Default Serper search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://google.serper.dev/search";

/// Configuration for the Serper search client.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Serper API key, sent as `X-API-KEY`.
    pub api_key: String,
    /// Search endpoint URL. Overridable for tests and proxies.
    pub endpoint: String,
    /// Maximum number of organic results to keep.
    pub max_results: usize,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// How long to cache results in seconds. Set to 0 to disable caching.
    pub cache_ttl_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            max_results: 5,
            timeout_seconds: 8,
            cache_ttl_seconds: 600,
        }
    }
}

impl SearchConfig {
    /// Create a config with the given API key and default settings.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `api_key` is set
    /// - `endpoint` is an http(s) URL
    /// - `max_results` and `timeout_seconds` are greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.api_key.trim().is_empty() {
            return Err(SearchError::MissingApiKey);
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(SearchError::Config(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.max_results == 0 {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
