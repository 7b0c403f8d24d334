//! # kunna-search
//!
//! Web search for the Kunna assistant, backed by the Serper Google Search
//! API (`POST https://google.serper.dev/search`).
//!
//! - One JSON request per query, authenticated with `X-API-KEY`
//! - Organic results are trimmed to `max_results`
//! - Results are cached in memory with a configurable TTL
//! - Queries are logged only at trace level

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use cache::ResultCache;
pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use types::SearchResult;

use tracing::{debug, trace};

use crate::types::{SerperRequest, SerperResponse};

/// Client for the Serper search API.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct SearchClient {
    config: SearchConfig,
    client: reqwest::Client,
    cache: ResultCache,
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("endpoint", &self.config.endpoint)
            .field("max_results", &self.config.max_results)
            .finish()
    }
}

impl SearchClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let client = http::build_client(&config)?;
        let cache = ResultCache::new(config.cache_ttl_seconds);
        Ok(Self {
            config,
            client,
            cache,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search the web and return up to `max_results` organic results.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] when the request fails, the provider answers
    /// with a non-success status, or the body cannot be parsed.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::Config("query must not be empty".into()));
        }

        if let Some(hit) = self.cache.get(query).await {
            trace!(query, "search cache hit");
            return Ok(hit);
        }

        trace!(query, "querying serper");
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("X-API-KEY", &self.config.api_key)
            .json(&SerperRequest { q: query })
            .send()
            .await
            .map_err(http::map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: http::extract_error_message(&body),
            });
        }

        let parsed: SerperResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("invalid search response: {e}")))?;
        let results = parsed.into_results(self.config.max_results);
        debug!(count = results.len(), "search completed");

        self.cache.insert(query, results.clone()).await;
        Ok(results)
    }
}

/// Search with a one-off client built from `config`.
///
/// # Errors
///
/// Same as [`SearchClient::search`], plus configuration errors.
pub async fn search(query: &str, config: &SearchConfig) -> Result<Vec<SearchResult>> {
    SearchClient::new(config.clone())?.search(query).await
}
