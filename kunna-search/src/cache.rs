//! In-memory TTL cache for search results.
//!
//! Keyed by the normalised (trimmed, lowercased) query. Uses [`moka`] for
//! async-friendly caching with automatic eviction.

use std::time::Duration;

use moka::future::Cache;

use crate::types::SearchResult;

/// Maximum number of cached result sets.
const MAX_CACHE_ENTRIES: u64 = 100;

/// Cache of search results owned by a [`crate::SearchClient`].
#[derive(Clone)]
pub struct ResultCache {
    inner: Option<Cache<String, Vec<SearchResult>>>,
}

impl ResultCache {
    /// Create a cache with the given TTL. A TTL of 0 disables caching.
    pub fn new(ttl_seconds: u64) -> Self {
        let inner = (ttl_seconds > 0).then(|| {
            Cache::builder()
                .max_capacity(MAX_CACHE_ENTRIES)
                .time_to_live(Duration::from_secs(ttl_seconds))
                .build()
        });
        Self { inner }
    }

    /// Look up cached results for a query.
    pub async fn get(&self, query: &str) -> Option<Vec<SearchResult>> {
        let cache = self.inner.as_ref()?;
        cache.get(&normalise(query)).await
    }

    /// Store results for a query.
    pub async fn insert(&self, query: &str, results: Vec<SearchResult>) {
        if let Some(cache) = &self.inner {
            cache.insert(normalise(query), results).await;
        }
    }

    /// Whether caching is enabled.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }
}

fn normalise(query: &str) -> String {
    query.trim().to_lowercase()
}
