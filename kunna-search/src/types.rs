//! Core types for search results and the Serper wire format.

use serde::{Deserialize, Serialize};

/// A single organic search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the result page.
    pub title: String,
    /// URL of the result page.
    pub url: String,
    /// Text snippet summarising the page.
    pub snippet: String,
    /// 1-based rank reported by the provider.
    pub position: usize,
}

impl SearchResult {
    /// Format this result as a context block for a language model.
    pub fn context_block(&self) -> String {
        format!("Title: {}\nSnippet: {}\n---\n", self.title, self.snippet)
    }
}

/// Request body for the Serper search API.
#[derive(Debug, Serialize)]
pub(crate) struct SerperRequest<'a> {
    pub q: &'a str,
}

/// Response body of the Serper search API (only the fields we use).
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SerperResponse {
    #[serde(default)]
    pub organic: Vec<SerperOrganic>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SerperOrganic {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub position: Option<usize>,
}

impl SerperResponse {
    /// Convert organic entries into [`SearchResult`]s, keeping at most `max`.
    pub(crate) fn into_results(self, max: usize) -> Vec<SearchResult> {
        self.organic
            .into_iter()
            .enumerate()
            .filter(|(_, o)| !o.title.trim().is_empty() || !o.snippet.trim().is_empty())
            .take(max)
            .map(|(i, o)| SearchResult {
                title: o.title.trim().to_owned(),
                url: o.link,
                snippet: o.snippet.trim().to_owned(),
                position: o.position.unwrap_or(i + 1),
            })
            .collect()
    }
}
