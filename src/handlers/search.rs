//! Web search answered by the language model from Serper result snippets.

use std::sync::Arc;

use async_trait::async_trait;
use kunna_search::{SearchClient, SearchConfig, SearchError, SearchResult};
use tracing::{info, warn};

use super::WebSearch;
use crate::error::{AssistantError, Result};
use crate::llm::LanguageModel;

/// Search handler. Without an API key every search fails with
/// [`SearchError::MissingApiKey`]; the rest of the assistant keeps working.
pub struct SummarizingSearch {
    client: Option<SearchClient>,
    model: Arc<dyn LanguageModel>,
}

impl std::fmt::Debug for SummarizingSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizingSearch")
            .field("client", &self.client)
            .field("model", &self.model.name())
            .finish()
    }
}

impl SummarizingSearch {
    /// # Errors
    ///
    /// Returns an error for invalid settings other than a missing API key.
    pub fn new(config: &SearchConfig, model: Arc<dyn LanguageModel>) -> Result<Self> {
        let client = match SearchClient::new(config.clone()) {
            Ok(client) => Some(client),
            Err(SearchError::MissingApiKey) => {
                warn!("SERPER_API_KEY not set; web search is disabled");
                None
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { client, model })
    }
}

#[async_trait]
impl WebSearch for SummarizingSearch {
    async fn search(&self, query: &str) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .ok_or(AssistantError::Search(SearchError::MissingApiKey))?;
        let results = client.search(query).await?;
        info!(count = results.len(), "search results received");
        if results.is_empty() {
            return Ok("I couldn't find any relevant results for that search.".to_owned());
        }
        Ok(self.model.complete(&answer_prompt(query, &results)).await?)
    }
}

fn answer_prompt(query: &str, results: &[SearchResult]) -> String {
    let mut prompt = format!(
        "Based on these search results, answer the user's query: '{}'\n\n",
        query.trim()
    );
    for result in results {
        prompt.push_str(&result.context_block());
    }
    prompt
}
