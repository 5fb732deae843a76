use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{clean_input, Tool};
use crate::data::models::{format_news, NewsResult};
use crate::data::NewsProvider;

/// Recent news search; provider failures degrade to an empty result.
pub struct NewsSearchTool {
    provider: Arc<dyn NewsProvider>,
    max_results: usize,
    timeout: Duration,
}

impl NewsSearchTool {
    pub fn new(provider: Arc<dyn NewsProvider>, max_results: usize, timeout: Duration) -> Self {
        Self {
            provider,
            max_results,
            timeout,
        }
    }

    pub async fn search(&self, query: &str) -> Vec<NewsResult> {
        let result = tokio::time::timeout(
            self.timeout,
            self.provider.search_news(query, self.max_results),
        )
        .await;

        match result {
            Ok(Ok(items)) => items.into_iter().take(self.max_results).collect(),
            Ok(Err(e)) => {
                warn!("⚠️ [TOOL] News search failed for '{}': {}", query, e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "⚠️ [TOOL] News search for '{}' timed out after {:?}",
                    query, self.timeout
                );
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Tool for NewsSearchTool {
    fn name(&self) -> &str {
        "news_search"
    }

    fn description(&self) -> &str {
        "Searches recent market news. Input: one asset or query at a time, e.g. AAPL or BTC."
    }

    async fn invoke(&self, input: &str) -> String {
        let query = clean_input(input);
        if query.is_empty() {
            return "No query given; search one asset at a time.".to_string();
        }

        info!("🛠️ [TOOL] {} <- {}", self.name(), query);
        let results = self.search(&query).await;
        format_news(&query, &results)
    }
}
