pub mod news;
pub mod price;


use async_trait::async_trait;
use std::sync::Arc;

pub use news::NewsSearchTool;
pub use price::PriceHistoryTool;

/// An external capability an agent may call between reasoning steps.
///
/// `invoke` never fails: provider errors come back as observation text so the
/// agent can describe the gap instead of aborting the run.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn invoke(&self, input: &str) -> String;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    PriceHistory,
    NewsSearch,
}

/// Tools available to a crew, looked up by kind when agents are bound.
#[derive(Clone, Default)]
pub struct ToolBox {
    pub price_history: Option<Arc<dyn Tool>>,
    pub news_search: Option<Arc<dyn Tool>>,
}

impl ToolBox {
    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        match kind {
            ToolKind::PriceHistory => self.price_history.clone(),
            ToolKind::NewsSearch => self.news_search.clone(),
        }
    }
}

/// Models often wrap tool input in quotes or key=value noise.
pub(crate) fn clean_input(input: &str) -> String {
    let trimmed = input.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '`').trim();
    let value = trimmed
        .split_once('=')
        .or_else(|| trimmed.split_once(':'))
        .filter(|(key, _)| {
            let key = key.trim().to_lowercase();
            key == "ticket" || key == "symbol" || key == "query" || key == "ticker"
        })
        .map_or(trimmed, |(_, v)| v);
    value.trim().trim_matches(|c: char| c == '"' || c == '\'').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_input() {
        assert_eq!(clean_input("  \"AAPL\" "), "AAPL");
        assert_eq!(clean_input("ticket=AAPL"), "AAPL");
        assert_eq!(clean_input("query: 'BTC news'"), "BTC news");
        assert_eq!(clean_input("BTC price: today"), "BTC price: today");
    }
}
