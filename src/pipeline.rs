//! The stock newsletter crew: price analyst, news analyst and writer.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::agents::{news_analyst, newsletter_writer, price_analyst};
use crate::config::AppConfig;
use crate::crew::manager::{LlmManager, Manager};
use crate::crew::task::{PipelineResult, TaskInputs};
use crate::crew::Crew;
use crate::data::models::Ticket;
use crate::data::news::DuckDuckGoNewsClient;
use crate::data::yahoo::YahooFinanceClient;
use crate::data::{NewsProvider, PriceProvider};
use crate::error::{PipelineError, Result};
use crate::llm::{LLMClient, LanguageModel};
use crate::tools::{NewsSearchTool, PriceHistoryTool, ToolBox};

pub struct NewsletterPipeline {
    config: AppConfig,
    llm: Arc<dyn LanguageModel>,
    manager: Arc<dyn Manager>,
    prices: Arc<dyn PriceProvider>,
    news: Arc<dyn NewsProvider>,
}

impl NewsletterPipeline {
    /// The manager defaults to the same language model as the agents.
    pub fn new(
        config: AppConfig,
        llm: Arc<dyn LanguageModel>,
        prices: Arc<dyn PriceProvider>,
        news: Arc<dyn NewsProvider>,
    ) -> Self {
        let manager: Arc<dyn Manager> = Arc::new(LlmManager::new(llm.clone()));
        Self {
            config,
            llm,
            manager,
            prices,
            news,
        }
    }

    /// Production wiring: OpenAI-compatible model, Yahoo prices, DuckDuckGo news.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let timeout = config.pipeline.call_timeout();
        let llm = LLMClient::from_config(&config.llm, timeout)?;
        let prices = YahooFinanceClient::new().map_err(PipelineError::DataUnavailable)?;
        let news = DuckDuckGoNewsClient::new(
            config.news.base_url.clone(),
            config.news.region.clone(),
            timeout,
        )
        .map_err(PipelineError::DataUnavailable)?;

        info!("🤖 Using LLM Model: {}", llm.model);
        Ok(Self::new(config, Arc::new(llm), Arc::new(prices), Arc::new(news)))
    }

    pub fn with_manager(mut self, manager: Arc<dyn Manager>) -> Self {
        self.manager = manager;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Assemble the crew with tools bound to the price window in effect on `today`.
    pub fn build_crew(&self, today: NaiveDate) -> Result<Crew> {
        let (start, end) = self.config.price.window(today)?;
        let timeout = self.config.pipeline.call_timeout();

        let tools = ToolBox {
            price_history: Some(Arc::new(PriceHistoryTool::new(
                self.prices.clone(),
                start,
                end,
                self.config.price.sideways_band_pct,
                timeout,
            ))),
            news_search: Some(Arc::new(NewsSearchTool::new(
                self.news.clone(),
                self.config.news.max_results,
                timeout,
            ))),
        };

        Crew::builder()
            .agent(price_analyst::profile()?)
            .agent(news_analyst::profile()?)
            .agent(newsletter_writer::profile()?)
            .task(price_analyst::task())
            .task(news_analyst::task())
            .task(newsletter_writer::task())
            .tools(tools)
            .process(self.config.pipeline.process)
            .manager(self.manager.clone())
            .max_manager_iterations(self.config.pipeline.manager_max_iterations)
            .llm(self.llm.clone())
            .build()
    }

    pub async fn run(&self, ticket: &Ticket) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4();
        let now = Utc::now();
        info!(
            "📰 [PIPELINE] Run {} for {} ({:?} process)",
            run_id, ticket, self.config.pipeline.process
        );

        let crew = self.build_crew(now.date_naive())?;
        let inputs = TaskInputs::new()
            .with("ticket", ticket.as_str())
            .with("secondary_asset", self.config.news.secondary_asset.as_str())
            .with("current_date", now.format("%Y-%m-%d %H:%M:%S UTC").to_string());

        let result = crew.kickoff(run_id, &inputs).await?;
        info!(
            "📰 [PIPELINE] Run {} produced {} task output(s)",
            run_id,
            result.outputs.len()
        );
        Ok(result)
    }
}
