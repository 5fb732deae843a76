use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{clean_input, Tool};
use crate::constants;
use crate::data::models::PriceSeries;
use crate::data::PriceProvider;
use crate::error::DataError;

/// Historical prices for a ticket over a fixed window.
pub struct PriceHistoryTool {
    provider: Arc<dyn PriceProvider>,
    start: NaiveDate,
    end: NaiveDate,
    sideways_band_pct: f64,
    timeout: Duration,
    description: String,
}

impl PriceHistoryTool {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        start: NaiveDate,
        end: NaiveDate,
        sideways_band_pct: f64,
        timeout: Duration,
    ) -> Self {
        let description = format!(
            "Fetches daily stock prices (open, high, low, close, volume) for a ticket from {start} to {end}. Input: the ticket symbol, e.g. AAPL."
        );
        Self {
            provider,
            start,
            end,
            sideways_band_pct,
            timeout,
            description,
        }
    }

    /// Raw series, with timeouts reported as `DataError::Timeout`.
    pub async fn fetch(&self, ticket: &str) -> Result<PriceSeries, DataError> {
        tokio::time::timeout(
            self.timeout,
            self.provider.fetch_price_series(ticket, self.start, self.end),
        )
        .await
        .map_err(|_| DataError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl Tool for PriceHistoryTool {
    fn name(&self) -> &str {
        "stock_price_history"
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, input: &str) -> String {
        let ticket = clean_input(input);
        if ticket.is_empty() {
            return "No ticket given; provide a symbol such as AAPL.".to_string();
        }

        info!("🛠️ [TOOL] {} <- {}", self.name(), ticket);
        match self.fetch(&ticket).await {
            Ok(series) => series.to_observation(self.sideways_band_pct, constants::price::SAMPLE_ROWS),
            Err(e) => {
                warn!("⚠️ [TOOL] Price data unavailable for {}: {}", ticket, e);
                format!(
                    "Price data unavailable for {ticket} ({} provider): {e}. Report that the price trend could not be determined from data.",
                    self.provider.name()
                )
            }
        }
    }
}
