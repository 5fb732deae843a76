pub mod models;
pub mod news;
pub mod yahoo;

#[cfg(test)]
mod models_tests;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::DataError;
use models::{NewsResult, PriceSeries};

pub type DataResult<T> = Result<T, DataError>;

/// Historical daily prices. An unknown window yields an empty series, not an error.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_price_series(
        &self,
        ticket: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DataResult<PriceSeries>;
}

/// Recent news search. Ordering is whatever the backend returns.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search_news(&self, query: &str, max_results: usize) -> DataResult<Vec<NewsResult>>;
}
