//! Yahoo Finance price history client

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use time::OffsetDateTime;
use tracing::{info, warn};
use yahoo_finance_api as yahoo;

use super::models::{PriceBar, PriceSeries};
use super::{DataResult, PriceProvider};
use crate::error::DataError;

/// Daily quote history through `yahoo_finance_api`.
pub struct YahooFinanceClient {
    provider: yahoo::YahooConnector,
}

impl YahooFinanceClient {
    pub fn new() -> DataResult<Self> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| DataError::Provider(format!("Yahoo connector: {e}")))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl PriceProvider for YahooFinanceClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_price_series(
        &self,
        ticket: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DataResult<PriceSeries> {
        info!("📈 [YAHOO] Fetching {} history {} -> {}", ticket, start, end);

        let response = match self
            .provider
            .get_quote_history(ticket, utc_midnight(start)?, utc_midnight(end)?)
            .await
        {
            Ok(response) => response,
            Err(e) => return series_or_error(ticket, start, end, e),
        };
        let quotes = match response.quotes() {
            Ok(quotes) => quotes,
            Err(e) => return series_or_error(ticket, start, end, e),
        };

        let series = PriceSeries::new(ticket, start, end, bars_from_quotes(&quotes));
        info!("📈 [YAHOO] {} bars for {}", series.len(), ticket);
        Ok(series)
    }
}

/// Window bounds are whole days at 00:00 UTC.
fn utc_midnight(date: NaiveDate) -> DataResult<OffsetDateTime> {
    let timestamp = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| DataError::Parse(format!("invalid date {date}")))?;
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| DataError::Parse(format!("invalid timestamp for {date}: {e}")))
}

pub fn bars_from_quotes(quotes: &[yahoo::Quote]) -> Vec<PriceBar> {
    quotes
        .iter()
        .filter_map(|q| {
            let timestamp = i64::try_from(q.timestamp).ok()?;
            Some(PriceBar {
                date: DateTime::from_timestamp(timestamp, 0)?.date_naive(),
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
            })
        })
        .collect()
}

/// An empty window is a valid answer; a 404 means Yahoo does not know the symbol.
pub fn series_or_error(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    err: yahoo::YahooError,
) -> DataResult<PriceSeries> {
    if let yahoo::YahooError::EmptyDataSet = err {
        return Ok(PriceSeries::new(symbol, start, end, Vec::new()));
    }

    let detail = match &err {
        yahoo::YahooError::FetchFailed(status) => status.clone(),
        other => other.to_string(),
    };
    if detail.contains("404") || detail.to_lowercase().contains("not found") {
        return Err(DataError::UnknownSymbol(symbol.to_string()));
    }

    warn!("⚠️ [YAHOO] {} for {}", detail, symbol);
    Err(DataError::Provider(detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn quote(timestamp: i64, close: f64) -> yahoo::Quote {
        yahoo::Quote {
            timestamp: timestamp.try_into().unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            volume: 60_276_900,
            close,
            adjclose: close,
        }
    }

    #[test]
    fn test_window_bounds_are_utc_midnight() {
        assert_eq!(utc_midnight(date("2022-08-08")).unwrap().unix_timestamp(), 1659916800);
        assert_eq!(utc_midnight(date("2024-08-08")).unwrap().unix_timestamp(), 1723075200);
    }

    #[test]
    fn test_bars_from_quotes_use_trading_day() {
        // 13:30 UTC is the US market open
        let bars = bars_from_quotes(&[quote(1659965400, 164.92), quote(1660138200, 169.24)]);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date("2022-08-08"));
        assert_eq!(bars[1].date, date("2022-08-10"));
        assert_eq!(bars[1].close, 169.24);
        assert_eq!(bars[1].volume, 60_276_900);
    }

    #[test]
    fn test_empty_data_set_is_an_empty_series() {
        let series = series_or_error(
            "AAPL",
            date("2022-08-08"),
            date("2024-08-08"),
            yahoo::YahooError::EmptyDataSet,
        )
        .unwrap();
        assert!(series.is_empty());
        assert_eq!(series.symbol, "AAPL");
    }

    #[test]
    fn test_not_found_is_unknown_symbol() {
        let err = series_or_error(
            "ZZZZ",
            date("2022-08-08"),
            date("2024-08-08"),
            yahoo::YahooError::FetchFailed("404 Not Found".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::UnknownSymbol(s) if s == "ZZZZ"));

        let err = series_or_error(
            "AAPL",
            date("2022-08-08"),
            date("2024-08-08"),
            yahoo::YahooError::FetchFailed("500 Internal Server Error".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::Provider(_)));
    }
}
