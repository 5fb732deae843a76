use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::contract::Trend;
use crate::error::PipelineError;

/// Operator-supplied asset symbol. Only guaranteed to be non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Ticket(String);

impl Ticket {
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::Validation(
                "Please fill in the ticket field".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Daily bars for one symbol, oldest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            symbol: symbol.into(),
            start,
            end,
            bars,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// First close to last close, in percent.
    pub fn net_change_pct(&self) -> Option<f64> {
        let first = self.bars.first()?.close;
        let last = self.bars.last()?.close;
        if first <= 0.0 {
            return None;
        }
        Some((last - first) / first * 100.0)
    }

    pub fn trend(&self, sideways_band_pct: f64) -> Option<Trend> {
        let change = self.net_change_pct()?;
        Some(if change > sideways_band_pct {
            Trend::Up
        } else if change < -sideways_band_pct {
            Trend::Down
        } else {
            Trend::Sideways
        })
    }

    /// Summary plus head/tail rows, sized for a model prompt.
    pub fn to_observation(&self, sideways_band_pct: f64, sample_rows: usize) -> String {
        if self.bars.is_empty() {
            return format!(
                "No price data available for {} between {} and {}.",
                self.symbol, self.start, self.end
            );
        }

        let mut out = format!(
            "Price history for {} from {} to {} ({} trading days)\n",
            self.symbol,
            self.start,
            self.end,
            self.bars.len()
        );
        if let (Some(first), Some(last)) = (self.bars.first(), self.bars.last()) {
            out.push_str(&format!(
                "First close: {:.2} on {} | Last close: {:.2} on {}\n",
                first.close, first.date, last.close, last.date
            ));
        }
        let high = self.bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let low = self.bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        out.push_str(&format!("Window high: {high:.2} | Window low: {low:.2}\n"));
        if let (Some(change), Some(trend)) = (self.net_change_pct(), self.trend(sideways_band_pct)) {
            out.push_str(&format!(
                "Net change: {change:+.2}% (computed trend: {trend}, sideways band +/-{sideways_band_pct}%)\n"
            ));
        }

        out.push_str("Date | Open | High | Low | Close | Volume\n");
        let n = self.bars.len();
        for (i, bar) in self.bars.iter().enumerate() {
            if n > sample_rows * 2 && i == sample_rows {
                out.push_str("...\n");
            }
            if n > sample_rows * 2 && i >= sample_rows && i < n - sample_rows {
                continue;
            }
            out.push_str(&format!(
                "{} | {:.2} | {:.2} | {:.2} | {:.2} | {}\n",
                bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
            ));
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsResult {
    pub headline: String,
    pub snippet: String,
    pub source: String,
    pub url: Option<String>,
    pub date: Option<String>,
}

pub fn format_news(query: &str, results: &[NewsResult]) -> String {
    if results.is_empty() {
        return format!("No recent news found for {query}.");
    }
    let mut out = format!("Recent news for {query} ({} results):\n", results.len());
    for (i, item) in results.iter().enumerate() {
        let date = item.date.as_deref().unwrap_or("undated");
        out.push_str(&format!(
            "{}. [{}, {}] {}: {}\n",
            i + 1,
            item.source,
            date,
            item.headline,
            item.snippet
        ));
    }
    out
}
