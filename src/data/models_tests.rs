//! Unit tests for tickets, price series and news formatting.

#[cfg(test)]
mod models_tests {
    use crate::contract::Trend;
    use crate::data::models::*;
    use crate::error::PipelineError;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn bar(d: &str, close: f64) -> PriceBar {
        PriceBar {
            date: date(d),
            open: close - 1.0,
            high: close + 2.0,
            low: close - 2.0,
            close,
            volume: 1_000,
        }
    }

    fn series(closes: &[(&str, f64)]) -> PriceSeries {
        PriceSeries::new(
            "AAPL",
            date("2022-08-08"),
            date("2024-08-08"),
            closes.iter().map(|(d, c)| bar(d, *c)).collect(),
        )
    }

    // ============= Ticket Tests =============

    #[test]
    fn test_ticket_trims_whitespace() {
        let ticket = Ticket::parse("  AAPL ").unwrap();
        assert_eq!(ticket.as_str(), "AAPL");
        assert_eq!(ticket.to_string(), "AAPL");
    }

    #[test]
    fn test_ticket_rejects_empty() {
        assert!(matches!(Ticket::parse(""), Err(PipelineError::Validation(_))));
        assert!(matches!(Ticket::parse("   \t"), Err(PipelineError::Validation(_))));
    }

    // ============= PriceSeries Tests =============

    #[test]
    fn test_series_sorted_oldest_first() {
        let s = series(&[("2023-01-03", 120.0), ("2022-08-08", 100.0), ("2024-08-07", 150.0)]);
        let dates: Vec<_> = s.bars.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![date("2022-08-08"), date("2023-01-03"), date("2024-08-07")]);
    }

    #[test]
    fn test_net_change_and_trend() {
        let up = series(&[("2022-08-08", 100.0), ("2024-08-07", 150.0)]);
        assert_eq!(up.net_change_pct(), Some(50.0));
        assert_eq!(up.trend(2.0), Some(Trend::Up));

        let down = series(&[("2022-08-08", 100.0), ("2024-08-07", 80.0)]);
        assert_eq!(down.trend(2.0), Some(Trend::Down));

        let flat = series(&[("2022-08-08", 100.0), ("2024-08-07", 101.0)]);
        assert_eq!(flat.trend(2.0), Some(Trend::Sideways));
    }

    #[test]
    fn test_empty_series_has_no_trend() {
        let empty = series(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty.trend(2.0), None);
        let text = empty.to_observation(2.0, 5);
        assert!(text.contains("No price data available for AAPL"));
    }

    #[test]
    fn test_observation_samples_head_and_tail() {
        let closes: Vec<(String, f64)> = (1..=20)
            .map(|d| (format!("2023-01-{d:02}"), 100.0 + d as f64))
            .collect();
        let refs: Vec<(&str, f64)> = closes.iter().map(|(d, c)| (d.as_str(), *c)).collect();
        let s = series(&refs);

        let text = s.to_observation(2.0, 3);
        assert!(text.contains("20 trading days"));
        assert!(text.contains("computed trend: UP"));
        assert!(text.contains("2023-01-01"));
        assert!(text.contains("2023-01-20"));
        assert!(text.contains("..."));
        assert!(!text.contains("2023-01-10"));
    }

    // ============= News Formatting Tests =============

    #[test]
    fn test_format_news_lists_results() {
        let results = vec![NewsResult {
            headline: "Apple beats estimates".to_string(),
            snippet: "Revenue rose 5%".to_string(),
            source: "Reuters".to_string(),
            url: None,
            date: Some("2024-08-01".to_string()),
        }];
        let text = format_news("AAPL", &results);
        assert!(text.contains("1 results"));
        assert!(text.contains("[Reuters, 2024-08-01] Apple beats estimates: Revenue rose 5%"));
    }

    #[test]
    fn test_format_news_empty() {
        assert_eq!(format_news("BTC", &[]), "No recent news found for BTC.");
    }
}
