//! Application-wide constants and defaults
//!
//! Values here back the `config.yaml` defaults and the fixed roles of the
//! newsletter crew.

use std::time::Duration;

/// Price window and trend classification
pub mod price {
    /// Start of the historical window (inclusive)
    pub const DEFAULT_START_DATE: &str = "2022-08-08";

    /// End of the historical window (exclusive, matches the provider's period2)
    pub const DEFAULT_END_DATE: &str = "2024-08-08";

    /// Net close-to-close moves inside +/- this percentage count as SIDEWAYS
    pub const DEFAULT_SIDEWAYS_BAND_PCT: f64 = 2.0;

    /// Rows shown from each end of the series in tool observations
    pub const SAMPLE_ROWS: usize = 5;

    /// Longest relative window, about a century of daily bars
    pub const MAX_LOOKBACK_DAYS: i64 = 36_500;
}

/// News search
pub mod news {
    pub const DEFAULT_MAX_RESULTS: usize = 10;

    /// Always researched alongside the requested ticket
    pub const SECONDARY_ASSET: &str = "BTC";

    pub const DUCKDUCKGO_URL: &str = "https://duckduckgo.com";

    pub const DEFAULT_REGION: &str = "wt-wt";
}

/// Language model
pub mod llm {
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
}

/// Crew coordination
pub mod pipeline {
    use super::Duration;

    pub const DEFAULT_MANAGER_MAX_ITERATIONS: usize = 15;

    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

    /// Characters of each finished output shown to the manager
    pub const MANAGER_PREVIEW_CHARS: usize = 400;

    pub const PRICE_ANALYST_MAX_ITER: usize = 5;
    pub const NEWS_ANALYST_MAX_ITER: usize = 10;
    pub const NEWSLETTER_WRITER_MAX_ITER: usize = 5;
}

/// HTTP shell
pub mod server {
    pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
}

/// Desktop browser agent; the news backend rejects the default reqwest agent
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
