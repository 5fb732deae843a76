use chrono::{NaiveDate, TimeDelta};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::constants;
use crate::crew::Process;
use crate::error::{PipelineError, Result};

pub const CONFIG_PATH_ENV: &str = "NEWSLETTER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: constants::server::DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: constants::llm::DEFAULT_MODEL.to_string(),
        }
    }
}

// Keeps the key out of logs.
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl LlmConfig {
    /// The model service cannot be used without credentials.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(PipelineError::Config(
                "OPENAI_API_KEY is not configured (set llm.api_key or the environment variable)"
                    .to_string(),
            )),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// When set, the window ends today and starts this many days earlier.
    pub lookback_days: Option<i64>,
    pub sideways_band_pct: f64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            start_date: parse_default_date(constants::price::DEFAULT_START_DATE),
            end_date: parse_default_date(constants::price::DEFAULT_END_DATE),
            lookback_days: None,
            sideways_band_pct: constants::price::DEFAULT_SIDEWAYS_BAND_PCT,
        }
    }
}

impl PriceConfig {
    /// Effective (start, end) window for a run happening on `today`.
    pub fn window(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let Some(days) = self.lookback_days else {
            return Ok((self.start_date, self.end_date));
        };
        TimeDelta::try_days(days)
            .and_then(|lookback| today.checked_sub_signed(lookback))
            .map(|start| (start, today))
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "price.lookback_days ({days}) reaches outside the calendar"
                ))
            })
    }
}

fn parse_default_date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap_or_default()
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub max_results: usize,
    pub secondary_asset: String,
    pub region: String,
    pub base_url: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            max_results: constants::news::DEFAULT_MAX_RESULTS,
            secondary_asset: constants::news::SECONDARY_ASSET.to_string(),
            region: constants::news::DEFAULT_REGION.to_string(),
            base_url: constants::news::DUCKDUCKGO_URL.to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub process: Process,
    pub manager_max_iterations: usize,
    pub call_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            process: Process::Hierarchical,
            manager_max_iterations: constants::pipeline::DEFAULT_MANAGER_MAX_ITERATIONS,
            call_timeout_secs: constants::pipeline::DEFAULT_CALL_TIMEOUT.as_secs(),
        }
    }
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub price: PriceConfig,
    pub news: NewsConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load `config.yaml` (or `$NEWSLETTER_CONFIG`) and apply environment overrides.
    ///
    /// A missing file falls back to defaults; a malformed one is an error.
    pub fn load() -> Result<Self> {
        let env = environment();
        let path = env
            .iter()
            .rev()
            .find(|(k, _)| k == CONFIG_PATH_ENV)
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| PipelineError::Config(format!("Failed to read {path}: {e}")))?;
            Self::from_yaml(&content)?
        } else {
            info!("ℹ️ {} not found - using built-in defaults", path);
            Self::default()
        };

        config.apply_env_overrides(env);
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Later pairs win, so pass `.env` values before the real environment.
    pub fn apply_env_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "OPENAI_API_KEY" => self.llm.api_key = Some(value),
                "OPENAI_BASE_URL" | "OPENAI_API_BASE" => self.llm.base_url = Some(value),
                "OPENAI_MODEL_NAME" => self.llm.model = value,
                "NEWSLETTER_BIND" => self.server.bind = value,
                _ => {}
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.price.lookback_days.is_none() && self.price.start_date >= self.price.end_date {
            return Err(PipelineError::Config(format!(
                "price.start_date ({}) must be before price.end_date ({})",
                self.price.start_date, self.price.end_date
            )));
        }
        if let Some(days) = self.price.lookback_days {
            if !(1..=constants::price::MAX_LOOKBACK_DAYS).contains(&days) {
                return Err(PipelineError::Config(format!(
                    "price.lookback_days must be between 1 and {}",
                    constants::price::MAX_LOOKBACK_DAYS
                )));
            }
        }
        if self.news.max_results == 0 {
            return Err(PipelineError::Config(
                "news.max_results must be at least 1".to_string(),
            ));
        }
        if self.news.secondary_asset.trim().is_empty() {
            return Err(PipelineError::Config(
                "news.secondary_asset must not be empty".to_string(),
            ));
        }
        if self.pipeline.manager_max_iterations == 0 {
            return Err(PipelineError::Config(
                "pipeline.manager_max_iterations must be at least 1".to_string(),
            ));
        }
        if self.pipeline.call_timeout_secs == 0 {
            return Err(PipelineError::Config(
                "pipeline.call_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// `.env` pairs followed by the process environment. Nothing is written back.
pub fn environment() -> Vec<(String, String)> {
    let mut vars: Vec<(String, String)> = dotenvy::dotenv_iter()
        .map(|iter| iter.filter_map(std::result::Result::ok).collect())
        .unwrap_or_default();
    vars.extend(std::env::vars());
    vars
}
