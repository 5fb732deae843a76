//! DuckDuckGo news search client
//!
//! The news endpoint needs a per-query `vqd` token scraped from the regular
//! search page, so every search is two requests.

use async_trait::async_trait;
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;
use url::Url;

use super::models::NewsResult;
use super::{DataResult, NewsProvider};
use crate::constants::USER_AGENT;
use crate::error::DataError;

#[derive(Clone)]
pub struct DuckDuckGoNewsClient {
    client: Client,
    base_url: String,
    region: String,
    timeout: Duration,
}

#[derive(Deserialize, Debug)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<RawNewsItem>,
}

#[derive(Deserialize, Debug)]
struct RawNewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    source: String,
    url: Option<String>,
    date: Option<i64>,
}

impl DuckDuckGoNewsClient {
    pub fn new(base_url: impl Into<String>, region: impl Into<String>, timeout: Duration) -> DataResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            region: region.into(),
            timeout,
        })
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> DataResult<Url> {
        let base = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        Url::parse_with_params(&base, params).map_err(|e| DataError::Parse(e.to_string()))
    }

    async fn get_text(&self, url: Url) -> DataResult<String> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DataError::Timeout(self.timeout)
            } else {
                DataError::Network(e)
            }
        })?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(DataError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl NewsProvider for DuckDuckGoNewsClient {
    fn name(&self) -> &'static str {
        "duckduckgo-news"
    }

    async fn search_news(&self, query: &str, max_results: usize) -> DataResult<Vec<NewsResult>> {
        info!("📰 [DDG] Searching news for '{}'", query);

        let page = self.get_text(self.url("", &[("q", query)])?).await?;
        let vqd = extract_vqd(&page)
            .ok_or_else(|| DataError::Parse("search token (vqd) not found".to_string()))?;

        let url = self.url(
            "news.js",
            &[
                ("l", self.region.as_str()),
                ("o", "json"),
                ("noamp", "1"),
                ("q", query),
                ("vqd", vqd.as_str()),
                ("p", "-1"),
            ],
        )?;
        let body = self.get_text(url).await?;
        let results = parse_news_response(&body, max_results)?;

        info!("📰 [DDG] {} results for '{}'", results.len(), query);
        Ok(results)
    }
}

static VQD_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"vqd=["']?([\d-]+)"#).expect("invalid vqd regex"));

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("invalid tag regex"));

/// Token appears as `vqd="…"`, `vqd='…'` or `vqd=…&` depending on the page variant.
pub fn extract_vqd(html: &str) -> Option<String> {
    VQD_TOKEN.captures(html).map(|caps| caps[1].to_string())
}

pub fn parse_news_response(body: &str, max_results: usize) -> DataResult<Vec<NewsResult>> {
    let response: NewsResponse = serde_json::from_str(body)?;
    Ok(response
        .results
        .into_iter()
        .filter(|item| !item.title.trim().is_empty())
        .take(max_results)
        .map(|item| NewsResult {
            headline: strip_tags(&item.title),
            snippet: strip_tags(&item.excerpt),
            source: item.source,
            url: item.url,
            date: item
                .date
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.format("%Y-%m-%d").to_string()),
        })
        .collect())
}

fn strip_tags(text: &str) -> String {
    HTML_TAG
        .replace_all(text, "")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
