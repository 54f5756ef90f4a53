//! AlphaVantage news & sentiment provider.
//!
//! API: `https://www.alphavantage.co/query?function=NEWS_SENTIMENT`
//! Auth: API key via `apikey` query param. Free tier: 25 req/day.
//!
//! Supplies an overall sentiment score per article and per-ticker tags.
//! Quota exhaustion comes back as HTTP 200 with an `Information` / `Note`
//! message instead of a feed, which is treated as a failure.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::http::{build_client, lenient_f64, query_string, send_json};
use super::{FetchParams, NewsProvider};
use crate::config::{AlphaVantageConfig, AppConfig};
use crate::feed::{date_or_now, decode_entities};
use crate::types::NewsItem;

const NAME: &str = "AlphaVantage";
/// Hard cap the API accepts for `limit` on this tier.
const MAX_API_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AvResponse {
    #[serde(default)]
    feed: Vec<AvArticle>,
    #[serde(default, rename = "Information")]
    information: Option<String>,
    #[serde(default, rename = "Note")]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AvArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    /// `YYYYMMDDTHHMMSS`, UTC.
    #[serde(default)]
    time_published: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    overall_sentiment_score: Option<f64>,
    #[serde(default)]
    ticker_sentiment: Vec<AvTickerSentiment>,
}

#[derive(Debug, Deserialize)]
struct AvTickerSentiment {
    #[serde(default)]
    ticker: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct AlphaVantageProvider {
    http: Client,
    api_key: Option<SecretString>,
    base_url: String,
    limit: usize,
    topics: Vec<String>,
}

impl AlphaVantageProvider {
    pub fn new(
        api_key: Option<SecretString>,
        base_url: String,
        limit: usize,
        topics: Vec<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        Ok(Self {
            http: build_client(NAME, timeout, user_agent)?,
            api_key,
            base_url,
            limit,
            topics,
        })
    }

    pub fn from_config(cfg: &AlphaVantageConfig, timeout: Duration, user_agent: &str) -> Result<Self> {
        Self::new(
            AppConfig::resolve_secret(&cfg.api_key_env),
            cfg.base_url.clone(),
            cfg.limit,
            cfg.topics.clone(),
            timeout,
            user_agent,
        )
    }

    fn build_url(&self, key: &str, params: &FetchParams) -> String {
        let mut pairs = vec![
            ("function", "NEWS_SENTIMENT".to_string()),
            ("sort", "LATEST".to_string()),
            ("limit", params.max_items.min(MAX_API_LIMIT).to_string()),
        ];
        if !params.tickers.is_empty() {
            pairs.push(("tickers", params.tickers.join(",")));
        }
        if !self.topics.is_empty() {
            pairs.push(("topics", self.topics.join(",")));
        }
        pairs.push(("apikey", key.to_string()));
        format!("{}?{}", self.base_url, query_string(&pairs))
    }

    fn map_response(resp: AvResponse, now: DateTime<Utc>) -> Result<Vec<NewsItem>> {
        if resp.feed.is_empty() {
            if let Some(msg) = resp.information.or(resp.note) {
                bail!("AlphaVantage refused request: {msg}");
            }
        }

        Ok(resp
            .feed
            .into_iter()
            .filter_map(|a| {
                let title = decode_entities(a.title.as_deref().unwrap_or_default());
                if title.is_empty() {
                    return None;
                }
                let tickers: Vec<String> = a
                    .ticker_sentiment
                    .into_iter()
                    .filter_map(|t| t.ticker)
                    .collect();
                let source = a
                    .source
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| NAME.to_string());
                Some(
                    NewsItem::new(
                        source,
                        title,
                        a.url.unwrap_or_default(),
                        date_or_now(a.time_published.as_deref(), now),
                    )
                    .with_tickers(tickers)
                    .with_sentiment(Some(a.overall_sentiment_score.unwrap_or(0.0))),
                )
            })
            .collect())
    }
}

#[async_trait]
impl NewsProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn max_items(&self) -> usize {
        self.limit
    }

    async fn fetch_items(&self, params: &FetchParams) -> Result<Vec<NewsItem>> {
        let Some(key) = &self.api_key else {
            debug!(provider = NAME, "No API key configured, skipping");
            return Ok(Vec::new());
        };

        let url = self.build_url(key.expose_secret(), params);
        let resp: AvResponse = send_json(self.http.get(&url), NAME).await?;
        Self::map_response(resp, params.now)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
