//! Marketaux news provider.
//!
//! API: `https://api.marketaux.com/v1/news/all`
//! Auth: `api_token` query param. Free tier: 100 req/day, 3 articles/req.
//!
//! Entities carry per-symbol sentiment; the article score is the explicit
//! `sentiment` field when present, else the mean of the entity scores.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::http::{build_client, lenient_f64, query_string, send_json};
use super::{FetchParams, NewsProvider};
use crate::config::{AppConfig, MarketauxConfig};
use crate::feed::{date_or_now, decode_entities};
use crate::types::NewsItem;

const NAME: &str = "Marketaux";
const MAX_API_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct MxResponse {
    #[serde(default)]
    data: Vec<MxArticle>,
}

#[derive(Debug, Deserialize)]
struct MxArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    sentiment: Option<f64>,
    #[serde(default)]
    entities: Vec<MxEntity>,
}

#[derive(Debug, Deserialize)]
struct MxEntity {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    sentiment_score: Option<f64>,
}

pub struct MarketauxProvider {
    http: Client,
    api_key: Option<SecretString>,
    base_url: String,
    limit: usize,
    lookback: ChronoDuration,
}

impl MarketauxProvider {
    pub fn new(
        api_key: Option<SecretString>,
        base_url: String,
        limit: usize,
        lookback_hours: i64,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let lookback = ChronoDuration::try_hours(lookback_hours.max(1))
            .ok_or_else(|| anyhow!("{NAME}: lookback_hours out of range: {lookback_hours}"))?;
        Ok(Self {
            http: build_client(NAME, timeout, user_agent)?,
            api_key,
            base_url,
            limit,
            lookback,
        })
    }

    pub fn from_config(cfg: &MarketauxConfig, timeout: Duration, user_agent: &str) -> Result<Self> {
        Self::new(
            AppConfig::resolve_secret(&cfg.api_key_env),
            cfg.base_url.clone(),
            cfg.limit,
            cfg.lookback_hours,
            timeout,
            user_agent,
        )
    }

    fn build_url(&self, key: &str, params: &FetchParams) -> String {
        let mut pairs = vec![
            ("languages", "en".to_string()),
            ("countries", "us".to_string()),
            ("limit", params.max_items.min(MAX_API_LIMIT).to_string()),
            ("filter_entities", "true".to_string()),
        ];
        // A window older than chrono can represent is no window at all.
        if let Some(after) = params.now.checked_sub_signed(self.lookback) {
            pairs.push(("published_after", after.format("%Y-%m-%dT%H:%M").to_string()));
        }
        if !params.tickers.is_empty() {
            pairs.push(("symbols", params.tickers.join(",")));
        }
        pairs.push(("api_token", key.to_string()));
        format!("{}?{}", self.base_url, query_string(&pairs))
    }

    fn map_response(resp: MxResponse, now: DateTime<Utc>) -> Vec<NewsItem> {
        resp.data
            .into_iter()
            .filter_map(|a| {
                let title = decode_entities(a.title.as_deref().unwrap_or_default());
                if title.is_empty() {
                    return None;
                }

                let scores: Vec<f64> = a.entities.iter().filter_map(|e| e.sentiment_score).collect();
                let sentiment = a.sentiment.or_else(|| {
                    (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64)
                });
                let tickers: Vec<String> = a.entities.into_iter().filter_map(|e| e.symbol).collect();
                let source = a
                    .source
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| NAME.to_string());

                Some(
                    NewsItem::new(
                        source,
                        title,
                        a.url.unwrap_or_default(),
                        date_or_now(a.published_at.as_deref(), now),
                    )
                    .with_tickers(tickers)
                    .with_sentiment(sentiment),
                )
            })
            .collect()
    }
}

#[async_trait]
impl NewsProvider for MarketauxProvider {
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
        let resp: MxResponse = send_json(self.http.get(&url), NAME).await?;
        Ok(Self::map_response(resp, params.now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_map_articles() {
        let json = r#"{
            "meta": {"found": 2},
            "data": [
                {
                    "uuid": "5a1c",
                    "title": "Nvidia guidance lifts chip stocks",
                    "url": "https://www.cnbc.com/2026/03/02/nvidia.html",
                    "published_at": "2026-03-02T13:45:00.000000Z",
                    "source": "cnbc.com",
                    "entities": [
                        {"symbol": "NVDA", "sentiment_score": 0.6},
                        {"symbol": "AMD", "sentiment_score": 0.2}
                    ]
                },
                {
                    "uuid": "77ef",
                    "title": "Retail sales slip",
                    "url": "https://example.com/retail",
                    "published_at": null,
                    "sentiment": "-0.3",
                    "entities": []
                }
            ]
        }"#;
        let resp: MxResponse = serde_json::from_str(json).unwrap();
        let items = MarketauxProvider::map_response(resp, now());
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].source, "cnbc.com");
        assert_eq!(items[0].tickers, Some(vec!["NVDA".to_string(), "AMD".to_string()]));
        assert!((items[0].sentiment.unwrap() - 0.4).abs() < 1e-9);
        assert_eq!(items[0].pub_date, Utc.with_ymd_and_hms(2026, 3, 2, 13, 45, 0).unwrap());
        assert_eq!(items[0].id, "cnbc.com::nvidia guidance lifts chip stocks");

        assert_eq!(items[1].source, "Marketaux");
        assert_eq!(items[1].sentiment, Some(-0.3));
        assert_eq!(items[1].pub_date, now());
        assert!(items[1].tickers.is_none());
    }

    #[test]
    fn test_no_sentiment_anywhere() {
        let resp: MxResponse =
            serde_json::from_str(r#"{"data": [{"title": "Quiet day", "entities": [{"symbol": "SPY"}]}]}"#).unwrap();
        let items = MarketauxProvider::map_response(resp, now());
        assert_eq!(items[0].sentiment, None);
    }

    #[test]
    fn test_build_url_has_lookback_and_symbols() {
        let cfg = MarketauxConfig::default();
        let p = MarketauxProvider::new(None, cfg.base_url, cfg.limit, 48, Duration::from_secs(1), "test").unwrap();
        let mut params = FetchParams::new(now()).with_max_items(60);
        params.tickers = vec!["NVDA".into()];
        let url = p.build_url("tok", &params);
        assert!(url.contains("limit=50"));
        assert!(url.contains("published_after=2026-02-28T15%3A00"));
        assert!(url.contains("symbols=NVDA"));
        assert!(url.ends_with("api_token=tok"));
    }

    #[test]
    fn test_lookback_out_of_range() {
        let cfg = MarketauxConfig::default();
        let t = Duration::from_secs(1);
        assert!(MarketauxProvider::new(None, cfg.base_url.clone(), cfg.limit, i64::MAX, t, "test").is_err());

        let wide = MarketauxProvider::new(None, cfg.base_url, cfg.limit, 2_000_000_000_000, t, "test").unwrap();
        let url = wide.build_url("tok", &FetchParams::new(now()));
        assert!(!url.contains("published_after"));
    }
}
