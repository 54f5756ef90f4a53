//! Bloomberg headlines through a licensed proxy.
//!
//! There is no public Bloomberg news API; deployments with a license run a
//! proxy that exposes `GET <BLOOMBERG_PROXY_URL>?limit=&q=&tickers=`
//! returning `{ "items": [{ id, title, link, pubDate, tickers, sentiment }] }`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::http::{build_client, lenient_f64, lenient_string, query_string, send_json, timestamp_or_now};
use super::{FetchParams, NewsProvider};
use crate::config::{AppConfig, BloombergConfig};
use crate::feed::decode_entities;
use crate::types::NewsItem;

const NAME: &str = "Bloomberg";

#[derive(Debug, Deserialize)]
struct BbResponse {
    #[serde(default)]
    items: Vec<BbArticle>,
}

#[derive(Debug, Deserialize)]
struct BbArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default, rename = "pubDate", deserialize_with = "lenient_string")]
    pub_date: Option<String>,
    #[serde(default)]
    tickers: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_f64")]
    sentiment: Option<f64>,
}

pub struct BloombergProvider {
    http: Client,
    proxy_url: Option<String>,
    token: Option<SecretString>,
    limit: usize,
}

impl BloombergProvider {
    pub fn new(
        proxy_url: Option<String>,
        token: Option<SecretString>,
        limit: usize,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        Ok(Self {
            http: build_client(NAME, timeout, user_agent)?,
            proxy_url: proxy_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            token,
            limit,
        })
    }

    pub fn from_config(cfg: &BloombergConfig, timeout: Duration, user_agent: &str) -> Result<Self> {
        Self::new(
            AppConfig::resolve_env(&cfg.proxy_url_env).ok(),
            AppConfig::resolve_secret(&cfg.token_env),
            cfg.limit,
            timeout,
            user_agent,
        )
    }

    fn build_url(proxy_url: &str, params: &FetchParams) -> String {
        let mut pairs = vec![("limit", params.max_items.to_string())];
        if let Some(q) = params.query.as_deref().filter(|q| !q.is_empty()) {
            pairs.push(("q", q.to_string()));
        }
        if !params.tickers.is_empty() {
            pairs.push(("tickers", params.tickers.join(",")));
        }
        let sep = if proxy_url.contains('?') { '&' } else { '?' };
        format!("{proxy_url}{sep}{}", query_string(&pairs))
    }

    fn map_response(resp: BbResponse, now: DateTime<Utc>) -> Vec<NewsItem> {
        resp.items
            .into_iter()
            .filter_map(|a| {
                let title = decode_entities(a.title.as_deref().unwrap_or_default());
                if title.is_empty() {
                    return None;
                }
                Some(
                    NewsItem::new(
                        NAME,
                        title,
                        a.link.unwrap_or_default(),
                        timestamp_or_now(a.pub_date.as_deref(), now),
                    )
                    .with_tickers(a.tickers.unwrap_or_default())
                    .with_sentiment(a.sentiment),
                )
            })
            .collect()
    }
}

#[async_trait]
impl NewsProvider for BloombergProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn max_items(&self) -> usize {
        self.limit
    }

    async fn fetch_items(&self, params: &FetchParams) -> Result<Vec<NewsItem>> {
        let Some(proxy_url) = &self.proxy_url else {
            debug!(provider = NAME, "No proxy configured, skipping");
            return Ok(Vec::new());
        };

        let mut req = self.http.get(Self::build_url(proxy_url, params));
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }
        let resp: BbResponse = send_json(req, NAME).await?;
        Ok(Self::map_response(resp, params.now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_map_response() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap();
        let json = r#"{"items": [
            {"id": "RX1", "title": "Treasury yields climb", "link": "https://www.bloomberg.com/news/a",
             "pubDate": "Mon, 02 Mar 2026 14:10:00 GMT", "tickers": ["TLT"], "sentiment": -0.2},
            {"id": 2, "title": "Yen weakens", "link": "https://www.bloomberg.com/news/b", "pubDate": null},
            {"id": 3, "title": ""}
        ]}"#;
        let resp: BbResponse = serde_json::from_str(json).unwrap();
        let items = BloombergProvider::map_response(resp, now);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source, "Bloomberg");
        assert_eq!(items[0].pub_date, Utc.with_ymd_and_hms(2026, 3, 2, 14, 10, 0).unwrap());
        assert_eq!(items[0].tickers, Some(vec!["TLT".to_string()]));
        assert_eq!(items[0].sentiment, Some(-0.2));
        assert_eq!(items[1].pub_date, now);
        assert_eq!(items[1].id, "bloomberg.com::yen weakens");
    }

    #[test]
    fn test_build_url() {
        let mut params = FetchParams::new(Utc::now()).with_max_items(25);
        params.query = Some("oil price".into());
        params.tickers = vec!["XOM".into()];
        assert_eq!(
            BloombergProvider::build_url("https://proxy.local/bbg", &params),
            "https://proxy.local/bbg?limit=25&q=oil%20price&tickers=XOM"
        );
        assert_eq!(
            BloombergProvider::build_url("https://proxy.local/bbg?feed=top", &params),
            "https://proxy.local/bbg?feed=top&limit=25&q=oil%20price&tickers=XOM"
        );
    }

    #[tokio::test]
    async fn test_no_proxy_returns_empty() {
        let p = BloombergProvider::new(Some("  ".into()), None, 10, Duration::from_secs(1), "test").unwrap();
        assert!(p.fetch_items(&FetchParams::new(Utc::now())).await.unwrap().is_empty());
    }
}
