//! Finnhub general market news.
//!
//! API: `https://finnhub.io/api/v1/news?category=general`
//! Auth: `token` query param. Returns a bare JSON array, newest first.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::http::{build_client, epoch_or_now, query_string, send_json};
use super::{FetchParams, NewsProvider};
use crate::config::{AppConfig, FinnhubConfig};
use crate::feed::decode_entities;
use crate::types::NewsItem;

const NAME: &str = "Finnhub";

#[derive(Debug, Deserialize)]
struct FhArticle {
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    url: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    datetime: i64,
    #[serde(default)]
    source: Option<String>,
    /// Comma-separated symbols, often empty.
    #[serde(default)]
    related: Option<String>,
}

pub struct FinnhubProvider {
    http: Client,
    api_key: Option<SecretString>,
    base_url: String,
    category: String,
    limit: usize,
}

impl FinnhubProvider {
    pub fn new(
        api_key: Option<SecretString>,
        base_url: String,
        category: String,
        limit: usize,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        Ok(Self {
            http: build_client(NAME, timeout, user_agent)?,
            api_key,
            base_url,
            category,
            limit,
        })
    }

    pub fn from_config(cfg: &FinnhubConfig, timeout: Duration, user_agent: &str) -> Result<Self> {
        Self::new(
            AppConfig::resolve_secret(&cfg.api_key_env),
            cfg.base_url.clone(),
            cfg.category.clone(),
            cfg.limit,
            timeout,
            user_agent,
        )
    }

    fn map_articles(articles: Vec<FhArticle>, now: DateTime<Utc>) -> Vec<NewsItem> {
        articles
            .into_iter()
            .filter_map(|a| {
                let title = decode_entities(a.headline.as_deref().unwrap_or_default());
                if title.is_empty() {
                    return None;
                }
                let related = a.related.unwrap_or_default();
                let source = a
                    .source
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| NAME.to_string());
                Some(
                    NewsItem::new(source, title, a.url.unwrap_or_default(), epoch_or_now(a.datetime, now))
                        .with_tickers(related.split(',')),
                )
            })
            .collect()
    }
}

#[async_trait]
impl NewsProvider for FinnhubProvider {
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

        let url = format!(
            "{}?{}",
            self.base_url,
            query_string(&[
                ("category", self.category.clone()),
                ("token", key.expose_secret().clone()),
            ])
        );
        let articles: Vec<FhArticle> = send_json(self.http.get(&url), NAME).await?;
        let mut items = Self::map_articles(articles, params.now);
        items.truncate(params.max_items);
        Ok(items)
    }
}
