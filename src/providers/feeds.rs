//! RSS / Atom headline feeds: SEC EDGAR, MarketWatch, Yahoo Finance and
//! Investing.com.
//!
//! No credentials. One provider may poll several feed URLs; it only fails
//! when every URL fails.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::RegexSet;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::http::{build_client, send_text};
use super::{FetchParams, NewsProvider};
use crate::config::{FeedConfig, InvestingConfig};
use crate::feed::{date_or_now, parse_feed, FeedEntry};
use crate::types::NewsItem;

pub const SEC_URL: &str = "https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent&output=atom";
pub const MARKETWATCH_URL: &str = "https://feeds.marketwatch.com/marketwatch/topstories/";
pub const YAHOO_URL: &str = "https://feeds.finance.yahoo.com/rss/2.0/headline?s=^GSPC&region=US&lang=en-US";

const RSS_ACCEPT: &str = "application/rss+xml, application/xml;q=0.9, */*;q=0.8";
const ATOM_ACCEPT: &str = "application/atom+xml, application/xml;q=0.9, */*;q=0.8";

/// Market-moving topics for the Investing.com headline filter. Terms match
/// on word boundaries so "fed" skips "Federal" and "war" skips "software".
static IMPORTANT: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)\b(earnings|results|profit|revenue|guidance|outlook)\b",
        r"(?i)\b(merger|acquisition|m&a|deal|buyout)\b",
        r"(?i)\b(ipo|listing|delisting)\b",
        r"(?i)\b(fed|ecb|rate hike|rate cut|interest rate|monetary|central bank)\b",
        r"(?i)\b(inflation|cpi|ppi|jobs|unemployment|payrolls|gdp)\b",
        r"(?i)\b(sanctions|tariff|geopolitics|conflict|war)\b",
        r"(?i)\b(tesla|apple|microsoft|amazon|nvidia|alphabet|meta|saudi aramco|tsmc)\b",
        r"(?i)\b(bankruptcy|insolvency|default|downgrade|credit rating)\b",
        r"(?i)\b(guidance cut|profit warning|restatement)\b",
    ])
    .expect("importance patterns are valid")
});

/// Whether a headline mentions a market-moving topic.
pub fn is_important(title: &str) -> bool {
    IMPORTANT.is_match(title)
}

#[derive(Clone)]
pub struct FeedProvider {
    name: String,
    http: Client,
    urls: Vec<String>,
    accept: &'static str,
    limit: usize,
    important_only: bool,
}

impl FeedProvider {
    pub fn new(
        name: &str,
        urls: Vec<String>,
        accept: &'static str,
        limit: usize,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            http: build_client(name, timeout, user_agent)?,
            urls,
            accept,
            limit,
            important_only: false,
        })
    }

    /// Keep only headlines that pass [`is_important`].
    pub fn important_only(mut self, on: bool) -> Self {
        self.important_only = on;
        self
    }

    /// SEC EDGAR "latest filings" Atom feed. SEC rejects requests without a
    /// contact User-Agent.
    pub fn sec(cfg: &FeedConfig, timeout: Duration, user_agent: &str) -> Result<Self> {
        Self::new("SEC", vec![url_or(cfg, SEC_URL)], ATOM_ACCEPT, cfg.limit, timeout, user_agent)
    }

    pub fn marketwatch(cfg: &FeedConfig, timeout: Duration, user_agent: &str) -> Result<Self> {
        Self::new("MarketWatch", vec![url_or(cfg, MARKETWATCH_URL)], RSS_ACCEPT, cfg.limit, timeout, user_agent)
    }

    pub fn yahoo(cfg: &FeedConfig, timeout: Duration, user_agent: &str) -> Result<Self> {
        Self::new("Yahoo", vec![url_or(cfg, YAHOO_URL)], RSS_ACCEPT, cfg.limit, timeout, user_agent)
    }

    pub fn investing(cfg: &InvestingConfig, timeout: Duration, user_agent: &str) -> Result<Self> {
        let urls = cfg
            .urls
            .iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        Ok(Self::new("Investing.com", urls, RSS_ACCEPT, cfg.limit, timeout, user_agent)?
            .important_only(cfg.important_only))
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Map parsed entries to items. Entries without a title are dropped.
    pub fn map_entries(&self, entries: Vec<FeedEntry>, now: DateTime<Utc>) -> Vec<NewsItem> {
        entries
            .into_iter()
            .filter(|e| !e.title.is_empty())
            .filter(|e| !self.important_only || is_important(&e.title))
            .map(|e| NewsItem::new(self.name.as_str(), e.title, e.link, date_or_now(e.pub_date.as_deref(), now)))
            .collect()
    }

    async fn fetch_one(&self, url: &str, now: DateTime<Utc>) -> Result<Vec<NewsItem>> {
        let body = send_text(self.http.get(url).header(ACCEPT, self.accept), &self.name).await?;
        let entries = parse_feed(&body);
        if entries.is_empty() {
            debug!(provider = %self.name, url, "Feed contained no entries");
        }
        Ok(self.map_entries(entries, now))
    }
}

/// Configured URL, or the built-in one when the config leaves it blank.
fn url_or(cfg: &FeedConfig, default: &str) -> String {
    let url = cfg.url.trim();
    if url.is_empty() {
        default.to_string()
    } else {
        url.to_string()
    }
}

#[async_trait]
impl NewsProvider for FeedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_items(&self) -> usize {
        self.limit
    }

    async fn fetch_items(&self, params: &FetchParams) -> Result<Vec<NewsItem>> {
        if self.urls.is_empty() {
            return Ok(Vec::new());
        }

        let results = join_all(self.urls.iter().map(|url| self.fetch_one(url, params.now))).await;

        let mut items = Vec::new();
        let mut last_err = None;
        let mut ok_count = 0usize;
        for (url, result) in self.urls.iter().zip(results) {
            match result {
                Ok(mut batch) => {
                    ok_count += 1;
                    items.append(&mut batch);
                }
                Err(e) => {
                    if self.urls.len() > 1 {
                        warn!(provider = %self.name, url = %url, error = %e, "Feed failed, continuing with others");
                    }
                    last_err = Some(e);
                }
            }
        }

        if ok_count == 0 {
            return Err(last_err.unwrap_or_else(|| anyhow!("{} returned nothing", self.name)));
        }

        items.truncate(params.max_items);
        Ok(items)
    }
}
