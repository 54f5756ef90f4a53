//! News provider adapters.
//!
//! Defines the `NewsProvider` trait and one implementation per upstream:
//! - AlphaVantage, Marketaux, Finnhub: structured JSON news APIs
//! - Reuters, Bloomberg: licensed JSON feeds behind credentials / a proxy
//! - SEC, MarketWatch, Yahoo, Investing.com: RSS / Atom feeds
//!
//! Adapters return `anyhow::Result` internally; [`settle`] is the boundary
//! that turns every failure (error, non-2xx, bad payload, timeout) into an
//! empty result so nothing crosses into the aggregator.

pub mod alphavantage;
pub mod bloomberg;
pub mod feeds;
pub mod finnhub;
pub mod http;
pub mod marketaux;
pub mod reuters;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::types::NewsItem;

/// Parameter bag handed to every adapter.
#[derive(Debug, Clone)]
pub struct FetchParams {
    /// Upper bound on items this adapter should return.
    pub max_items: usize,
    pub query: Option<String>,
    /// Uppercase symbols, already capped by the aggregator.
    pub tickers: Vec<String>,
    /// Fallback timestamp for items with missing or invalid dates.
    pub now: DateTime<Utc>,
}

impl FetchParams {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            max_items: 50,
            query: None,
            tickers: Vec::new(),
            now,
        }
    }

    pub fn with_max_items(&self, max_items: usize) -> Self {
        Self {
            max_items,
            ..self.clone()
        }
    }
}

/// One upstream news source.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Provider name for logging, stats and the per-provider endpoint.
    fn name(&self) -> &str;

    /// Default item cap for this provider.
    fn max_items(&self) -> usize;

    /// Fetch and map items. Missing credentials yield `Ok(vec![])`.
    async fn fetch_items(&self, params: &FetchParams) -> Result<Vec<NewsItem>>;
}

/// Outcome of one adapter call after the failure boundary.
#[derive(Debug, Clone)]
pub struct Settled {
    pub provider: String,
    pub items: Vec<NewsItem>,
    pub failed: bool,
}

/// Run one adapter under `timeout`. Never fails: errors and timeouts are
/// logged and reported as an empty, `failed` outcome.
pub async fn settle(provider: &dyn NewsProvider, params: &FetchParams, timeout: Duration) -> Settled {
    let name = provider.name().to_string();
    let params = params.with_max_items(provider.max_items());

    match tokio::time::timeout(timeout, provider.fetch_items(&params)).await {
        Ok(Ok(mut items)) => {
            items.truncate(params.max_items);
            debug!(provider = %name, count = items.len(), "Provider returned items");
            Settled {
                provider: name,
                items,
                failed: false,
            }
        }
        Ok(Err(e)) => {
            warn!(provider = %name, error = %format!("{e:#}"), "Provider failed, continuing without");
            Settled {
                provider: name,
                items: Vec::new(),
                failed: true,
            }
        }
        Err(_) => {
            warn!(provider = %name, timeout_ms = timeout.as_millis() as u64, "Provider timed out, continuing without");
            Settled {
                provider: name,
                items: Vec::new(),
                failed: true,
            }
        }
    }
}

/// Providers used for the main fan-out and for the fallback pass.
#[derive(Clone, Default)]
pub struct ProviderSet {
    pub primary: Vec<Arc<dyn NewsProvider>>,
    pub fallback: Vec<Arc<dyn NewsProvider>>,
}

impl ProviderSet {
    pub fn new(primary: Vec<Arc<dyn NewsProvider>>, fallback: Vec<Arc<dyn NewsProvider>>) -> Self {
        Self { primary, fallback }
    }

    /// Build every enabled provider from configuration, resolving
    /// credentials from the environment.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.aggregator.provider_timeout_secs);
        let fallback_timeout = Duration::from_secs(cfg.aggregator.fallback_timeout_secs);
        let ua = cfg.providers.resolved_user_agent();
        let p = &cfg.providers;

        let mut primary: Vec<Arc<dyn NewsProvider>> = Vec::new();

        if p.reuters.enabled {
            primary.push(Arc::new(reuters::ReutersProvider::from_config(&p.reuters, timeout, &ua)?));
        }
        if p.bloomberg.enabled {
            primary.push(Arc::new(bloomberg::BloombergProvider::from_config(&p.bloomberg, timeout, &ua)?));
        }
        if p.alphavantage.enabled {
            primary.push(Arc::new(alphavantage::AlphaVantageProvider::from_config(&p.alphavantage, timeout, &ua)?));
        }
        if p.marketaux.enabled {
            primary.push(Arc::new(marketaux::MarketauxProvider::from_config(&p.marketaux, timeout, &ua)?));
        }
        if p.finnhub.enabled {
            primary.push(Arc::new(finnhub::FinnhubProvider::from_config(&p.finnhub, timeout, &ua)?));
        }
        if p.sec.enabled {
            primary.push(Arc::new(feeds::FeedProvider::sec(&p.sec, timeout, &ua)?));
        }
        if p.marketwatch.enabled {
            primary.push(Arc::new(feeds::FeedProvider::marketwatch(&p.marketwatch, timeout, &ua)?));
        }
        if p.yahoo.enabled {
            primary.push(Arc::new(feeds::FeedProvider::yahoo(&p.yahoo, timeout, &ua)?));
        }
        if p.investing.enabled {
            primary.push(Arc::new(feeds::FeedProvider::investing(&p.investing, timeout, &ua)?));
        }

        let mut fallback: Vec<Arc<dyn NewsProvider>> = Vec::new();
        if p.fallback.enabled {
            let mw = p.marketwatch.clone().with_limit(p.fallback.marketwatch_limit);
            let yh = p.yahoo.clone().with_limit(p.fallback.yahoo_limit);
            fallback.push(Arc::new(feeds::FeedProvider::marketwatch(&mw, fallback_timeout, &ua)?));
            fallback.push(Arc::new(feeds::FeedProvider::yahoo(&yh, fallback_timeout, &ua)?));
        }

        Ok(Self { primary, fallback })
    }

    pub fn names(&self) -> Vec<String> {
        self.primary.iter().map(|p| p.name().to_string()).collect()
    }

    /// Primary provider by case-insensitive name.
    pub fn find(&self, name: &str) -> Option<Arc<dyn NewsProvider>> {
        self.primary
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
