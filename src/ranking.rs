//! Ranking score for aggregated headlines.
//!
//! ```text
//! score = recency * (base + provider_coef * provider_w + domain_coef * domain_w)
//!       + sentiment_coef * |sentiment|
//!       + ticker_bonus            (if item tickers intersect the query)
//!
//! recency = exp(-age_minutes / half_life_minutes)
//! ```
//!
//! Recency gates the trust terms multiplicatively; sentiment strength and
//! ticker relevance are additive bonuses that survive ageing.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::types::NewsItem;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Ranking constants. All values are tunables, only the shape is fixed.
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    /// Decay constant in minutes.
    #[serde(default = "default_half_life")]
    pub half_life_minutes: f64,
    #[serde(default = "default_base")]
    pub base_weight: f64,
    #[serde(default = "default_provider_coef")]
    pub provider_coef: f64,
    #[serde(default = "default_domain_coef")]
    pub domain_coef: f64,
    /// Used when a source name is not in `provider_weights`.
    #[serde(default = "default_unknown_weight")]
    pub default_provider_weight: f64,
    /// Used when a link domain is not in `domain_weights`.
    #[serde(default = "default_unknown_weight")]
    pub default_domain_weight: f64,
    #[serde(default = "default_sentiment_coef")]
    pub sentiment_coef: f64,
    #[serde(default = "default_ticker_bonus")]
    pub ticker_bonus: f64,
    #[serde(default = "default_provider_weights")]
    pub provider_weights: HashMap<String, f64>,
    #[serde(default = "default_domain_weights")]
    pub domain_weights: HashMap<String, f64>,
}

fn default_half_life() -> f64 {
    180.0
}
fn default_base() -> f64 {
    0.7
}
fn default_provider_coef() -> f64 {
    0.2
}
fn default_domain_coef() -> f64 {
    0.1
}
fn default_unknown_weight() -> f64 {
    0.8
}
fn default_sentiment_coef() -> f64 {
    0.2
}
fn default_ticker_bonus() -> f64 {
    0.3
}

fn default_provider_weights() -> HashMap<String, f64> {
    [
        ("AlphaVantage", 1.0),
        ("Marketaux", 0.9),
        ("Finnhub", 0.9),
        ("SEC", 1.1),
        ("MarketWatch", 0.7),
        ("Yahoo", 0.6),
        ("Investing.com", 0.7),
        ("Reuters", 1.15),
        ("Bloomberg", 1.15),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_domain_weights() -> HashMap<String, f64> {
    [
        ("sec.gov", 1.1),
        ("reuters.com", 1.1),
        ("bloomberg.com", 1.1),
        ("marketwatch.com", 0.8),
        ("finance.yahoo.com", 0.7),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            half_life_minutes: default_half_life(),
            base_weight: default_base(),
            provider_coef: default_provider_coef(),
            domain_coef: default_domain_coef(),
            default_provider_weight: default_unknown_weight(),
            default_domain_weight: default_unknown_weight(),
            sentiment_coef: default_sentiment_coef(),
            ticker_bonus: default_ticker_bonus(),
            provider_weights: default_provider_weights(),
            domain_weights: default_domain_weights(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ranker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Exponential recency factor. Future-dated items count as age zero.
    pub fn recency(&self, item: &NewsItem, now: DateTime<Utc>) -> f64 {
        let age_minutes = ((now - item.pub_date).num_milliseconds() as f64 / 60_000.0).max(0.0);
        let half_life = if self.config.half_life_minutes > 0.0 {
            self.config.half_life_minutes
        } else {
            default_half_life()
        };
        (-age_minutes / half_life).exp()
    }

    pub fn provider_weight(&self, source: &str) -> f64 {
        lookup(&self.config.provider_weights, source.trim())
            .unwrap_or(self.config.default_provider_weight)
    }

    pub fn domain_weight(&self, domain: &str) -> f64 {
        if domain.is_empty() {
            return self.config.default_domain_weight;
        }
        lookup(&self.config.domain_weights, domain).unwrap_or(self.config.default_domain_weight)
    }

    /// Full ranking score for one item.
    pub fn score(&self, item: &NewsItem, now: DateTime<Utc>, query_tickers: &[String]) -> f64 {
        let c = &self.config;
        let trust = c.base_weight
            + c.provider_coef * self.provider_weight(&item.source)
            + c.domain_coef * self.domain_weight(&item.domain());

        let sentiment = item
            .sentiment
            .map(|s| c.sentiment_coef * s.abs())
            .unwrap_or(0.0);

        let ticker = if !query_tickers.is_empty() && item.has_any_ticker(query_tickers) {
            c.ticker_bonus
        } else {
            0.0
        };

        self.recency(item, now) * trust + sentiment + ticker
    }

    /// Sort by descending score. Equal scores keep their input order.
    pub fn rank(&self, items: Vec<NewsItem>, now: DateTime<Utc>, query_tickers: &[String]) -> Vec<NewsItem> {
        let mut scored: Vec<(f64, NewsItem)> = items
            .into_iter()
            .map(|item| (self.score(&item, now, query_tickers), item))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(_, item)| item).collect()
    }
}

fn lookup(table: &HashMap<String, f64>, key: &str) -> Option<f64> {
    table
        .get(key)
        .or_else(|| {
            table
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
        .copied()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
