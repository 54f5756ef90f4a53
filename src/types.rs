//! Shared types for NEWSDESK.
//!
//! `NewsItem` is the only type that crosses the provider boundary.
//! Provider-specific payload shapes stay private to each adapter.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// NewsItem
// ---------------------------------------------------------------------------

/// A single headline from any upstream provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// `<domain-or-source>::<normalised title>`, see [`canonical_id`].
    pub id: String,
    pub title: String,
    pub link: String,
    /// Always a valid instant; unparseable upstream dates become fetch time.
    #[serde(rename = "pubDate")]
    pub pub_date: DateTime<Utc>,
    /// Human-readable outlet name ("Reuters", "SEC", "MarketWatch").
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickers: Option<Vec<String>>,
    /// Clamped to [-1, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f64>,
}

impl NewsItem {
    /// Build an item, deriving its id from `(link domain or source, title)`.
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
        pub_date: DateTime<Utc>,
    ) -> Self {
        let source = source.into();
        let title = title.into();
        let link = link.into();
        Self {
            id: canonical_id(&link, &title, &source),
            title,
            link,
            pub_date,
            source,
            tickers: None,
            sentiment: None,
        }
    }

    /// Attach ticker tags. Symbols are trimmed and uppercased; an empty
    /// list leaves the item untagged.
    pub fn with_tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let tags: Vec<String> = tickers
            .into_iter()
            .map(|t| t.as_ref().trim().to_uppercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();
        self.tickers = if tags.is_empty() { None } else { Some(tags) };
        self
    }

    /// Attach a provider sentiment score. Non-finite values are dropped.
    pub fn with_sentiment(mut self, sentiment: Option<f64>) -> Self {
        self.sentiment = sentiment.and_then(clamp_sentiment);
        self
    }

    /// Link host without a leading `www.`, or empty if the link is not a URL.
    pub fn domain(&self) -> String {
        domain_of(&self.link)
    }

    /// Dedup key recomputed from the current contents.
    pub fn dedup_key(&self) -> String {
        canonical_id(&self.link, &self.title, &self.source)
    }

    /// Whether any of this item's tickers is in `wanted`.
    pub fn has_any_ticker(&self, wanted: &[String]) -> bool {
        self.tickers
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| wanted.contains(t)))
    }
}

impl fmt::Display for NewsItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({})",
            self.source,
            self.title,
            self.pub_date.to_rfc3339()
        )
    }
}

/// Clamp a sentiment score into [-1, 1]; NaN and infinities are rejected.
pub fn clamp_sentiment(x: f64) -> Option<f64> {
    if x.is_finite() {
        Some(x.clamp(-1.0, 1.0))
    } else {
        None
    }
}

/// Host part of a URL with `www.` stripped. Returns "" for non-URLs.
pub fn domain_of(link: &str) -> String {
    let Ok(url) = Url::parse(link.trim()) else {
        return String::new();
    };
    let host = url.host_str().unwrap_or_default().to_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Lowercase a title and collapse all whitespace runs to a single space.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable identity for dedup: `(link domain or source, normalised title)`.
pub fn canonical_id(link: &str, title: &str, source: &str) -> String {
    let domain = domain_of(link);
    let scope = if domain.is_empty() {
        source.trim().to_lowercase()
    } else {
        domain
    };
    format!("{}::{}", scope, normalize_title(title))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// An incoming request, before canonicalisation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsQuery {
    pub q: Option<String>,
    pub tickers: Vec<String>,
    pub sources: Vec<String>,
    pub since_minutes: Option<i64>,
    pub limit: Option<i64>,
}

impl NewsQuery {
    /// Query with only a ticker filter.
    pub fn tickers<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Split a comma-separated request parameter into trimmed, non-empty parts.
    pub fn split_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Bounds applied while canonicalising a query.
#[derive(Debug, Clone, Copy)]
pub struct QueryLimits {
    pub default_limit: usize,
    pub max_limit: usize,
    pub max_tickers: usize,
    pub max_sources: usize,
    pub max_query_len: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 80,
            max_limit: 300,
            max_tickers: 50,
            max_sources: 20,
            max_query_len: 256,
        }
    }
}

/// Normalised, bounded query. Doubles as the result-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalQuery {
    pub q: String,
    pub tickers: Vec<String>,
    /// Lowercased, sorted, deduped.
    pub sources: Vec<String>,
    pub since_minutes: Option<i64>,
    pub limit: usize,
}

impl CanonicalQuery {
    pub fn from_query(query: &NewsQuery, limits: &QueryLimits) -> Self {
        let q: String = query
            .q
            .as_deref()
            .unwrap_or_default()
            .trim()
            .chars()
            .take(limits.max_query_len)
            .collect();

        let limit = match query.limit {
            Some(n) => n.clamp(1, limits.max_limit.max(1) as i64) as usize,
            None => limits.default_limit.clamp(1, limits.max_limit.max(1)),
        };

        let mut seen = HashSet::new();
        let tickers: Vec<String> = query
            .tickers
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .take(limits.max_tickers)
            .collect();

        let mut sources: Vec<String> = query
            .sources
            .iter()
            .map(|s| s.trim().to_lowercase())
            .map(|s| s.strip_prefix("www.").map(str::to_string).unwrap_or(s))
            .filter(|s| !s.is_empty())
            .collect();
        sources.sort();
        sources.dedup();
        sources.truncate(limits.max_sources);

        let since_minutes = query.since_minutes.filter(|m| *m > 0);

        Self {
            q,
            tickers,
            sources,
            since_minutes,
            limit,
        }
    }

    /// Deterministic cache key.
    pub fn cache_key(&self) -> String {
        format!(
            "q={}|t={}|s={}|since={}|limit={}",
            self.q,
            self.tickers.join(","),
            self.sources.join(","),
            self.since_minutes.map(|m| m.to_string()).unwrap_or_default(),
            self.limit
        )
    }

    /// Whether an item passes the source allow-list (name or link domain).
    pub fn allows_source(&self, item: &NewsItem) -> bool {
        if self.sources.is_empty() {
            return true;
        }
        let domain = item.domain();
        self.sources
            .iter()
            .any(|s| s.eq_ignore_ascii_case(item.source.trim()) || (!domain.is_empty() && *s == domain))
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// What callers receive: always a well-formed `items` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsResponse {
    pub s: String,
    pub items: Vec<NewsItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl NewsResponse {
    pub fn ok(items: Vec<NewsItem>, note: Option<String>) -> Self {
        Self {
            s: "ok".to_string(),
            items,
            note,
        }
    }

    pub fn empty() -> Self {
        Self::ok(Vec::new(), None)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Contract errors. Upstream failures never surface through this type.
#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
