//! News aggregation pipeline.
//!
//! `aggregate` canonicalises the query, serves from the result cache when
//! possible, and otherwise fans out to every primary provider at once
//! (settle-all: each provider either contributes items or nothing). When
//! the merged pool is implausibly small a second, bounded pass runs
//! against the fallback feeds. The pool is then sentiment-backfilled,
//! filtered, deduplicated, ranked, truncated and cached.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::join_all;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::{MemoryCache, ResultCache};
use crate::clock::{Clock, SystemClock};
use crate::config::{AggregatorConfig, AppConfig};
use crate::providers::{settle, FetchParams, NewsProvider, ProviderSet};
use crate::ranking::Ranker;
use crate::sentiment::{summarize, Lexicon, SentimentSummary};
use crate::types::{
    clamp_sentiment, normalize_title, CanonicalQuery, NewsError, NewsItem, NewsQuery, NewsResponse,
};

/// Per-provider headline endpoint bounds.
const HEADLINES_DEFAULT_LIMIT: usize = 40;
const HEADLINES_MAX_LIMIT: usize = 200;

/// Counters exposed on the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub provider_failures: u64,
    pub fallback_passes: u64,
}

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    provider_failures: AtomicU64,
    fallback_passes: AtomicU64,
}

/// Items merged from one fan-out, plus the names of providers that failed.
struct Pass {
    items: Vec<NewsItem>,
    failed: Vec<String>,
}

pub struct NewsAggregator {
    providers: ProviderSet,
    cache: Arc<dyn ResultCache>,
    clock: Arc<dyn Clock>,
    lexicon: Lexicon,
    ranker: Ranker,
    settings: AggregatorConfig,
    counters: Counters,
}

impl NewsAggregator {
    pub fn new(providers: ProviderSet, cache: Arc<dyn ResultCache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            providers,
            cache,
            clock,
            lexicon: Lexicon::default(),
            ranker: Ranker::default(),
            settings: AggregatorConfig::default(),
            counters: Counters::default(),
        }
    }

    pub fn with_settings(mut self, settings: AggregatorConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_ranker(mut self, ranker: Ranker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    /// Wire providers, an in-memory cache and the system clock from config.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, NewsError> {
        let providers = ProviderSet::from_config(cfg).map_err(|e| NewsError::Config(format!("{e:#}")))?;
        let ttl = ChronoDuration::try_seconds(cfg.cache.ttl_secs)
            .filter(|ttl| *ttl > ChronoDuration::zero())
            .ok_or_else(|| NewsError::Config(format!("cache.ttl_secs out of range: {}", cfg.cache.ttl_secs)))?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let mut cache = MemoryCache::new(ttl, clock.clone());
        if let Some(max) = cfg.cache.max_entries {
            cache = cache.with_max_entries(max);
        }

        info!(
            providers = ?providers.names(),
            fallback = providers.fallback.len(),
            ttl_secs = cfg.cache.ttl_secs,
            "Aggregator configured"
        );

        Ok(Self::new(providers, Arc::new(cache), clock)
            .with_settings(cfg.aggregator.clone())
            .with_ranker(Ranker::new(cfg.ranking.clone()))
            .with_lexicon(cfg.sentiment.clone()))
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.names()
    }

    pub fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            provider_failures: self.counters.provider_failures.load(Ordering::Relaxed),
            fallback_passes: self.counters.fallback_passes.load(Ordering::Relaxed),
        }
    }

    /// Run the full pipeline for one query.
    ///
    /// Upstream trouble never surfaces as an error: the result may be
    /// empty and carry a `note`. Only a query that cannot be turned into a
    /// matcher is rejected.
    pub async fn aggregate(&self, query: &NewsQuery) -> Result<NewsResponse, NewsError> {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);

        let canonical = CanonicalQuery::from_query(query, &self.settings.query_limits());
        let matcher = text_matcher(&canonical.q)?;
        let key = canonical.cache_key();

        if let Some(hit) = self.cache.get(&key) {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, age_ms = hit.age.num_milliseconds(), "Serving cached result");
            return Ok(hit.response);
        }

        let now = self.clock.now();
        let mut params = FetchParams::new(now);
        params.query = (!canonical.q.is_empty()).then(|| canonical.q.clone());
        params.tickers = canonical.tickers.clone();

        // 1. Primary fan-out
        let timeout = Duration::from_secs(self.settings.provider_timeout_secs);
        let Pass { mut items, mut failed } = self.fan_out(&self.providers.primary, &params, timeout).await;

        // 2. Fallback pass when coverage is thin
        let mut fallback_ran = false;
        if items.len() < self.settings.min_results && !self.providers.fallback.is_empty() {
            debug!(count = items.len(), min = self.settings.min_results, "Thin result set, running fallback pass");
            tokio::time::sleep(Duration::from_millis(self.settings.fallback_delay_ms)).await;
            let timeout = Duration::from_secs(self.settings.fallback_timeout_secs);
            let extra = self.fan_out(&self.providers.fallback, &params, timeout).await;
            items.extend(extra.items);
            failed.extend(extra.failed);
            fallback_ran = true;
            self.counters.fallback_passes.fetch_add(1, Ordering::Relaxed);
        }
        let fetched = items.len();

        // 3. Sentiment backfill
        for item in &mut items {
            item.sentiment = item
                .sentiment
                .and_then(clamp_sentiment)
                .or_else(|| clamp_sentiment(self.lexicon.score(&item.title)));
        }

        // 4. Filters
        let items = apply_filters(items, &canonical, matcher.as_ref(), now);
        let filtered = items.len();

        // 5. Dedup, rank, truncate
        let items = dedup(items);
        let mut items = self.ranker.rank(items, now, &canonical.tickers);
        items.truncate(canonical.limit);

        info!(
            fetched,
            filtered,
            returned = items.len(),
            failed = failed.len(),
            fallback = fallback_ran,
            "Aggregation complete"
        );

        let response = NewsResponse::ok(items, degradation_note(&failed, fallback_ran));
        self.cache.set(key, response.clone());
        Ok(response)
    }

    /// Recency-weighted mood over the headlines `aggregate` returns for
    /// `query`. Shares its cache entry and degradation note.
    pub async fn sentiment(&self, query: &NewsQuery) -> Result<SentimentSummary, NewsError> {
        let resp = self.aggregate(query).await?;
        let mut summary = summarize(&resp.items, &self.lexicon, self.clock.now());
        summary.note = resp.note;
        Ok(summary)
    }

    /// Latest headlines from one named provider, deduplicated by title and
    /// sorted newest first. Not cached.
    pub async fn headlines(&self, provider: &str, limit: Option<i64>) -> Result<NewsResponse, NewsError> {
        let p = self
            .providers
            .find(provider)
            .ok_or_else(|| NewsError::UnknownProvider(provider.trim().to_string()))?;
        self.counters.requests.fetch_add(1, Ordering::Relaxed);

        let limit = limit
            .map(|n| n.clamp(1, HEADLINES_MAX_LIMIT as i64) as usize)
            .unwrap_or(HEADLINES_DEFAULT_LIMIT);
        let params = FetchParams::new(self.clock.now());
        let timeout = Duration::from_secs(self.settings.provider_timeout_secs);

        let settled = settle(p.as_ref(), &params, timeout).await;
        if settled.failed {
            self.counters.provider_failures.fetch_add(1, Ordering::Relaxed);
        }

        let mut seen = HashSet::new();
        let mut items: Vec<NewsItem> = settled
            .items
            .into_iter()
            .filter(|i| seen.insert(normalize_title(&i.title)))
            .map(|mut i| {
                i.sentiment = i.sentiment.and_then(clamp_sentiment);
                i
            })
            .collect();
        items.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        items.truncate(limit);

        let failed = if settled.failed { vec![settled.provider] } else { Vec::new() };
        Ok(NewsResponse::ok(items, degradation_note(&failed, false)))
    }

    async fn fan_out(&self, providers: &[Arc<dyn NewsProvider>], params: &FetchParams, timeout: Duration) -> Pass {
        let settled = join_all(providers.iter().map(|p| settle(p.as_ref(), params, timeout))).await;

        let mut pass = Pass {
            items: Vec::new(),
            failed: Vec::new(),
        };
        for s in settled {
            if s.failed {
                self.counters.provider_failures.fetch_add(1, Ordering::Relaxed);
                pass.failed.push(s.provider);
            } else {
                pass.items.extend(s.items);
            }
        }
        pass
    }
}

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// Case-insensitive literal matcher for `q`; `None` when `q` is empty.
fn text_matcher(q: &str) -> Result<Option<Regex>, NewsError> {
    if q.is_empty() {
        return Ok(None);
    }
    RegexBuilder::new(&regex::escape(q))
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| NewsError::InvalidQuery(e.to_string()))
}

/// Text, ticker, source and recency filters, in that order.
fn apply_filters(
    items: Vec<NewsItem>,
    query: &CanonicalQuery,
    matcher: Option<&Regex>,
    now: DateTime<Utc>,
) -> Vec<NewsItem> {
    let cutoff = query.since_minutes.and_then(|m| recency_cutoff(now, m));

    items
        .into_iter()
        .filter(|i| {
            matcher.map_or(true, |re| {
                re.is_match(&i.title) || re.is_match(&i.source) || re.is_match(&i.link)
            })
        })
        .filter(|i| query.tickers.is_empty() || i.has_any_ticker(&query.tickers))
        .filter(|i| query.allows_source(i))
        .filter(|i| cutoff.map_or(true, |c| i.pub_date >= c))
        .collect()
}

/// Oldest admissible publish time for a `sinceMinutes` window. A window
/// reaching past the representable date range means no cutoff.
fn recency_cutoff(now: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
    ChronoDuration::try_minutes(minutes).and_then(|window| now.checked_sub_signed(window))
}

/// Drop later items whose canonical key was already seen.
fn dedup(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.dedup_key())).collect()
}

fn degradation_note(failed: &[String], fallback_ran: bool) -> Option<String> {
    let mut parts = Vec::new();
    if !failed.is_empty() {
        parts.push(format!("providers unavailable: {}", failed.join(", ")));
    }
    if fallback_ran {
        parts.push("fallback feeds used".to_string());
    }
    (!parts.is_empty()).then(|| parts.join("; "))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
