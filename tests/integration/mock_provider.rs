//! Mock news provider for integration testing.
//!
//! A deterministic `NewsProvider` that returns a fixed item list, can be
//! forced to fail or hang, and counts how often it was called.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use newsdesk::aggregator::NewsAggregator;
use newsdesk::cache::MemoryCache;
use newsdesk::clock::ManualClock;
use newsdesk::config::AggregatorConfig;
use newsdesk::providers::{FetchParams, NewsProvider, ProviderSet};
use newsdesk::types::NewsItem;

/// Fixed instant all fixtures are dated against.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap()
}

pub fn minutes_ago(m: i64) -> DateTime<Utc> {
    t0() - Duration::minutes(m)
}

pub struct MockProvider {
    name: String,
    items: Mutex<Vec<NewsItem>>,
    /// If set, every fetch returns this error.
    force_error: Mutex<Option<String>>,
    /// If set, every fetch sleeps this long first.
    delay: Mutex<Option<std::time::Duration>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: &str, items: Vec<NewsItem>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            items: Mutex::new(items),
            force_error: Mutex::new(None),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: &str, msg: &str) -> Arc<Self> {
        let p = Self::new(name, Vec::new());
        p.set_error(msg);
        p
    }

    pub fn hanging(name: &str, items: Vec<NewsItem>) -> Arc<Self> {
        let p = Self::new(name, items);
        *p.delay.lock().unwrap() = Some(std::time::Duration::from_secs(30));
        p
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn set_items(&self, items: Vec<NewsItem>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_items(&self) -> usize {
        100
    }

    async fn fetch_items(&self, _params: &FetchParams) -> Result<Vec<NewsItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        Ok(self.items.lock().unwrap().clone())
    }
}

/// Settings with no fallback threshold and no delays.
pub fn fast_settings() -> AggregatorConfig {
    AggregatorConfig {
        min_results: 0,
        fallback_delay_ms: 0,
        provider_timeout_secs: 1,
        fallback_timeout_secs: 1,
        ..AggregatorConfig::default()
    }
}

/// Aggregator over `primary` and `fallback` with a 60s cache on a manual clock.
pub fn build(
    primary: Vec<Arc<MockProvider>>,
    fallback: Vec<Arc<MockProvider>>,
    settings: AggregatorConfig,
) -> (NewsAggregator, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let cache = Arc::new(MemoryCache::new(Duration::seconds(60), clock.clone()));
    let as_dyn = |ps: Vec<Arc<MockProvider>>| -> Vec<Arc<dyn NewsProvider>> {
        ps.into_iter().map(|p| p as Arc<dyn NewsProvider>).collect()
    };
    let providers = ProviderSet::new(as_dyn(primary), as_dyn(fallback));
    let agg = NewsAggregator::new(providers, cache, clock.clone()).with_settings(settings);
    (agg, clock)
}
