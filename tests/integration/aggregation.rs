//! End-to-end aggregation behaviour against mock providers.

use chrono::Duration;

use newsdesk::config::AggregatorConfig;
use newsdesk::types::{NewsItem, NewsQuery};

use crate::mock_provider::{build, fast_settings, minutes_ago, t0, MockProvider};

fn item(source: &str, title: &str, link: &str, age_min: i64) -> NewsItem {
    NewsItem::new(source, title, link, minutes_ago(age_min))
}

#[tokio::test]
async fn test_second_call_within_ttl_hits_cache() {
    let p = MockProvider::new(
        "A",
        vec![
            item("Reuters", "Fed cuts rates", "https://reuters.com/a", 5),
            item("SEC", "8-K ACME", "https://sec.gov/b", 10),
        ],
    );
    let (agg, clock) = build(vec![p.clone()], vec![], fast_settings());
    let query = NewsQuery { q: Some("a".into()), ..Default::default() };

    let first = agg.aggregate(&query).await.unwrap();
    clock.advance(Duration::seconds(30));
    p.set_items(vec![item("Reuters", "Something else entirely", "https://reuters.com/z", 0)]);
    let second = agg.aggregate(&query).await.unwrap();

    assert_eq!(p.calls(), 1);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(agg.stats().cache_hits, 1);
    assert_eq!(agg.stats().requests, 2);
}

#[tokio::test]
async fn test_cache_expires_after_ttl() {
    let p = MockProvider::new("A", vec![item("Reuters", "Fed cuts rates", "", 5)]);
    let (agg, clock) = build(vec![p.clone()], vec![], fast_settings());

    agg.aggregate(&NewsQuery::default()).await.unwrap();
    clock.advance(Duration::seconds(61));
    agg.aggregate(&NewsQuery::default()).await.unwrap();
    assert_eq!(p.calls(), 2);
}

#[tokio::test]
async fn test_equivalent_queries_share_cache_entry() {
    let p = MockProvider::new("A", vec![item("Reuters", "Fed cuts rates", "", 5)]);
    let (agg, _) = build(vec![p.clone()], vec![], fast_settings());

    let a = NewsQuery { sources: vec!["SEC".into(), "Reuters".into()], ..Default::default() };
    let b = NewsQuery { sources: vec!["reuters".into(), " sec ".into()], ..Default::default() };
    agg.aggregate(&a).await.unwrap();
    agg.aggregate(&b).await.unwrap();
    assert_eq!(p.calls(), 1);
}

#[tokio::test]
async fn test_duplicates_across_providers_collapse() {
    let a = MockProvider::new("A", vec![item("Reuters", "Fed cuts rates", "", 0)]);
    let b = MockProvider::new("B", vec![item("Reuters", "fed cuts rates", "", 1)]);
    let (agg, _) = build(vec![a, b], vec![], fast_settings());

    let resp = agg.aggregate(&NewsQuery::default()).await.unwrap();
    assert_eq!(resp.items.len(), 1);
    assert_eq!(resp.items[0].title, "Fed cuts rates");
}

#[tokio::test]
async fn test_result_ids_are_unique() {
    let a = MockProvider::new(
        "A",
        vec![
            item("Reuters", "Oil jumps", "https://www.reuters.com/1", 3),
            item("Reuters", "Oil  JUMPS", "https://reuters.com/2", 4),
            item("Bloomberg", "Oil jumps", "https://bloomberg.com/1", 3),
        ],
    );
    let b = MockProvider::new("B", vec![item("Wire", "oil jumps", "https://reuters.com/3", 9)]);
    let (agg, _) = build(vec![a, b], vec![], fast_settings());

    let resp = agg.aggregate(&NewsQuery::default()).await.unwrap();
    let mut ids: Vec<&str> = resp.items.iter().map(|i| i.id.as_str()).collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert_eq!(total, 2);
}

#[tokio::test]
async fn test_ticker_filter() {
    let p = MockProvider::new(
        "A",
        vec![
            item("Benzinga", "Big tech rallies", "https://x.com/1", 1).with_tickers(["AAPL", "MSFT"]),
            item("Benzinga", "EV maker slides", "https://x.com/2", 1).with_tickers(["TSLA"]),
            item("Benzinga", "Untagged macro note", "https://x.com/3", 1),
        ],
    );
    let (agg, _) = build(vec![p], vec![], fast_settings());

    let resp = agg.aggregate(&NewsQuery::tickers(["aapl"])).await.unwrap();
    assert_eq!(resp.items.len(), 1);
    assert_eq!(resp.items[0].title, "Big tech rallies");
    let wanted = vec!["AAPL".to_string()];
    assert!(resp.items.iter().all(|i| i.has_any_ticker(&wanted)));
}

#[tokio::test]
async fn test_recency_window() {
    let p = MockProvider::new(
        "A",
        vec![
            item("Reuters", "Two hours old", "", 120),
            item("Reuters", "Half an hour old", "", 30),
        ],
    );
    let (agg, _) = build(vec![p], vec![], fast_settings());

    let resp = agg
        .aggregate(&NewsQuery { since_minutes: Some(60), ..Default::default() })
        .await
        .unwrap();
    let titles: Vec<&str> = resp.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Half an hour old"]);
}

#[tokio::test]
async fn test_source_filter_by_name_or_domain() {
    let p = MockProvider::new(
        "A",
        vec![
            item("SEC", "Form 4 filed", "https://www.sec.gov/x", 1),
            item("Wire", "Reuters via wire", "https://www.reuters.com/y", 1),
            item("Yahoo", "Yahoo story", "https://finance.yahoo.com/z", 1),
        ],
    );
    let (agg, _) = build(vec![p], vec![], fast_settings());

    let resp = agg
        .aggregate(&NewsQuery { sources: vec!["sec".into(), "reuters.com".into()], ..Default::default() })
        .await
        .unwrap();
    assert_eq!(resp.items.len(), 2);
    assert!(resp.items.iter().all(|i| i.source != "Yahoo"));
}

#[tokio::test]
async fn test_text_query_matches_case_insensitively() {
    let p = MockProvider::new(
        "A",
        vec![
            item("Reuters", "NVIDIA unveils new chip", "https://reuters.com/1", 1),
            item("Reuters", "Gold steady", "https://reuters.com/2", 1),
        ],
    );
    let (agg, _) = build(vec![p], vec![], fast_settings());

    let resp = agg
        .aggregate(&NewsQuery { q: Some("nvidia".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(resp.items.len(), 1);
    assert_eq!(resp.items[0].title, "NVIDIA unveils new chip");
}

#[tokio::test]
async fn test_limit_and_sentiment_invariants() {
    let items: Vec<NewsItem> = (0..40)
        .map(|i| {
            item("Reuters", &format!("Headline number {i} surges"), "", i)
                .with_sentiment(if i % 2 == 0 { Some(5.0) } else { None })
        })
        .collect();
    let p = MockProvider::new("A", items);
    let (agg, _) = build(vec![p], vec![], fast_settings());

    let resp = agg
        .aggregate(&NewsQuery { limit: Some(7), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(resp.items.len(), 7);
    for i in &resp.items {
        let s = i.sentiment.expect("every item carries sentiment");
        assert!((-1.0..=1.0).contains(&s));
    }

    let resp = agg
        .aggregate(&NewsQuery { limit: Some(10_000), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(resp.items.len(), 40);
}

#[tokio::test]
async fn test_failing_and_hanging_providers_are_tolerated() {
    let good = MockProvider::new("Good", vec![item("Reuters", "Markets steady", "", 1)]);
    let broken = MockProvider::failing("Broken", "HTTP 503");
    let slow = MockProvider::hanging("Slow", vec![item("Slow", "Never arrives", "", 1)]);
    let (agg, _) = build(vec![good, broken, slow], vec![], fast_settings());

    let resp = agg.aggregate(&NewsQuery::default()).await.unwrap();
    assert_eq!(resp.s, "ok");
    assert_eq!(resp.items.len(), 1);
    assert_eq!(resp.items[0].title, "Markets steady");

    let note = resp.note.expect("degraded result carries a note");
    assert!(note.contains("Broken"));
    assert!(note.contains("Slow"));
    assert_eq!(agg.stats().provider_failures, 2);
}

#[tokio::test]
async fn test_empty_upstream_yields_empty_items() {
    let a = MockProvider::new("A", vec![]);
    let b = MockProvider::failing("B", "connection refused");
    let (agg, _) = build(vec![a, b], vec![], fast_settings());

    let resp = agg.aggregate(&NewsQuery::default()).await.unwrap();
    assert!(resp.items.is_empty());
}

#[tokio::test]
async fn test_fallback_pass_runs_when_results_are_thin() {
    let primary = MockProvider::new("Primary", vec![item("Reuters", "Only one story", "", 1)]);
    let mw = MockProvider::new(
        "MarketWatch",
        vec![item("MarketWatch", "Fallback story", "https://www.marketwatch.com/a", 2)],
    );
    let settings = AggregatorConfig {
        min_results: 10,
        fallback_delay_ms: 5,
        ..fast_settings()
    };
    let (agg, _) = build(vec![primary], vec![mw.clone()], settings);

    let resp = agg.aggregate(&NewsQuery::default()).await.unwrap();
    assert_eq!(mw.calls(), 1);
    assert_eq!(resp.items.len(), 2);
    assert_eq!(resp.note.as_deref(), Some("fallback feeds used"));
    assert_eq!(agg.stats().fallback_passes, 1);
}

#[tokio::test]
async fn test_fallback_skipped_when_results_are_plentiful() {
    let items: Vec<NewsItem> = (0..12).map(|i| item("Reuters", &format!("Story {i}"), "", i)).collect();
    let primary = MockProvider::new("Primary", items);
    let mw = MockProvider::new("MarketWatch", vec![item("MarketWatch", "Fallback", "", 1)]);
    let settings = AggregatorConfig { min_results: 10, ..fast_settings() };
    let (agg, _) = build(vec![primary], vec![mw.clone()], settings);

    let resp = agg.aggregate(&NewsQuery::default()).await.unwrap();
    assert_eq!(mw.calls(), 0);
    assert!(resp.note.is_none());
}

#[tokio::test]
async fn test_newer_item_ranks_first_under_equal_trust() {
    let p = MockProvider::new(
        "A",
        vec![
            item("Reuters", "Older neutral story", "https://reuters.com/1", 90),
            item("Reuters", "Newer neutral story", "https://reuters.com/2", 10),
        ],
    );
    let (agg, _) = build(vec![p], vec![], fast_settings());

    let resp = agg.aggregate(&NewsQuery::default()).await.unwrap();
    assert_eq!(resp.items[0].title, "Newer neutral story");
    assert_eq!(resp.items[1].title, "Older neutral story");
}

#[tokio::test]
async fn test_ticker_filter_accepts_any_overlap() {
    let p = MockProvider::new(
        "A",
        vec![
            item("Reuters", "Newer untagged story", "https://reuters.com/1", 0),
            item("Reuters", "Slightly older apple story", "https://reuters.com/2", 20).with_tickers(["AAPL", "MSFT"]),
            item("Reuters", "Older msft story", "https://reuters.com/3", 30).with_tickers(["MSFT"]),
        ],
    );
    let (agg, _) = build(vec![p], vec![], fast_settings());

    let resp = agg.aggregate(&NewsQuery::tickers(["AAPL", "MSFT"])).await.unwrap();
    assert_eq!(resp.items.len(), 2);
    assert_eq!(resp.items[0].title, "Slightly older apple story");
}

#[tokio::test]
async fn test_future_dated_items_are_kept() {
    let p = MockProvider::new("A", vec![NewsItem::new("Reuters", "Embargoed", "", t0() + Duration::minutes(5))]);
    let (agg, _) = build(vec![p], vec![], fast_settings());

    let resp = agg
        .aggregate(&NewsQuery { since_minutes: Some(10), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(resp.items.len(), 1);
}

#[tokio::test]
async fn test_huge_recency_window_keeps_everything() {
    let p = MockProvider::new(
        "A",
        vec![
            item("Reuters", "Fresh", "", 5),
            item("Reuters", "Ancient", "", 60 * 24 * 365 * 30),
        ],
    );
    let (agg, _) = build(vec![p], vec![], fast_settings());

    for minutes in [1_000_000_000_000, i64::MAX] {
        let resp = agg
            .aggregate(&NewsQuery { since_minutes: Some(minutes), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(resp.items.len(), 2);
    }
}
