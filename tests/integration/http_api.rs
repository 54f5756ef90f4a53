//! HTTP API tests against an in-process router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use newsdesk::aggregator::AggregatorStats;
use newsdesk::sentiment::{SentimentLabel, SentimentSummary};
use newsdesk::server::build_router;
use newsdesk::types::{NewsItem, NewsResponse};

use crate::mock_provider::{build, fast_settings, minutes_ago, MockProvider};

fn app() -> axum::Router {
    let reuters = MockProvider::new(
        "Reuters",
        vec![
            NewsItem::new("Reuters", "Apple beats estimates", "https://www.reuters.com/a", minutes_ago(5))
                .with_tickers(["AAPL"]),
            NewsItem::new("Reuters", "Oil slumps", "https://www.reuters.com/b", minutes_ago(10)),
            NewsItem::new("Reuters", "Old news", "https://www.reuters.com/c", minutes_ago(600)),
        ],
    );
    let broken = MockProvider::failing("Finnhub", "HTTP 429");
    let (agg, _) = build(vec![reuters, broken], vec![], fast_settings());
    build_router(Arc::new(agg))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    (status, headers, body.to_vec())
}

#[tokio::test]
async fn test_news_endpoint_shape_and_headers() {
    let (status, headers, body) = get(app(), "/api/news").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "s-maxage=30, stale-while-revalidate=30"
    );

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["s"], "ok");
    assert_eq!(json["items"].as_array().unwrap().len(), 3);
    assert!(json["items"][0]["pubDate"].is_string());
    assert!(json["note"].as_str().unwrap().contains("Finnhub"));
}

#[tokio::test]
async fn test_news_endpoint_query_params() {
    let (status, _, body) = get(app(), "/api/news?tickers=aapl&sinceMinutes=60&limit=5").await;
    assert_eq!(status, StatusCode::OK);
    let resp: NewsResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(resp.items.len(), 1);
    assert_eq!(resp.items[0].title, "Apple beats estimates");
    assert_eq!(resp.items[0].tickers.as_deref(), Some(&["AAPL".to_string()][..]));
}

#[tokio::test]
async fn test_news_endpoint_ignores_junk_limit() {
    let (status, _, body) = get(app(), "/api/news?limit=banana&q=oil").await;
    assert_eq!(status, StatusCode::OK);
    let resp: NewsResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(resp.items.len(), 1);
    assert_eq!(resp.items[0].title, "Oil slumps");
}

#[tokio::test]
async fn test_provider_endpoint() {
    let (status, _, body) = get(app(), "/api/news/provider/reuters?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let resp: NewsResponse = serde_json::from_slice(&body).unwrap();
    let titles: Vec<&str> = resp.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Apple beats estimates", "Oil slumps"]);
}

#[tokio::test]
async fn test_provider_endpoint_unknown_is_404() {
    let (status, _, body) = get(app(), "/api/news/provider/bogus").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["s"], "error");
}

#[tokio::test]
async fn test_providers_and_stats_endpoints() {
    let app = app();
    let (_, _, body) = get(app.clone(), "/api/news/providers").await;
    let names: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(names, vec!["Reuters", "Finnhub"]);

    get(app.clone(), "/api/news").await;
    get(app.clone(), "/api/news").await;

    let (status, _, body) = get(app, "/api/news/stats").await;
    assert_eq!(status, StatusCode::OK);
    let stats: AggregatorStats = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.provider_failures, 1);
}

#[tokio::test]
async fn test_health() {
    let (status, _, _) = get(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_out_of_range_since_minutes_is_ignored() {
    for uri in ["/api/news?sinceMinutes=1e18", "/api/news?sinceMinutes=1000000000000"] {
        let (status, _, body) = get(app(), uri).await;
        assert_eq!(status, StatusCode::OK);
        let resp: NewsResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.items.len(), 3);
    }
}

#[tokio::test]
async fn test_sentiment_endpoint() {
    let (status, headers, body) = get(app(), "/api/news/sentiment").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::CACHE_CONTROL).is_some());

    let summary: SentimentSummary = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary.s, "ok");
    assert_eq!(summary.count, 3);
    assert_eq!(summary.label, SentimentLabel::Neutral);
    assert!(summary.score > 0.0 && summary.score < 0.2);
    assert_eq!(summary.top_tickers, vec!["AAPL"]);
    assert_eq!(summary.top_negative, vec!["SLUMP"]);
    assert!(summary.note.unwrap().contains("Finnhub"));

    let (_, _, body) = get(app(), "/api/news/sentiment?tickers=aapl").await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["label"], "Bullish");
    assert_eq!(json["topPositive"][0], "BEAT");
}
