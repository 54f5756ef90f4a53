//! HTTP route handlers.
//!
//! All endpoints return JSON. The aggregator is shared via `Arc`.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::aggregator::{AggregatorStats, NewsAggregator};
use crate::sentiment::SentimentSummary;
use crate::types::{NewsError, NewsQuery, NewsResponse};

pub type AppState = Arc<NewsAggregator>;

/// Edge caching hint for `/api/news`; the in-process cache covers 60s.
pub const NEWS_CACHE_CONTROL: &str = "s-maxage=30, stale-while-revalidate=30";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Raw `/api/news` query string. Numbers arrive as text so that junk
/// values fall back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct NewsParams {
    pub q: Option<String>,
    /// Comma-separated symbols.
    pub tickers: Option<String>,
    /// Comma-separated provider names or domains.
    #[serde(alias = "source")]
    pub sources: Option<String>,
    #[serde(rename = "sinceMinutes", alias = "since_minutes")]
    pub since_minutes: Option<String>,
    pub limit: Option<String>,
}

impl NewsParams {
    pub fn into_query(self) -> NewsQuery {
        NewsQuery {
            q: self.q,
            tickers: self.tickers.as_deref().map(NewsQuery::split_list).unwrap_or_default(),
            sources: self.sources.as_deref().map(NewsQuery::split_list).unwrap_or_default(),
            since_minutes: parse_int(self.since_minutes.as_deref()),
            limit: parse_int(self.limit.as_deref()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<String>,
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .map(|n| n.trunc() as i64)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub s: String,
    pub error: String,
}

/// Contract errors mapped onto status codes.
pub struct ApiError(NewsError);

impl From<NewsError> for ApiError {
    fn from(e: NewsError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            NewsError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            NewsError::InvalidQuery(_) | NewsError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        let body = ErrorBody {
            s: "error".to_string(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/news
pub async fn get_news(
    State(state): State<AppState>,
    Query(params): Query<NewsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.aggregate(&params.into_query()).await?;
    Ok(([(header::CACHE_CONTROL, NEWS_CACHE_CONTROL)], Json(resp)))
}

/// GET /api/news/sentiment
pub async fn get_sentiment(
    State(state): State<AppState>,
    Query(params): Query<NewsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let summary: SentimentSummary = state.sentiment(&params.into_query()).await?;
    Ok(([(header::CACHE_CONTROL, NEWS_CACHE_CONTROL)], Json(summary)))
}

/// GET /api/news/provider/:name
pub async fn get_provider_news(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<NewsResponse>, ApiError> {
    let resp = state.headlines(&name, parse_int(params.limit.as_deref())).await?;
    Ok(Json(resp))
}

/// GET /api/news/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<AggregatorStats> {
    Json(state.stats())
}

/// GET /api/news/providers
pub async fn get_providers(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.provider_names())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
