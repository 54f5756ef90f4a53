//! Shared HTTP plumbing for provider adapters.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::feed;

/// Build a client whose every request is bounded by `timeout`.
pub fn build_client(provider: &str, timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .with_context(|| format!("Failed to build {provider} HTTP client"))
}

/// Send a request and decode a JSON body. Non-2xx statuses are errors.
pub async fn send_json<T: DeserializeOwned>(req: RequestBuilder, provider: &str) -> Result<T> {
    let resp = req
        .send()
        .await
        .with_context(|| format!("{provider} request failed"))?;
    let status = resp.status();
    if !status.is_success() {
        bail!("{provider} returned HTTP {status}");
    }
    resp.json::<T>()
        .await
        .with_context(|| format!("Failed to parse {provider} response"))
}

/// Send a request and return the body as text. Non-2xx statuses are errors.
pub async fn send_text(req: RequestBuilder, provider: &str) -> Result<String> {
    let resp = req
        .send()
        .await
        .with_context(|| format!("{provider} request failed"))?;
    let status = resp.status();
    if !status.is_success() {
        bail!("{provider} returned HTTP {status}");
    }
    resp.text()
        .await
        .with_context(|| format!("Failed to read {provider} response body"))
}

/// Build `key=value&...` with each value percent-encoded.
pub fn query_string(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

/// Number or numeric string -> `f64`; anything else -> `None`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// String or number -> `String`; null or other shapes -> `None`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Timestamp from a date string or unix epoch (seconds or milliseconds).
/// Falls back to `now`.
pub fn timestamp_or_now(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };
    if let Ok(epoch) = raw.parse::<i64>() {
        return epoch_or_now(epoch, now);
    }
    feed::date_or_now(Some(raw), now)
}

/// Unix epoch (seconds, or milliseconds past 1e12) -> instant. Zero or
/// out-of-range values become `now`.
pub fn epoch_or_now(epoch: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    if epoch <= 0 {
        return now;
    }
    let millis = if epoch >= 1_000_000_000_000 {
        epoch
    } else {
        epoch.saturating_mul(1000)
    };
    Utc.timestamp_millis_opt(millis).single().unwrap_or(now)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
