//! Reuters licensed news feed.
//!
//! Endpoint: `<REUTERS_BASE_URL>/news?limit=..&q=..`
//! Auth: OAuth2 client-credentials bearer token when a token URL and client
//! credentials are configured, otherwise a static `x-api-key` header.
//!
//! The response envelope is not stable across plans: articles arrive under
//! `items` or `data`, and field names vary (`title`/`headline`,
//! `url`/`link`, `published_at`/`published`/`date`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::http::{build_client, lenient_f64, lenient_string, query_string, send_json, timestamp_or_now};
use super::{FetchParams, NewsProvider};
use crate::config::{AppConfig, ReutersConfig};
use crate::feed::decode_entities;
use crate::types::NewsItem;

const NAME: &str = "Reuters";

#[derive(Debug, Deserialize)]
struct RtEnvelope {
    #[serde(default)]
    items: Option<Vec<RtArticle>>,
    #[serde(default)]
    data: Option<Vec<RtArticle>>,
}

#[derive(Debug, Deserialize)]
struct RtArticle {
    #[serde(default, alias = "headline")]
    title: Option<String>,
    #[serde(default, alias = "link")]
    url: Option<String>,
    #[serde(default, alias = "published", alias = "date", deserialize_with = "lenient_string")]
    published_at: Option<String>,
    #[serde(default)]
    tickers: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_f64")]
    sentiment: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// How requests are authenticated.
enum Auth {
    OAuth {
        token_url: String,
        client_id: SecretString,
        client_secret: SecretString,
    },
    ApiKey(SecretString),
}

pub struct ReutersProvider {
    http: Client,
    base_url: Option<String>,
    auth: Option<Auth>,
    limit: usize,
}

impl ReutersProvider {
    pub fn from_config(cfg: &ReutersConfig, timeout: Duration, user_agent: &str) -> Result<Self> {
        let base_url = AppConfig::resolve_env(&cfg.base_url_env)
            .ok()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        let oauth = match (
            AppConfig::resolve_env(&cfg.token_url_env).ok().filter(|u| !u.trim().is_empty()),
            AppConfig::resolve_secret(&cfg.client_id_env),
            AppConfig::resolve_secret(&cfg.client_secret_env),
        ) {
            (Some(token_url), Some(client_id), Some(client_secret)) => Some(Auth::OAuth {
                token_url: token_url.trim().to_string(),
                client_id,
                client_secret,
            }),
            _ => None,
        };
        let auth = oauth.or_else(|| AppConfig::resolve_secret(&cfg.api_key_env).map(Auth::ApiKey));

        Ok(Self {
            http: build_client(NAME, timeout, user_agent)?,
            base_url,
            auth,
            limit: cfg.limit,
        })
    }

    async fn access_token(&self, token_url: &str, id: &SecretString, secret: &SecretString) -> Result<String> {
        let body = query_string(&[
            ("grant_type", "client_credentials".to_string()),
            ("client_id", id.expose_secret().clone()),
            ("client_secret", secret.expose_secret().clone()),
        ]);
        let req = self
            .http
            .post(token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        let token: TokenResponse = send_json(req, "Reuters OAuth")
            .await
            .context("Reuters token exchange failed")?;
        Ok(token.access_token)
    }

    async fn authorize(&self, req: RequestBuilder, auth: &Auth) -> Result<RequestBuilder> {
        Ok(match auth {
            Auth::OAuth {
                token_url,
                client_id,
                client_secret,
            } => {
                let token = self.access_token(token_url, client_id, client_secret).await?;
                req.header(AUTHORIZATION, format!("Bearer {token}"))
            }
            Auth::ApiKey(key) => req.header("x-api-key", key.expose_secret().as_str()),
        })
    }

    fn map_envelope(env: RtEnvelope, now: DateTime<Utc>) -> Vec<NewsItem> {
        env.items
            .or(env.data)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| {
                let title = decode_entities(a.title.as_deref().unwrap_or_default());
                let link = a.url.unwrap_or_default().trim().to_string();
                if title.is_empty() || link.is_empty() {
                    return None;
                }
                Some(
                    NewsItem::new(NAME, title, link, timestamp_or_now(a.published_at.as_deref(), now))
                        .with_tickers(a.tickers.unwrap_or_default())
                        .with_sentiment(a.sentiment),
                )
            })
            .collect()
    }
}

#[async_trait]
impl NewsProvider for ReutersProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn max_items(&self) -> usize {
        self.limit
    }

    async fn fetch_items(&self, params: &FetchParams) -> Result<Vec<NewsItem>> {
        let (Some(base_url), Some(auth)) = (&self.base_url, &self.auth) else {
            debug!(provider = NAME, "No endpoint or credentials configured, skipping");
            return Ok(Vec::new());
        };

        let mut pairs = vec![("limit", params.max_items.to_string())];
        if let Some(q) = params.query.as_deref().filter(|q| !q.is_empty()) {
            pairs.push(("q", q.to_string()));
        }
        let url = format!("{}/news?{}", base_url, query_string(&pairs));

        let req = self.authorize(self.http.get(&url), auth).await?;
        let env: RtEnvelope = send_json(req, NAME).await?;
        Ok(Self::map_envelope(env, params.now))
    }
}
