//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has defaults, so a partial (or absent) file is valid.
//! Secrets (API keys, tokens) are referenced by env-var name in the config
//! and resolved at runtime.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::ranking::RankingConfig;
use crate::sentiment::Lexicon;
use crate::types::QueryLimits;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub aggregator: AggregatorConfig,
    pub ranking: RankingConfig,
    pub sentiment: Lexicon,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: i64,
    /// Optional cap on cached queries; unbounded when absent.
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            max_entries: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AggregatorConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub max_tickers: usize,
    pub max_sources: usize,
    pub max_query_len: usize,
    /// Below this many merged items the fallback pass runs.
    pub min_results: usize,
    pub fallback_delay_ms: u64,
    pub provider_timeout_secs: u64,
    pub fallback_timeout_secs: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            default_limit: 80,
            max_limit: 300,
            max_tickers: 50,
            max_sources: 20,
            max_query_len: 256,
            min_results: 10,
            fallback_delay_ms: 800,
            provider_timeout_secs: 15,
            fallback_timeout_secs: 8,
        }
    }
}

impl AggregatorConfig {
    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            max_tickers: self.max_tickers,
            max_sources: self.max_sources,
            max_query_len: self.max_query_len,
        }
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    pub user_agent: String,
    /// Env var that overrides `user_agent` (SEC requires a contact UA).
    pub user_agent_env: Option<String>,
    pub alphavantage: AlphaVantageConfig,
    pub marketaux: MarketauxConfig,
    pub finnhub: FinnhubConfig,
    pub reuters: ReutersConfig,
    pub bloomberg: BloombergConfig,
    pub sec: FeedConfig,
    pub marketwatch: FeedConfig,
    pub yahoo: FeedConfig,
    pub investing: InvestingConfig,
    pub fallback: FallbackConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            user_agent: "NEWSDESK/0.1.0 (+https://example.com)".to_string(),
            user_agent_env: Some("SEC_USER_AGENT".to_string()),
            alphavantage: AlphaVantageConfig::default(),
            marketaux: MarketauxConfig::default(),
            finnhub: FinnhubConfig::default(),
            reuters: ReutersConfig::default(),
            bloomberg: BloombergConfig::default(),
            sec: FeedConfig::new("https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent&output=atom", 60),
            marketwatch: FeedConfig::new("https://feeds.marketwatch.com/marketwatch/topstories/", 50),
            yahoo: FeedConfig::new(
                "https://feeds.finance.yahoo.com/rss/2.0/headline?s=^GSPC&region=US&lang=en-US",
                40,
            ),
            investing: InvestingConfig::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

impl ProvidersConfig {
    /// `user_agent`, unless the override env var is set and non-empty.
    pub fn resolved_user_agent(&self) -> String {
        self.user_agent_env
            .as_deref()
            .and_then(|env| std::env::var(env).ok())
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| self.user_agent.clone())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlphaVantageConfig {
    pub enabled: bool,
    pub api_key_env: String,
    pub base_url: String,
    pub limit: usize,
    pub topics: Vec<String>,
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: "ALPHAVANTAGE_API_KEY".to_string(),
            base_url: "https://www.alphavantage.co/query".to_string(),
            limit: 80,
            topics: ["earnings", "ipo", "mergers_and_acquisitions", "financial_markets"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarketauxConfig {
    pub enabled: bool,
    pub api_key_env: String,
    pub base_url: String,
    pub limit: usize,
    /// Only request articles published within this many hours.
    pub lookback_hours: i64,
}

impl Default for MarketauxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: "MARKETAUX_API_KEY".to_string(),
            base_url: "https://api.marketaux.com/v1/news/all".to_string(),
            limit: 60,
            lookback_hours: 48,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FinnhubConfig {
    pub enabled: bool,
    pub api_key_env: String,
    pub base_url: String,
    pub category: String,
    pub limit: usize,
}

impl Default for FinnhubConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: "FINNHUB_API_KEY".to_string(),
            base_url: "https://finnhub.io/api/v1/news".to_string(),
            category: "general".to_string(),
            limit: 60,
        }
    }
}

/// Reuters authenticates with either `x-api-key` or an OAuth2
/// client-credentials token; OAuth wins when both are configured.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReutersConfig {
    pub enabled: bool,
    pub base_url_env: String,
    pub api_key_env: String,
    pub token_url_env: String,
    pub client_id_env: String,
    pub client_secret_env: String,
    pub limit: usize,
}

impl Default for ReutersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url_env: "REUTERS_BASE_URL".to_string(),
            api_key_env: "REUTERS_API_KEY".to_string(),
            token_url_env: "REUTERS_OAUTH_TOKEN_URL".to_string(),
            client_id_env: "REUTERS_CLIENT_ID".to_string(),
            client_secret_env: "REUTERS_CLIENT_SECRET".to_string(),
            limit: 80,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BloombergConfig {
    pub enabled: bool,
    pub proxy_url_env: String,
    pub token_env: String,
    pub limit: usize,
}

impl Default for BloombergConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            proxy_url_env: "BLOOMBERG_PROXY_URL".to_string(),
            token_env: "BLOOMBERG_PROXY_TOKEN".to_string(),
            limit: 80,
        }
    }
}

/// A single RSS / Atom feed.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub enabled: bool,
    pub url: String,
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: String::new(),
            limit: 50,
        }
    }
}

impl FeedConfig {
    pub fn new(url: &str, limit: usize) -> Self {
        Self {
            enabled: true,
            url: url.to_string(),
            limit,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InvestingConfig {
    pub enabled: bool,
    pub urls: Vec<String>,
    pub limit: usize,
    /// Keep only headlines matching the importance patterns.
    pub important_only: bool,
}

impl Default for InvestingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            urls: [
                "https://www.investing.com/rss/news_25.rss",
                "https://www.investing.com/rss/news_356.rss",
                "https://www.investing.com/rss/news_1062.rss",
                "https://www.investing.com/rss/news_95.rss",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            limit: 60,
            important_only: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub marketwatch_limit: usize,
    pub yahoo_limit: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            marketwatch_limit: 40,
            yahoo_limit: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load `path` if it exists, otherwise use built-in defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Resolve a credential. Unset or blank variables yield `None`.
    pub fn resolve_secret(env_name: &str) -> Option<SecretString> {
        if env_name.is_empty() {
            return None;
        }
        Self::resolve_env(env_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(SecretString::new)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
