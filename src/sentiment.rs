//! Lexical sentiment fallback for headlines without provider sentiment.
//!
//! Counts positive and negative keyword hits in the title and maps
//! `(pos - neg) / saturation` into [-1, +1]. A keyword counts once per
//! headline no matter how often it appears; a token matches a keyword
//! when it starts with it ("beats" hits "beat").
//!
//! Three refinements are available and all are off by default:
//! negation ("not cut" flips the hit), hedging dampeners ("reportedly
//! beats" weighs less) and weighted multi-word phrases. With none of them
//! configured the score is the plain keyword count.
//!
//! [`summarize`] folds a batch of scored headlines into one
//! recency-weighted market mood with a Bullish / Bearish / Neutral label.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::types::NewsItem;

const POSITIVE_WORDS: &[&str] = &[
    "beat", "beats", "surge", "soar", "rally", "gain",
    "upgrade", "bullish", "record", "strong", "robust", "outperform",
];

const NEGATIVE_WORDS: &[&str] = &[
    "miss", "plunge", "slump", "drop", "fall", "cut",
    "downgrade", "bearish", "warn", "bankruptcy", "default", "recession",
];

const NEGATORS: &[&str] = &["no", "not", "without", "notwithstanding"];

const DAMPENERS: &[&str] = &["rumor", "rumors", "reportedly", "may", "might"];

/// Phrase weights, in keyword-hit units.
const PHRASES: &[(&str, f64)] = &[
    ("beats estimates", 1.2),
    ("misses estimates", -1.2),
    ("all time high", 1.3),
    ("guidance raised", 1.1),
    ("guidance cut", -1.1),
    ("share buyback", 0.8),
    ("stock split", 0.7),
    ("sec investigation", -1.0),
    ("antitrust probe", -1.0),
];

const DEFAULT_SATURATION: f64 = 6.0;

/// Tokens before a keyword that can negate or dampen it.
const CONTEXT_WINDOW: usize = 2;
const DAMPENING: f64 = 0.8;

/// Summary tunables.
const SUMMARY_SAMPLE: usize = 40;
const SUMMARY_HALF_LIFE_MINUTES: f64 = 360.0;
const LABEL_THRESHOLD: f64 = 0.2;
const TOP_DRIVERS: usize = 3;
const TOP_TICKERS: usize = 4;

/// Keyword lexicon. Deserializable so the word lists can live in config.
#[derive(Debug, Clone, Deserialize)]
pub struct Lexicon {
    #[serde(default = "default_positive")]
    pub positive: Vec<String>,
    #[serde(default = "default_negative")]
    pub negative: Vec<String>,
    /// Net hit count that maps to a full +/-1.
    #[serde(default = "default_saturation")]
    pub saturation: f64,
    /// Flip a keyword hit when a negator precedes it.
    #[serde(default)]
    pub negation: bool,
    #[serde(default = "default_negators")]
    pub negators: Vec<String>,
    /// Hedging words that weaken the keyword hits right after them.
    #[serde(default)]
    pub dampeners: Vec<String>,
    /// Multi-word phrases with signed weights, added on top of keyword hits.
    #[serde(default)]
    pub phrases: BTreeMap<String, f64>,
}

fn default_positive() -> Vec<String> {
    POSITIVE_WORDS.iter().map(|w| w.to_string()).collect()
}

fn default_negative() -> Vec<String> {
    NEGATIVE_WORDS.iter().map(|w| w.to_string()).collect()
}

fn default_saturation() -> f64 {
    DEFAULT_SATURATION
}

fn default_negators() -> Vec<String> {
    NEGATORS.iter().map(|w| w.to_string()).collect()
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            positive: default_positive(),
            negative: default_negative(),
            saturation: DEFAULT_SATURATION,
            negation: false,
            negators: default_negators(),
            dampeners: Vec::new(),
            phrases: BTreeMap::new(),
        }
    }
}

impl Lexicon {
    /// Default word lists with negation, dampeners and the built-in
    /// phrase table switched on.
    pub fn weighted() -> Self {
        Self {
            negation: true,
            dampeners: DAMPENERS.iter().map(|w| w.to_string()).collect(),
            phrases: PHRASES.iter().map(|(p, w)| (p.to_string(), *w)).collect(),
            ..Self::default()
        }
    }

    /// Score a headline: deterministic, in [-1, +1].
    pub fn score(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let tokens = tokenize(&lower);
        if tokens.is_empty() {
            return 0.0;
        }

        let net = self.keyword_net(&tokens) + self.phrase_net(&tokens);
        let saturation = if self.saturation > 0.0 {
            self.saturation
        } else {
            DEFAULT_SATURATION
        };

        (net / saturation).clamp(-1.0, 1.0)
    }

    /// Positive and negative keywords present in `text`, lowercased.
    pub fn drivers(&self, text: &str) -> (Vec<String>, Vec<String>) {
        let lower = text.to_lowercase();
        let tokens = tokenize(&lower);
        let hits = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .filter(|w| first_hit(&tokens, w).is_some())
                .map(|w| w.to_lowercase())
                .collect()
        };
        (hits(&self.positive), hits(&self.negative))
    }

    fn keyword_net(&self, tokens: &[&str]) -> f64 {
        let sum = |words: &[String]| -> f64 {
            words
                .iter()
                .filter_map(|w| first_hit(tokens, w))
                .map(|i| self.modifier(tokens, i))
                .sum()
        };
        sum(&self.positive) - sum(&self.negative)
    }

    /// Multiplier for the keyword hit at `i`.
    fn modifier(&self, tokens: &[&str], i: usize) -> f64 {
        let window = &tokens[i.saturating_sub(CONTEXT_WINDOW)..i];
        let listed = |list: &[String]| window.iter().any(|t| list.iter().any(|w| w.eq_ignore_ascii_case(t)));

        let mut m = 1.0;
        if self.negation && listed(&self.negators) {
            m = -m;
        }
        if listed(&self.dampeners) {
            m *= DAMPENING;
        }
        m
    }

    fn phrase_net(&self, tokens: &[&str]) -> f64 {
        self.phrases
            .iter()
            .filter(|(_, weight)| weight.is_finite())
            .filter(|(phrase, _)| {
                let phrase = phrase.to_lowercase();
                let words = tokenize(&phrase);
                !words.is_empty() && tokens.windows(words.len()).any(|w| w == words.as_slice())
            })
            .map(|(_, weight)| *weight)
            .sum()
    }
}

fn tokenize(lower: &str) -> Vec<&str> {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Index of the first token that starts with `word`.
fn first_hit(tokens: &[&str], word: &str) -> Option<usize> {
    let word = word.to_lowercase();
    if word.is_empty() {
        return None;
    }
    tokens.iter().position(|t| t.starts_with(word.as_str()))
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Bullish,
    Neutral,
    Bearish,
}

impl SentimentLabel {
    pub fn for_score(score: f64) -> Self {
        if score >= LABEL_THRESHOLD {
            Self::Bullish
        } else if score <= -LABEL_THRESHOLD {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }
}

/// Recency-weighted mood over a batch of headlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSummary {
    pub s: String,
    /// Weighted mean sentiment in [-1, 1].
    pub score: f64,
    pub label: SentimentLabel,
    /// Headlines that went into the score.
    pub count: usize,
    pub top_positive: Vec<String>,
    pub top_negative: Vec<String>,
    pub top_tickers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Summarise the first headlines of `items`, weighting each by an
/// exponential recency decay with a six hour half-life.
///
/// Items without a sentiment are scored with `lexicon`. Future-dated items
/// count as brand new.
pub fn summarize(items: &[NewsItem], lexicon: &Lexicon, now: DateTime<Utc>) -> SentimentSummary {
    let sample = &items[..items.len().min(SUMMARY_SAMPLE)];

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    let mut positive: HashMap<String, usize> = HashMap::new();
    let mut negative: HashMap<String, usize> = HashMap::new();
    let mut tickers: HashMap<String, usize> = HashMap::new();

    for item in sample {
        let age_minutes = ((now - item.pub_date).num_seconds() as f64 / 60.0).max(0.0);
        let weight = (-age_minutes * std::f64::consts::LN_2 / SUMMARY_HALF_LIFE_MINUTES).exp();
        let score = item.sentiment.unwrap_or_else(|| lexicon.score(&item.title));
        weighted += score * weight;
        total_weight += weight;

        let (pos, neg) = lexicon.drivers(&item.title);
        for w in pos {
            *positive.entry(w).or_default() += 1;
        }
        for w in neg {
            *negative.entry(w).or_default() += 1;
        }
        for t in item.tickers.iter().flatten() {
            *tickers.entry(t.clone()).or_default() += 1;
        }
    }

    let score = if total_weight > 0.0 {
        (weighted / total_weight).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    SentimentSummary {
        s: "ok".to_string(),
        score,
        label: SentimentLabel::for_score(score),
        count: sample.len(),
        top_positive: top_counts(positive, TOP_DRIVERS, true),
        top_negative: top_counts(negative, TOP_DRIVERS, true),
        top_tickers: top_counts(tickers, TOP_TICKERS, false),
        note: None,
    }
}

/// Most frequent keys, ties broken alphabetically.
fn top_counts(counts: HashMap<String, usize>, k: usize, upper: bool) -> Vec<String> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
        .into_iter()
        .take(k)
        .map(|(key, _)| if upper { key.to_uppercase() } else { key })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
