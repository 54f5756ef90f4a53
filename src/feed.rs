//! Tolerant RSS / Atom extraction.
//!
//! Not an XML parser. Feeds in the wild are frequently truncated, mix
//! CDATA with escaped markup, or carry stray entities that a strict
//! parser rejects, so headlines are pulled out with patterns instead.
//! RSS `<item>` blocks are tried first; Atom `<entry>` blocks only when
//! the RSS pass finds nothing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// One headline pulled out of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub pub_date: Option<String>,
}

static RSS_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<item[\s>]").unwrap());
static ATOM_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<entry[\s>]").unwrap());
static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link[^>]*>(.*?)</link>").unwrap());
static ATOM_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<link[^>]*href\s*=\s*["']([^"']+)["']"#).unwrap());
static PUB_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<pubDate[^>]*>(.*?)</pubDate>").unwrap());
static ATOM_UPDATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<updated[^>]*>(.*?)</updated>").unwrap());
static ATOM_PUBLISHED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<published[^>]*>(.*?)</published>").unwrap());
static CDATA: Lazy<Regex> = Lazy::new(|| Regex::new(r"<!\[CDATA\[|\]\]>").unwrap());

/// Extract `(title, link, pubDate)` triples in document order.
///
/// Entries with neither a title nor a link are dropped.
pub fn parse_feed(xml: &str) -> Vec<FeedEntry> {
    let rss = extract(xml, &RSS_ITEM, &LINK, &[&PUB_DATE], false);
    if !rss.is_empty() {
        return rss;
    }
    extract(xml, &ATOM_ENTRY, &ATOM_LINK, &[&ATOM_UPDATED, &ATOM_PUBLISHED], true)
}

fn extract(
    xml: &str,
    block: &Regex,
    link_re: &Regex,
    date_res: &[&Regex],
    link_is_attr: bool,
) -> Vec<FeedEntry> {
    let mut out = Vec::new();

    for chunk in block.split(xml).skip(1) {
        let title = capture(&TITLE, chunk)
            .map(|raw| decode_entities(&strip_cdata(raw)))
            .unwrap_or_default();

        let link = capture(link_re, chunk)
            .map(|raw| {
                if link_is_attr {
                    decode_entities(raw.trim())
                } else {
                    decode_entities(&strip_cdata(raw))
                }
            })
            .unwrap_or_default();

        if title.is_empty() && link.is_empty() {
            continue;
        }

        let pub_date = date_res
            .iter()
            .find_map(|re| capture(re, chunk))
            .map(|raw| strip_cdata(raw))
            .filter(|d| !d.is_empty());

        out.push(FeedEntry {
            title,
            link,
            pub_date,
        });
    }

    out
}

fn capture<'a>(re: &Regex, haystack: &'a str) -> Option<&'a str> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn strip_cdata(s: &str) -> String {
    CDATA.replace_all(s, "").trim().to_string()
}

/// Decode named and numeric (`&#39;`, `&#x2019;`) HTML entities and
/// collapse whitespace.
pub fn decode_entities(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse the date formats seen across feeds and JSON providers.
///
/// Accepts RFC 3339, RFC 2822, compact `YYYYMMDDTHHMMSS`, naive
/// ISO-like timestamps (taken as UTC) and bare dates.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y%m%dT%H%M%S",
        "%Y%m%dT%H%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse `raw`, falling back to `now` when it is missing or unparseable.
pub fn date_or_now(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(parse_date).unwrap_or(now)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
