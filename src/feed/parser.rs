// src/feed/parser.rs
//! Turns an upstream body of unknown shape into loosely-typed records.
//!
//! Strategies run in order until one yields something:
//! 1. structured JSON (`{"items": [...]}` or a bare array),
//! 2. `<item>` markup blocks,
//! 3. permalink scraping, only when the caller asks for it.
//!
//! Nothing here fails: an unusable body is simply an empty list.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::feed::text::{clean_link, clean_text};

/// Upper bound on permalinks salvaged from a scraped page.
pub const SCRAPE_CAP: usize = 30;

/// A record as upstream described it. Every field is one of the legacy aliases
/// a feed may use; `normalize` picks among them in a fixed precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub title: Option<String>,
    pub text: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,

    pub url: Option<String>,
    pub link: Option<String>,
    pub permalink: Option<String>,

    pub published: Option<String>,
    pub pub_date: Option<String>,
    pub date: Option<String>,
    pub created_at: Option<String>,
    pub updated: Option<String>,

    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub enclosure_url: Option<String>,
}

impl RawRecord {
    /// Lenient read of one JSON object. Non-string scalars are stringified;
    /// empty strings count as absent.
    pub fn from_json(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        let s = |k: &str| obj.get(k).and_then(scalar_string);
        let u = |k: &str| obj.get(k).and_then(url_like);
        Some(Self {
            title: s("title"),
            text: s("text"),
            description: s("description"),
            content: s("content"),
            summary: s("summary"),
            url: s("url"),
            link: s("link"),
            permalink: s("permalink"),
            published: s("published"),
            pub_date: s("pubDate"),
            date: s("date"),
            created_at: s("created_at"),
            updated: s("updated"),
            thumbnail: u("thumbnail"),
            image: u("image"),
            enclosure_url: u("enclosure"),
        })
    }
}

fn scalar_string(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// A string, or an object carrying a `url` string (enclosures, thumbnails).
fn url_like(v: &Value) -> Option<String> {
    match v {
        Value::Object(o) => o.get("url").and_then(scalar_string),
        other => scalar_string(other),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode<'a> {
    /// Structured then markup.
    Feed,
    /// Additionally salvage bare permalinks; `handle` goes into the placeholder title.
    Scrape { handle: &'a str },
}

pub fn parse(body: &str, mode: ParseMode<'_>) -> Vec<RawRecord> {
    let records = parse_structured(body);
    if !records.is_empty() {
        return records;
    }
    let records = parse_markup(body);
    if !records.is_empty() {
        return records;
    }
    match mode {
        ParseMode::Scrape { handle } => scrape_permalinks(body, handle),
        ParseMode::Feed => Vec::new(),
    }
}

pub fn parse_structured(body: &str) -> Vec<RawRecord> {
    let Ok(doc) = serde_json::from_str::<Value>(body.trim()) else {
        return Vec::new();
    };
    let items = match &doc {
        Value::Array(a) => a,
        Value::Object(o) => match o.get("items") {
            Some(Value::Array(a)) => a,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    items.iter().filter_map(RawRecord::from_json).collect()
}

// ---- markup ----

static RE_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item\s*>").expect("item regex"));
static RE_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<entry\b[^>]*>(.*?)</entry\s*>").expect("entry regex"));
static RE_ENCLOSURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<enclosure\b[^>]*?\burl\s*=\s*["']([^"']+)["']"#).expect("enclosure regex")
});
static RE_ALT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<link\b[^>]*?\brel\s*=\s*["']alternate["'][^>]*?\bhref\s*=\s*["']([^"']+)["']"#)
        .expect("alternate link regex")
});
static RE_ANY_LINK_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).expect("link href regex")
});
static RE_MEDIA_THUMB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<media:thumbnail\b[^>]*?\burl\s*=\s*["']([^"']+)["']"#)
        .expect("media thumbnail regex")
});

const ELEMENTS: [&str; 9] = [
    "title",
    "description",
    "link",
    "pubDate",
    "dc:date",
    "date",
    "updated",
    "published",
    "media:description",
];

static RE_ELEMENTS: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    ELEMENTS
        .iter()
        .map(|name| {
            let n = regex::escape(name);
            let re = Regex::new(&format!(r"(?is)<{n}\b[^>]*>(.*?)</{n}\s*>"))
                .expect("element regex");
            (*name, re)
        })
        .collect()
});

/// Raw inner content of the first `<name>` element in `block`, if non-empty.
fn element(block: &str, name: &str) -> Option<String> {
    let inner = RE_ELEMENTS.get(name)?.captures(block)?.get(1)?.as_str();
    let inner = inner.trim();
    (!inner.is_empty()).then(|| inner.to_string())
}

fn attr(re: &Regex, block: &str) -> Option<String> {
    let v = clean_link(re.captures(block)?.get(1)?.as_str());
    (!v.is_empty()).then_some(v)
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// `<item>` blocks of an RSS-style feed.
pub fn parse_markup(body: &str) -> Vec<RawRecord> {
    RE_ITEM
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| {
            let block = m.as_str();
            RawRecord {
                title: element(block, "title").map(|s| clean_text(&s)).and_then(non_empty),
                description: element(block, "description")
                    .map(|s| clean_text(&s))
                    .and_then(non_empty),
                link: element(block, "link").map(|s| clean_link(&s)).and_then(non_empty),
                pub_date: element(block, "pubDate").map(|s| clean_link(&s)),
                date: element(block, "dc:date")
                    .or_else(|| element(block, "date"))
                    .map(|s| clean_link(&s)),
                updated: element(block, "updated").map(|s| clean_link(&s)),
                enclosure_url: attr(&RE_ENCLOSURE, block),
                ..RawRecord::default()
            }
        })
        .collect()
}

/// `<entry>` blocks of an Atom-style video feed.
pub fn parse_entries(body: &str) -> Vec<RawRecord> {
    RE_ENTRY
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| {
            let block = m.as_str();
            RawRecord {
                title: element(block, "title").map(|s| clean_text(&s)).and_then(non_empty),
                description: element(block, "media:description")
                    .map(|s| clean_text(&s))
                    .and_then(non_empty),
                link: attr(&RE_ALT_LINK, block).or_else(|| attr(&RE_ANY_LINK_HREF, block)),
                published: element(block, "published").map(|s| clean_link(&s)),
                updated: element(block, "updated").map(|s| clean_link(&s)),
                thumbnail: attr(&RE_MEDIA_THUMB, block),
                ..RawRecord::default()
            }
        })
        .collect()
}

// ---- scrape ----

static RE_PERMALINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[A-Za-z0-9.\-]+(?::\d+)?/[^\s"'<>()\[\]#?]+?/status/\d+"#)
        .expect("permalink regex")
});

/// Best-effort salvage: every distinct permalink in arbitrary text, capped.
pub fn scrape_permalinks(body: &str, handle: &str) -> Vec<RawRecord> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for m in RE_PERMALINK.find_iter(body) {
        let link = m.as_str();
        if !seen.insert(link) {
            continue;
        }
        out.push(RawRecord {
            title: Some(format!("Post by @{handle}")),
            link: Some(link.to_string()),
            ..RawRecord::default()
        });
        if out.len() >= SCRAPE_CAP {
            break;
        }
    }
    out
}
