// src/feed/types.rs
use serde::{Deserialize, Serialize};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Which upstream platform a post came from. Serialized with the names the
/// presentation layer groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostSource {
    #[serde(rename = "youtube")]
    Video,
    #[serde(rename = "twitter")]
    Microblog,
}

impl PostSource {
    pub fn as_str(self) -> &'static str {
        match self {
            PostSource::Video => "youtube",
            PostSource::Microblog => "twitter",
        }
    }
}

/// One display-ready post. Built once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPost {
    pub source: PostSource,
    /// Never empty; falls back to a placeholder.
    pub title: String,
    pub description: String,
    /// Canonical external link, or empty.
    pub url: String,
    pub thumbnail: Option<String>,
    /// RFC 3339 or empty.
    pub published_at: String,
}

/// Where a response came from, surfaced as `X-Feed-Cache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypass,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

/// Stored form of a response. This is what the response cache holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    /// `max-age` in seconds; `None` means "do not cache".
    pub max_age: Option<u32>,
    /// Serialized JSON array of [`NormalizedPost`].
    pub body: String,
}

impl CachedResponse {
    pub fn cache_control(&self) -> Option<String> {
        self.max_age.map(|s| format!("public, max-age={s}"))
    }
}

/// A pipeline's answer. Status is always 200; degraded outcomes are signalled
/// in the payload, never via transport status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedResponse {
    pub stored: CachedResponse,
    pub cache: CacheStatus,
}

impl FeedResponse {
    /// Fresh success carrying a freshness directive.
    pub fn fresh(body: String, max_age: u32) -> Self {
        Self {
            stored: CachedResponse {
                status: 200,
                max_age: Some(max_age),
                body,
            },
            cache: CacheStatus::Miss,
        }
    }

    /// Degraded or empty answer: no freshness directive, never stored.
    pub fn uncached(body: String) -> Self {
        Self {
            stored: CachedResponse {
                status: 200,
                max_age: None,
                body,
            },
            cache: CacheStatus::Bypass,
        }
    }

    pub fn empty() -> Self {
        Self::uncached("[]".to_string())
    }

    pub fn from_cache(stored: CachedResponse) -> Self {
        Self {
            stored,
            cache: CacheStatus::Hit,
        }
    }

    pub fn body(&self) -> &str {
        &self.stored.body
    }

    pub fn max_age(&self) -> Option<u32> {
        self.stored.max_age
    }

    /// Decode the body back into posts. Used when joining pipelines.
    pub fn posts(&self) -> Vec<NormalizedPost> {
        serde_json::from_str(&self.stored.body).unwrap_or_default()
    }
}
