// src/feed/cache.rs
//! Response cache keyed by a synthetic URL derived from the upstream source.
//! Absolute TTL taken from the response's own `max-age`; no sliding refresh.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::feed::types::CachedResponse;

/// Bump whenever parsing or normalization changes the output shape, so entries
/// written by an older build are never served.
pub const CACHE_VERSION: &str = "3";

/// `https://feed.local/<scope>?src=<encoded>&v=<CACHE_VERSION>`
pub fn cache_key(scope: &str, src: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(src.as_bytes()).collect();
    format!("https://feed.local/{scope}?src={encoded}&v={CACHE_VERSION}")
}

/// Per-key atomic get/put. Concurrent writers race; last write wins.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedResponse>;
    async fn put(&self, key: &str, response: CachedResponse);
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    inner: Mutex<HashMap<String, (Instant, CachedResponse)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (Instant, CachedResponse)>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<CachedResponse> {
        let mut map = self.lock();
        if let Some((expires, resp)) = map.get(key) {
            if Instant::now() < *expires {
                return Some(resp.clone());
            }
        } else {
            return None;
        }
        map.remove(key);
        None
    }

    async fn put(&self, key: &str, response: CachedResponse) {
        // no freshness directive, nothing to keep
        let Some(max_age) = response.max_age.filter(|s| *s > 0) else {
            return;
        };
        let expires = Instant::now() + Duration::from_secs(u64::from(max_age));
        self.lock().insert(key.to_string(), (expires, response));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(max_age: Option<u32>) -> CachedResponse {
        CachedResponse {
            status: 200,
            max_age,
            body: "[]".into(),
        }
    }

    #[test]
    fn key_is_deterministic_and_versioned() {
        let a = cache_key("twitter", "https://nitter.net/a/rss?format=json");
        assert_eq!(a, cache_key("twitter", "https://nitter.net/a/rss?format=json"));
        assert!(a.starts_with("https://feed.local/twitter?src=https%3A%2F%2Fnitter.net"));
        assert!(a.ends_with(&format!("&v={CACHE_VERSION}")));
        assert_ne!(a, cache_key("youtube", "https://nitter.net/a/rss?format=json"));
        assert_ne!(a, cache_key("twitter", "https://nitter.net/a/rss"));
    }

    #[tokio::test]
    async fn put_then_get_within_ttl() {
        let c = MemoryCache::new();
        c.put("k", resp(Some(600))).await;
        assert_eq!(c.get("k").await, Some(resp(Some(600))));
        assert_eq!(c.len(), 1);
    }

    #[tokio::test]
    async fn responses_without_freshness_are_not_stored() {
        let c = MemoryCache::new();
        c.put("k", resp(None)).await;
        c.put("z", resp(Some(0))).await;
        assert!(c.is_empty());
        assert_eq!(c.get("k").await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_read() {
        let c = MemoryCache::new();
        c.lock().insert(
            "k".into(),
            (Instant::now() - Duration::from_secs(1), resp(Some(600))),
        );
        assert_eq!(c.get("k").await, None);
        assert!(c.is_empty());
    }
}
