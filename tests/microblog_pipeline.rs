// tests/microblog_pipeline.rs
//
// Drives the mirror walk end to end with a scripted fetcher and the in-memory
// response cache. No sockets.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use social_feed::feed::cache::{cache_key, MemoryCache, ResponseCache};
use social_feed::feed::fetch::{FetchError, Fetcher};
use social_feed::feed::microblog::{MicroblogPipeline, CACHE_SCOPE, FRESH_SECS};
use social_feed::feed::mirrors::resolve;
use social_feed::feed::{CacheStatus, CachedResponse};

const ITEMS_JSON: &str = include_str!("fixtures/nitter_items.json");
const RSS_XML: &str = include_str!("fixtures/nitter_rss.xml");
const PROFILE_HTML: &str = include_str!("fixtures/nitter_profile.html");

const RELAY: &str = "https://relay.local/";

/// Answers by exact URL; anything unscripted is a 404.
struct ScriptedFetcher {
    routes: Vec<(String, Result<String, FetchError>)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn new(routes: Vec<(&str, Result<String, FetchError>)>) -> Arc<Self> {
        Arc::new(Self {
            routes: routes.into_iter().map(|(u, r)| (u.to_string(), r)).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.routes
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, r)| r.clone())
            .unwrap_or(Err(FetchError::Status(404)))
    }
}

fn pipeline(fetcher: Arc<ScriptedFetcher>, cache: Arc<MemoryCache>) -> MicroblogPipeline {
    MicroblogPipeline::new(fetcher, cache, RELAY)
}

const HOSTS: [&str; 2] = ["https://nitter.one.local", "https://nitter.two.local"];

#[tokio::test]
async fn structured_endpoint_success_is_normalized_and_cached() {
    let fetcher = ScriptedFetcher::new(vec![(
        "https://nitter.one.local/someone/rss?format=json",
        Ok(ITEMS_JSON.to_string()),
    )]);
    let cache = Arc::new(MemoryCache::new());
    let p = pipeline(fetcher.clone(), cache.clone());

    let resp = p.respond("someone", &HOSTS).await;
    assert_eq!(resp.cache, CacheStatus::Miss);
    assert_eq!(resp.max_age(), Some(FRESH_SECS));
    assert_eq!(fetcher.calls().len(), 1, "first endpoint succeeded directly");

    let posts = resp.posts();
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[0].title, "First post & friends");
    assert_eq!(posts[0].url, "https://x.com/someone/status/1800000000000000001");
    assert_eq!(posts[0].published_at, "2024-10-01T12:30:00Z");
    assert!(posts[0].thumbnail.as_deref().unwrap().ends_with("abc.jpg"));

    assert_eq!(posts[1].title, "Second post, text only");
    assert_eq!(posts[1].url, "https://twitter.com/someone/status/1800000000000000002");

    assert_eq!(posts[2].title, "A reply that only has a description body");
    assert_eq!(
        posts[2].url, "https://mirror.example/someone/status/1800000000000000003",
        "uncanonicalizable permalink falls back to raw"
    );

    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn cache_hit_is_served_without_fetching() {
    let fetcher = ScriptedFetcher::new(vec![]);
    let cache = Arc::new(MemoryCache::new());
    let first = resolve("someone", &HOSTS)[0].url.clone();
    let stored = CachedResponse {
        status: 200,
        max_age: Some(FRESH_SECS),
        body: r#"[{"source":"twitter","title":"cached","description":"","url":"","thumbnail":null,"publishedAt":""}]"#
            .to_string(),
    };
    cache.put(&cache_key(CACHE_SCOPE, &first), stored.clone()).await;

    let resp = pipeline(fetcher.clone(), cache).respond("someone", &HOSTS).await;
    assert_eq!(resp.cache, CacheStatus::Hit);
    assert_eq!(resp.stored, stored);
    assert!(fetcher.calls().is_empty(), "cache hit must not touch the network");
}

#[tokio::test]
async fn second_request_hits_cache() {
    let fetcher = ScriptedFetcher::new(vec![(
        "https://nitter.one.local/someone/rss?format=json",
        Ok(ITEMS_JSON.to_string()),
    )]);
    let cache = Arc::new(MemoryCache::new());
    let p = pipeline(fetcher.clone(), cache);

    let a = p.respond("someone", &HOSTS).await;
    let b = p.respond("@someone", &HOSTS).await;
    assert_eq!(b.cache, CacheStatus::Hit);
    assert_eq!(a.body(), b.body());
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test]
async fn markup_endpoint_used_when_structured_fails() {
    let fetcher = ScriptedFetcher::new(vec![(
        "https://nitter.one.local/someone/rss",
        Ok(RSS_XML.to_string()),
    )]);
    let cache = Arc::new(MemoryCache::new());
    let resp = pipeline(fetcher.clone(), cache).respond("someone", &HOSTS).await;

    let posts = resp.posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].title, "Markup post one");
    assert_eq!(posts[0].description, "Markup post one");
    assert_eq!(posts[0].url, "https://x.com/someone/status/1800000000000000010");
    assert_eq!(posts[1].description, "Second");
    assert_eq!(posts[1].thumbnail.as_deref(), Some("https://nitter.net/pic/y.png"));
    assert_eq!(posts[1].published_at, "2024-10-03T10:00:00Z");

    assert_eq!(
        fetcher.calls(),
        vec![
            "https://nitter.one.local/someone/rss?format=json".to_string(),
            "https://relay.local/nitter.one.local/someone/rss?format=json".to_string(),
            "https://nitter.one.local/someone/rss".to_string(),
        ]
    );
}

#[tokio::test]
async fn page_endpoint_is_scraped_for_permalinks() {
    let fetcher = ScriptedFetcher::new(vec![(
        "https://nitter.one.local/someone",
        Ok(PROFILE_HTML.to_string()),
    )]);
    let cache = Arc::new(MemoryCache::new());
    let resp = pipeline(fetcher, cache).respond("someone", &HOSTS).await;

    let posts = resp.posts();
    assert_eq!(posts.len(), 2, "duplicate permalinks collapse");
    assert_eq!(posts[0].url, "https://x.com/someone/status/1800000000000000020");
    assert_eq!(posts[1].url, "https://x.com/someone/status/1800000000000000021");
    assert!(posts.iter().all(|p| p.title.contains("@someone")));
    assert!(posts.iter().all(|p| p.published_at.is_empty()));
    assert_eq!(resp.max_age(), Some(FRESH_SECS));
}

#[tokio::test]
async fn non_page_endpoints_are_never_scraped() {
    // Permalink-bearing text on the markup endpoint alone is not enough.
    let fetcher = ScriptedFetcher::new(vec![(
        "https://nitter.one.local/someone/rss",
        Ok("see https://nitter.net/someone/status/1".to_string()),
    )]);
    let cache = Arc::new(MemoryCache::new());
    let resp = pipeline(fetcher, cache.clone())
        .respond("someone", &["https://nitter.one.local"])
        .await;
    assert_eq!(resp.max_age(), None);
    assert!(resp.posts()[0].title.contains("unavailable"));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn relay_rescues_blocked_direct_fetch() {
    let fetcher = ScriptedFetcher::new(vec![
        (
            "https://nitter.one.local/someone/rss?format=json",
            Err(FetchError::Status(403)),
        ),
        (
            "https://relay.local/nitter.one.local/someone/rss?format=json",
            Ok(ITEMS_JSON.to_string()),
        ),
    ]);
    let cache = Arc::new(MemoryCache::new());
    let resp = pipeline(fetcher.clone(), cache).respond("someone", &HOSTS).await;
    assert_eq!(resp.posts().len(), 3);
    assert_eq!(fetcher.calls().len(), 2);
}

#[tokio::test]
async fn exhausted_endpoints_yield_uncached_degraded_post() {
    let fetcher = ScriptedFetcher::new(vec![]);
    let cache = Arc::new(MemoryCache::new());
    let resp = pipeline(fetcher.clone(), cache.clone())
        .respond("someone", &HOSTS)
        .await;

    assert_eq!(resp.stored.status, 200);
    assert_eq!(resp.max_age(), None);
    assert_eq!(resp.cache, CacheStatus::Bypass);

    let posts = resp.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].url, "https://x.com/someone");
    assert!(posts[0].title.contains("unavailable"));

    // 2 hosts x 3 forms x (direct + relay), strictly sequential, no retries
    assert_eq!(fetcher.calls().len(), 12);
    assert!(cache.is_empty(), "degraded responses are never cached");
}

#[tokio::test]
async fn empty_handle_and_hosts_terminate_without_io() {
    let fetcher = ScriptedFetcher::new(vec![]);
    let cache = Arc::new(MemoryCache::new());
    let p = pipeline(fetcher.clone(), cache);
    let none: [&str; 0] = [];

    let resp = p.respond("", &none).await;
    assert_eq!(resp.body(), "[]");

    let resp = p.respond("someone", &none).await;
    assert_eq!(resp.posts().len(), 1, "no endpoints at all is plain exhaustion");
    assert_eq!(resp.posts()[0].url, "https://x.com/someone");

    assert!(fetcher.calls().is_empty());
}
