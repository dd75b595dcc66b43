// src/feed/microblog.rs
//! Microblog pipeline: walk the mirror endpoints strictly in order, serving
//! the first cache hit or the first endpoint that yields records.
//!
//! TryNext → CacheCheck → Fetch → Parse → Normalize → Respond, with every
//! per-endpoint failure looping back to TryNext. Running out of endpoints
//! produces a single degraded post, never an error.

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics::counter;

use crate::feed::cache::{cache_key, ResponseCache};
use crate::feed::canonical::profile_url;
use crate::feed::fetch::{fetch_body, Fetcher};
use crate::feed::mirrors::{clean_handle, resolve, EndpointShape, FeedEndpoint};
use crate::feed::normalize::normalize_all;
use crate::feed::parser::{parse, ParseMode};
use crate::feed::types::{FeedResponse, NormalizedPost, PostSource};

pub const CACHE_SCOPE: &str = "twitter";
/// Freshness directive on successful responses, in seconds.
pub const FRESH_SECS: u32 = 600;

const SOURCE: &str = "twitter";

pub struct MicroblogPipeline {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn ResponseCache>,
    relay_base: String,
}

impl MicroblogPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        cache: Arc<dyn ResponseCache>,
        relay_base: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            relay_base: relay_base.into(),
        }
    }

    /// Full pipeline for `handle` over `hosts`. An empty handle means the
    /// source is not configured: `[]`, no I/O.
    pub async fn respond<S: AsRef<str>>(&self, handle: &str, hosts: &[S]) -> FeedResponse {
        let handle = clean_handle(handle);
        if handle.is_empty() {
            return FeedResponse::empty();
        }

        let endpoints = resolve(&handle, hosts);
        match self.try_endpoints(&handle, &endpoints).await {
            Ok(Some(resp)) => resp,
            Ok(None) => {
                tracing::warn!(
                    target: "feeds",
                    handle = %handle,
                    endpoints = endpoints.len(),
                    "all mirror endpoints exhausted"
                );
                counter!("feed_degraded_total", "source" => SOURCE).increment(1);
                degraded(&handle, DegradedReason::MirrorsDown)
            }
            Err(e) => {
                tracing::error!(target: "feeds", handle = %handle, error = ?e, "microblog pipeline failed");
                counter!("feed_degraded_total", "source" => SOURCE).increment(1);
                degraded(&handle, DegradedReason::Internal)
            }
        }
    }

    async fn try_endpoints(
        &self,
        handle: &str,
        endpoints: &[FeedEndpoint],
    ) -> Result<Option<FeedResponse>> {
        for ep in endpoints {
            let key = cache_key(CACHE_SCOPE, &ep.url);
            if let Some(hit) = self.cache.get(&key).await {
                tracing::debug!(target: "feeds", endpoint = %ep.url, "cache hit");
                counter!("feed_cache_hits_total", "source" => SOURCE).increment(1);
                return Ok(Some(FeedResponse::from_cache(hit)));
            }
            counter!("feed_cache_misses_total", "source" => SOURCE).increment(1);

            let body = fetch_body(self.fetcher.as_ref(), &ep.url, &self.relay_base).await;
            if body.is_empty() {
                self.endpoint_failed(ep, "no body");
                continue;
            }

            let mut records = parse(&body, ParseMode::Feed);
            if records.is_empty() && ep.shape == EndpointShape::Page {
                records = parse(&body, ParseMode::Scrape { handle });
            }
            if records.is_empty() {
                self.endpoint_failed(ep, "no records");
                continue;
            }

            let posts = normalize_all(&records, PostSource::Microblog);
            let json = serde_json::to_string(&posts).context("serializing microblog posts")?;
            let resp = FeedResponse::fresh(json, FRESH_SECS);
            self.cache.put(&key, resp.stored.clone()).await;

            tracing::info!(
                target: "feeds",
                endpoint = %ep.url,
                records = posts.len(),
                "microblog feed refreshed"
            );
            return Ok(Some(resp));
        }
        Ok(None)
    }

    fn endpoint_failed(&self, ep: &FeedEndpoint, why: &'static str) {
        tracing::debug!(target: "feeds", endpoint = %ep.url, shape = ?ep.shape, why, "endpoint skipped");
        counter!("feed_endpoint_failures_total", "source" => SOURCE).increment(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DegradedReason {
    MirrorsDown,
    Internal,
}

fn degraded(handle: &str, reason: DegradedReason) -> FeedResponse {
    let description = match reason {
        DegradedReason::MirrorsDown => format!(
            "All upstream mirrors for @{handle} are currently unreachable. \
             Follow the link to view the profile directly."
        ),
        DegradedReason::Internal => {
            "Something went wrong while loading posts. Please try again later.".to_string()
        }
    };
    let post = NormalizedPost {
        source: PostSource::Microblog,
        title: "Feed temporarily unavailable".to_string(),
        description,
        url: profile_url(handle),
        thumbnail: None,
        published_at: String::new(),
    };
    // A single plain struct always serializes; the literal is a last resort.
    let body = serde_json::to_string(&[post]).unwrap_or_else(|_| "[]".to_string());
    FeedResponse::uncached(body)
}
