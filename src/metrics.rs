use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::feed::{microblog, video};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the feed series so they
    /// show up on `/metrics` before the first request.
    pub fn init() -> Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("feed_cache_hits_total", "Responses served from the response cache.");
        describe_counter!("feed_cache_misses_total", "Cache lookups that missed.");
        describe_counter!(
            "feed_endpoint_failures_total",
            "Upstream endpoints that yielded no usable records."
        );
        describe_counter!("feed_relay_attempts_total", "Fetches retried through the relay.");
        describe_counter!("feed_degraded_total", "Degraded or empty responses served.");

        // Static gauges with the freshness directives in use
        gauge!("feed_fresh_secs", "source" => "twitter").set(f64::from(microblog::FRESH_SECS));
        gauge!("feed_fresh_secs", "source" => "youtube").set(f64::from(video::FRESH_SECS));

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
