// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod feed;
pub mod metrics;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tracing::info;

pub use crate::api::{router, AppState};
pub use crate::config::FeedsConfig;
pub use crate::feed::{NormalizedPost, PostSource};

use crate::feed::{HttpFetcher, MemoryCache};

/// Build the production router: config from env/file, a real HTTP fetcher and
/// an in-process response cache.
pub async fn app() -> Result<Router> {
    let config = FeedsConfig::from_env()?;
    info!(
        handle = %config.handle,
        mirrors = config.mirror_hosts.len(),
        channel = %config.channel_id,
        api_key = config.api_key.is_some(),
        "feeds config loaded"
    );
    let fetcher = Arc::new(HttpFetcher::new()?);
    let cache = Arc::new(MemoryCache::new());
    Ok(api::router(AppState::new(config, fetcher, cache)))
}
