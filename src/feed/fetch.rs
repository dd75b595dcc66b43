// src/feed/fetch.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use thiserror::Error;

/// Base of the text-extraction relay. The target, minus its scheme, is
/// appended as a sub-path.
pub const DEFAULT_RELAY_BASE: &str = "https://r.jina.ai/";

pub const USER_AGENT: &str = concat!(
    "social-feed/",
    env!("CARGO_PKG_VERSION"),
    " (+feed aggregator)"
);

/// Why a single GET produced no usable body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("upstream returned an empty body")]
    EmptyBody,
}

/// One plain GET. Implementations report every failure as `FetchError`;
/// callers decide whether to fall back.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(body)
    }
}

/// `https://host/a?b` → `<relay>/host/a?b`
pub fn relay_url(relay_base: &str, target: &str) -> String {
    let stripped = target
        .strip_prefix("https://")
        .or_else(|| target.strip_prefix("http://"))
        .unwrap_or(target);
    format!("{}/{}", relay_base.trim_end_matches('/'), stripped)
}

/// Direct GET, then at most one retry through the relay. Returns `""` when both
/// fail; never errors.
pub async fn fetch_body(fetcher: &dyn Fetcher, url: &str, relay_base: &str) -> String {
    match fetcher.get_text(url).await {
        Ok(body) if !body.trim().is_empty() => return body,
        Ok(_) => tracing::debug!(target: "feeds", endpoint = url, "direct fetch returned empty body"),
        Err(e) => tracing::debug!(target: "feeds", endpoint = url, error = %e, "direct fetch failed"),
    }

    if relay_base.trim().is_empty() {
        return String::new();
    }

    let relayed = relay_url(relay_base, url);
    counter!("feed_relay_attempts_total").increment(1);
    match fetcher.get_text(&relayed).await {
        Ok(body) if !body.trim().is_empty() => {
            tracing::info!(target: "feeds", endpoint = url, "served through relay");
            body
        }
        Ok(_) => String::new(),
        Err(e) => {
            tracing::debug!(target: "feeds", endpoint = %relayed, error = %e, "relay fetch failed");
            String::new()
        }
    }
}
