// src/feed/video.rs
//! Video pipeline: structured API first (when a key is configured), markup
//! feed otherwise or when the API path yields nothing.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use metrics::counter;
use serde::Deserialize;
use url::Url;

use crate::feed::cache::{cache_key, ResponseCache};
use crate::feed::fetch::Fetcher;
use crate::feed::normalize::{normalize_all, VIDEO_TITLE_PLACEHOLDER};
use crate::feed::parser::parse_entries;
use crate::feed::text::{clean_text, iso_published};
use crate::feed::types::{FeedResponse, NormalizedPost, PostSource};

pub const CACHE_SCOPE: &str = "youtube";
pub const FRESH_SECS: u32 = 900;
/// Upstream page size; also the cap on returned items.
pub const MAX_ITEMS: usize = 50;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_FEED_BASE: &str = "https://www.youtube.com/feeds/videos.xml";

const SOURCE: &str = "youtube";

// ---- API payloads (only the fields we read) ----

#[derive(Debug, Deserialize)]
struct ChannelsResp {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    content_details: Option<ChannelDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelDetails {
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResp {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    content_details: ItemDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
    resource_id: Option<ResourceId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemDetails {
    video_id: Option<String>,
    video_published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    maxres: Option<Thumb>,
    standard: Option<Thumb>,
    high: Option<Thumb>,
    medium: Option<Thumb>,
    default: Option<Thumb>,
}

#[derive(Debug, Deserialize)]
struct Thumb {
    url: Option<String>,
}

impl Thumbnails {
    /// Highest resolution first: maxres → standard → high → medium → default.
    fn best(&self) -> Option<String> {
        [
            &self.maxres,
            &self.standard,
            &self.high,
            &self.medium,
            &self.default,
        ]
        .into_iter()
        .flatten()
        .filter_map(|t| t.url.as_deref())
        .find(|u| !u.trim().is_empty())
        .map(str::to_string)
    }
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl PlaylistItem {
    fn into_post(self) -> NormalizedPost {
        let s = &self.snippet;
        let d = &self.content_details;
        let video_id = s
            .resource_id
            .as_ref()
            .and_then(|r| non_blank(&r.video_id))
            .or_else(|| non_blank(&d.video_id))
            .unwrap_or_default();
        let url = if video_id.is_empty() {
            String::new()
        } else {
            format!("https://www.youtube.com/watch?v={video_id}")
        };
        let title = non_blank(&s.title)
            .map(clean_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| VIDEO_TITLE_PLACEHOLDER.to_string());
        let published = non_blank(&d.video_published_at)
            .or_else(|| non_blank(&s.published_at))
            .map(iso_published)
            .unwrap_or_default();

        NormalizedPost {
            source: PostSource::Video,
            title,
            description: non_blank(&s.description).map(clean_text).unwrap_or_default(),
            url,
            thumbnail: s.thumbnails.best(),
            published_at: published,
        }
    }
}

// ---- pipeline ----

pub struct VideoPipeline {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn ResponseCache>,
    api_base: String,
    feed_base: String,
}

impl VideoPipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            fetcher,
            cache,
            api_base: DEFAULT_API_BASE.to_string(),
            feed_base: DEFAULT_FEED_BASE.to_string(),
        }
    }

    pub fn with_bases(mut self, api_base: impl Into<String>, feed_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.feed_base = feed_base.into();
        self
    }

    /// Public markup feed for a channel.
    pub fn feed_url(&self, channel_id: &str) -> Result<String> {
        let u = Url::parse_with_params(&self.feed_base, &[("channel_id", channel_id)])
            .context("building channel feed url")?;
        Ok(u.to_string())
    }

    /// Cache source for a request: the API and markup paths never share entries.
    pub fn cache_source(&self, channel_id: &str, api_key: Option<&str>) -> Result<String> {
        match api_key {
            Some(_) => Ok(format!("api:{channel_id}")),
            None => self.feed_url(channel_id),
        }
    }

    /// Full request handling: cache, fetch, and the JSON response.
    /// No channel configured → `[]`, no I/O.
    pub async fn respond(&self, channel_id: &str, api_key: Option<&str>) -> FeedResponse {
        let channel_id = channel_id.trim();
        let api_key = api_key.map(str::trim).filter(|k| !k.is_empty());
        if channel_id.is_empty() {
            return FeedResponse::empty();
        }

        match self.respond_inner(channel_id, api_key).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(target: "feeds", channel = channel_id, error = ?e, "video pipeline failed");
                counter!("feed_degraded_total", "source" => SOURCE).increment(1);
                FeedResponse::empty()
            }
        }
    }

    async fn respond_inner(&self, channel_id: &str, api_key: Option<&str>) -> Result<FeedResponse> {
        let key = cache_key(CACHE_SCOPE, &self.cache_source(channel_id, api_key)?);
        if let Some(hit) = self.cache.get(&key).await {
            counter!("feed_cache_hits_total", "source" => SOURCE).increment(1);
            return Ok(FeedResponse::from_cache(hit));
        }
        counter!("feed_cache_misses_total", "source" => SOURCE).increment(1);

        let posts = self.get_video_posts(channel_id, api_key).await;
        if posts.is_empty() {
            counter!("feed_degraded_total", "source" => SOURCE).increment(1);
            return Ok(FeedResponse::empty());
        }

        let json = serde_json::to_string(&posts).context("serializing video posts")?;
        let resp = FeedResponse::fresh(json, FRESH_SECS);
        self.cache.put(&key, resp.stored.clone()).await;
        tracing::info!(target: "feeds", channel = channel_id, records = posts.len(), "video feed refreshed");
        Ok(resp)
    }

    /// API path when a key is present, markup feed when it is absent or the
    /// API yields nothing. Never errors.
    pub async fn get_video_posts(&self, channel_id: &str, api_key: Option<&str>) -> Vec<NormalizedPost> {
        if let Some(key) = api_key {
            match self.api_posts(channel_id, key).await {
                Ok(posts) if !posts.is_empty() => return posts,
                Ok(_) => tracing::info!(target: "feeds", channel = channel_id, "API returned no items; using feed"),
                Err(e) => {
                    tracing::warn!(target: "feeds", channel = channel_id, error = %e, "API path failed; using feed");
                    counter!("feed_endpoint_failures_total", "source" => SOURCE).increment(1);
                }
            }
        }

        match self.markup_posts(channel_id).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(target: "feeds", channel = channel_id, error = %e, "channel feed failed");
                counter!("feed_endpoint_failures_total", "source" => SOURCE).increment(1);
                Vec::new()
            }
        }
    }

    async fn api_posts(&self, channel_id: &str, api_key: &str) -> Result<Vec<NormalizedPost>> {
        let uploads = self.uploads_playlist(channel_id, api_key).await?;
        let items = self.playlist_items(&uploads, api_key).await?;
        Ok(items
            .into_iter()
            .take(MAX_ITEMS)
            .map(PlaylistItem::into_post)
            .collect())
    }

    /// Resolve the channel's uploads collection.
    async fn uploads_playlist(&self, channel_id: &str, api_key: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &format!("{}/channels", self.api_base.trim_end_matches('/')),
            &[("part", "contentDetails"), ("id", channel_id), ("key", api_key)],
        )
        .context("building channels url")?;
        let body = self.fetcher.get_text(url.as_str()).await.context("channels request")?;
        let resp: ChannelsResp = serde_json::from_str(&body).context("parsing channels json")?;
        resp.items
            .into_iter()
            .filter_map(|i| i.content_details?.related_playlists?.uploads)
            .find(|u| !u.trim().is_empty())
            .ok_or_else(|| anyhow!("no uploads playlist for channel {channel_id}"))
    }

    /// Newest-first items of a collection, as upstream orders them.
    async fn playlist_items(&self, playlist_id: &str, api_key: &str) -> Result<Vec<PlaylistItem>> {
        let max = MAX_ITEMS.to_string();
        let url = Url::parse_with_params(
            &format!("{}/playlistItems", self.api_base.trim_end_matches('/')),
            &[
                ("part", "snippet,contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", max.as_str()),
                ("key", api_key),
            ],
        )
        .context("building playlistItems url")?;
        let body = self
            .fetcher
            .get_text(url.as_str())
            .await
            .context("playlistItems request")?;
        let resp: PlaylistItemsResp =
            serde_json::from_str(&body).context("parsing playlistItems json")?;
        Ok(resp.items)
    }

    async fn markup_posts(&self, channel_id: &str) -> Result<Vec<NormalizedPost>> {
        let url = self.feed_url(channel_id)?;
        let body = self.fetcher.get_text(&url).await.context("channel feed request")?;
        Ok(normalize_all(&parse_entries(&body), PostSource::Video))
    }
}
