use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;

use crate::config::FeedsConfig;
use crate::feed::types::JSON_CONTENT_TYPE;
use crate::feed::{
    CacheStatus, FeedResponse, Fetcher, MicroblogPipeline, ResponseCache, VideoPipeline,
};

pub const CACHE_DIAG_HEADER: &str = "x-feed-cache";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FeedsConfig>,
    pub microblog: Arc<MicroblogPipeline>,
    pub video: Arc<VideoPipeline>,
}

impl AppState {
    /// Both pipelines share one fetcher and one response cache.
    pub fn new(config: FeedsConfig, fetcher: Arc<dyn Fetcher>, cache: Arc<dyn ResponseCache>) -> Self {
        let microblog = MicroblogPipeline::new(fetcher.clone(), cache.clone(), config.relay_base.clone());
        let video = VideoPipeline::new(fetcher, cache);
        Self::from_parts(config, microblog, video)
    }

    pub fn from_parts(config: FeedsConfig, microblog: MicroblogPipeline, video: VideoPipeline) -> Self {
        Self {
            config: Arc::new(config),
            microblog: Arc::new(microblog),
            video: Arc::new(video),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/twitter", get(twitter))
        .route("/api/youtube", get(youtube))
        .route("/api/feed", get(combined))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Alias used by tests and the binary.
pub fn router(state: AppState) -> Router {
    create_router(state)
}

impl IntoResponse for FeedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.stored.status).unwrap_or(StatusCode::OK);
        let mut resp = (status, self.stored.body.clone()).into_response();
        let headers = resp.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        if let Some(cc) = self.stored.cache_control() {
            if let Ok(v) = HeaderValue::from_str(&cc) {
                headers.insert(header::CACHE_CONTROL, v);
            }
        }
        headers.insert(
            CACHE_DIAG_HEADER,
            HeaderValue::from_static(self.cache.as_str()),
        );
        resp
    }
}

async fn twitter(State(state): State<AppState>) -> FeedResponse {
    microblog_feed(&state).await
}

async fn youtube(State(state): State<AppState>) -> FeedResponse {
    video_feed(&state).await
}

async fn microblog_feed(state: &AppState) -> FeedResponse {
    state
        .microblog
        .respond(&state.config.handle, &state.config.mirror_hosts)
        .await
}

async fn video_feed(state: &AppState) -> FeedResponse {
    state
        .video
        .respond(&state.config.channel_id, state.config.api_key.as_deref())
        .await
}

/// Both sources at once; results are independent, so they run concurrently
/// and are concatenated video first.
async fn combined(State(state): State<AppState>) -> FeedResponse {
    let (video, micro) = tokio::join!(video_feed(&state), microblog_feed(&state));

    let mut posts = video.posts();
    posts.extend(micro.posts());
    let body = serde_json::to_string(&posts).unwrap_or_else(|_| "[]".to_string());

    match (video.max_age(), micro.max_age()) {
        (Some(a), Some(b)) => FeedResponse {
            cache: CacheStatus::Bypass,
            ..FeedResponse::fresh(body, a.min(b))
        },
        _ => FeedResponse::uncached(body),
    }
}
