// src/feed/mod.rs
pub mod cache;
pub mod canonical;
pub mod fetch;
pub mod microblog;
pub mod mirrors;
pub mod normalize;
pub mod parser;
pub mod text;
pub mod types;
pub mod video;

pub use cache::{MemoryCache, ResponseCache};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use microblog::MicroblogPipeline;
pub use types::{CacheStatus, CachedResponse, FeedResponse, NormalizedPost, PostSource};
pub use video::VideoPipeline;
