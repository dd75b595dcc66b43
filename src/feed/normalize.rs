// src/feed/normalize.rs
//! Field coalescing: a [`RawRecord`] carries several legacy aliases per field;
//! the first non-empty one in the documented precedence wins.

use crate::feed::canonical::canonical_or_raw;
use crate::feed::parser::RawRecord;
use crate::feed::text::{clean_text, iso_published, truncate_chars};
use crate::feed::types::{NormalizedPost, PostSource};

pub const MICROBLOG_TITLE_PLACEHOLDER: &str = "Post";
pub const VIDEO_TITLE_PLACEHOLDER: &str = "Untitled";
const TITLE_FROM_DESCRIPTION_CHARS: usize = 80;

fn first(candidates: &[&Option<String>]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// First alias whose cleaned text is non-empty. A markup-only value (`<br>`)
/// counts as absent.
fn first_clean(candidates: &[&Option<String>]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(clean_text)
        .find(|s| !s.is_empty())
}

/// title → text → description (first 80 chars) → placeholder
fn title_of(r: &RawRecord, placeholder: &str) -> String {
    first_clean(&[&r.title, &r.text])
        .or_else(|| {
            first_clean(&[&r.description])
                .map(|d| truncate_chars(&d, TITLE_FROM_DESCRIPTION_CHARS))
        })
        .unwrap_or_else(|| placeholder.to_string())
}

/// text → description → content → summary
fn description_of(r: &RawRecord) -> String {
    first_clean(&[&r.text, &r.description, &r.content, &r.summary]).unwrap_or_default()
}

/// url → link → permalink
fn permalink_of(r: &RawRecord) -> String {
    first(&[&r.url, &r.link, &r.permalink]).unwrap_or_default()
}

/// published → pubDate → date → created_at → updated
fn published_of(r: &RawRecord) -> String {
    first(&[&r.published, &r.pub_date, &r.date, &r.created_at, &r.updated])
        .map(|s| iso_published(&s))
        .unwrap_or_default()
}

/// thumbnail → image → enclosure url
fn thumbnail_of(r: &RawRecord) -> Option<String> {
    first(&[&r.thumbnail, &r.image, &r.enclosure_url])
}

/// Map one record into a post. Microblog permalinks are canonicalized, falling
/// back to the raw link; video links are taken as served.
pub fn normalize_record(r: &RawRecord, source: PostSource) -> NormalizedPost {
    let raw_url = permalink_of(r);
    let (url, placeholder) = match source {
        PostSource::Microblog => (canonical_or_raw(&raw_url), MICROBLOG_TITLE_PLACEHOLDER),
        PostSource::Video => (raw_url, VIDEO_TITLE_PLACEHOLDER),
    };
    NormalizedPost {
        source,
        title: title_of(r, placeholder),
        description: description_of(r),
        url,
        thumbnail: thumbnail_of(r),
        published_at: published_of(r),
    }
}

pub fn normalize_all(records: &[RawRecord], source: PostSource) -> Vec<NormalizedPost> {
    records
        .iter()
        .map(|r| normalize_record(r, source))
        .collect()
}
