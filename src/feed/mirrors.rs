// src/feed/mirrors.rs
//! Turns a handle plus a host list into the ordered endpoints to try.
//! Ordering is static; a dead host just costs three iterations.

/// Known-working mirror hosts, in trial order.
pub const DEFAULT_MIRROR_HOSTS: [&str; 4] = [
    "https://nitter.privacyredirect.com",
    "https://nitter.net",
    "https://nitter.poast.org",
    "https://nitter.tiekoetter.com",
];

/// What kind of body an endpoint is expected to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointShape {
    /// `<host>/<handle>/rss?format=json`
    Structured,
    /// `<host>/<handle>/rss`
    Markup,
    /// `<host>/<handle>`, only good for permalink scraping.
    Page,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoint {
    pub url: String,
    pub shape: EndpointShape,
}

/// Emit three endpoints per host (structured, markup, page), preserving host
/// order. Empty hosts or an empty handle yield nothing.
pub fn resolve<S: AsRef<str>>(handle: &str, hosts: &[S]) -> Vec<FeedEndpoint> {
    let handle = clean_handle(handle);
    if handle.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(hosts.len() * 3);
    for host in hosts {
        let base = normalize_host(host.as_ref());
        if base.is_empty() {
            continue;
        }
        out.push(FeedEndpoint {
            url: format!("{base}/{handle}/rss?format=json"),
            shape: EndpointShape::Structured,
        });
        out.push(FeedEndpoint {
            url: format!("{base}/{handle}/rss"),
            shape: EndpointShape::Markup,
        });
        out.push(FeedEndpoint {
            url: format!("{base}/{handle}"),
            shape: EndpointShape::Page,
        });
    }
    out
}

/// Trim and drop a leading `@`.
pub fn clean_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').trim().to_string()
}

/// `nitter.net/` → `https://nitter.net`. Existing schemes are kept.
pub fn normalize_host(raw: &str) -> String {
    let h = raw.trim().trim_end_matches('/');
    if h.is_empty() {
        return String::new();
    }
    if h.starts_with("http://") || h.starts_with("https://") {
        h.to_string()
    } else {
        format!("https://{h}")
    }
}

/// Parse a comma-separated override. Blank entries and duplicates are dropped
/// (first occurrence wins); an override with nothing left means "use defaults".
pub fn parse_host_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let h = normalize_host(part);
        if !h.is_empty() && !out.contains(&h) {
            out.push(h);
        }
    }
    if out.is_empty() {
        default_hosts()
    } else {
        out
    }
}

pub fn default_hosts() -> Vec<String> {
    DEFAULT_MIRROR_HOSTS.iter().map(|s| s.to_string()).collect()
}
