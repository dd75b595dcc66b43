// src/feed/canonical.rs
//! Rehomes microblog permalinks onto the platform's own domain.
//!
//! Mirrors serve permalinks under their own hostname; those links must never
//! be shown as the "canonical" link, and neither may any other foreign domain.

use url::Url;

/// Primary platform domain; mirror hostnames are rewritten to this.
pub const PRIMARY_DOMAIN: &str = "x.com";
/// Domains accepted as canonical (exact match or subdomain).
pub const ACCEPTED_DOMAINS: [&str; 2] = ["x.com", "twitter.com"];
/// Any hostname containing this is treated as a mirror.
pub const MIRROR_MARKER: &str = "nitter";

/// Returns the canonical https permalink, or `""` when `raw` cannot be
/// canonicalized (callers then fall back to the raw link).
pub fn canonicalize(raw: &str) -> String {
    let Ok(mut u) = Url::parse(raw.trim()) else {
        return String::new();
    };
    if u.scheme() != "http" && u.scheme() != "https" {
        return String::new();
    }
    if u.set_scheme("https").is_err() {
        return String::new();
    }

    let host = u.host_str().unwrap_or_default().to_ascii_lowercase();
    if host.contains(MIRROR_MARKER) {
        if u.set_host(Some(PRIMARY_DOMAIN)).is_err() {
            return String::new();
        }
        // mirror ports mean nothing on the platform domain
        if u.set_port(None).is_err() {
            return String::new();
        }
    }

    let host = u.host_str().unwrap_or_default().to_ascii_lowercase();
    if !is_accepted_host(&host) {
        return String::new();
    }

    u.set_fragment(None);
    u.to_string()
}

/// `canonicalize`, falling back to the trimmed raw link.
pub fn canonical_or_raw(raw: &str) -> String {
    let c = canonicalize(raw);
    if c.is_empty() {
        raw.trim().to_string()
    } else {
        c
    }
}

/// Public profile page for `handle` on the primary domain.
pub fn profile_url(handle: &str) -> String {
    format!("https://{PRIMARY_DOMAIN}/{handle}")
}

fn is_accepted_host(host: &str) -> bool {
    ACCEPTED_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}
