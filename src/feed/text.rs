// src/feed/text.rs
use once_cell::sync::Lazy;
use regex::Regex;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

const MAX_TEXT_CHARS: usize = 1500;

static RE_CDATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("cdata regex"));
static RE_COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex"));
// Only element-shaped tags; a bare `<` in prose (`a < b`, `<3`) survives
static RE_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)</?[a-z][a-z0-9:-]*\b[^<>]*>").expect("tags regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Display text: unwrap CDATA, decode entities, strip tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    // 1) CDATA wrappers carry raw markup; keep the inside
    let unwrapped = RE_CDATA.replace_all(s, "$1");

    // 2) Decode first so escaped markup (&lt;p&gt;) is stripped too
    let decoded = html_escape::decode_html_entities(&unwrapped).to_string();

    // 3) Strip comments and tags
    let uncommented = RE_COMMENTS.replace_all(&decoded, " ");
    let stripped = RE_TAGS.replace_all(&uncommented, " ");

    // 4) Collapse whitespace (incl. NBSP)
    let mut out = RE_WS
        .replace_all(&stripped.replace('\u{00A0}', " "), " ")
        .trim()
        .to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// Links and attribute values: unwrap CDATA, decode entities, trim.
pub fn clean_link(s: &str) -> String {
    let unwrapped = RE_CDATA.replace_all(s, "$1");
    html_escape::decode_html_entities(unwrapped.trim())
        .trim()
        .to_string()
}

/// First `n` characters, on char boundaries.
pub fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// RFC 3339 / RFC 2822 → RFC 3339; anything else → `""`.
pub fn iso_published(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return String::new();
    }
    OffsetDateTime::parse(s, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc2822))
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaped_markup_is_decoded_then_stripped() {
        let s = "&lt;p&gt;Hello&nbsp;<b>world</b>&lt;/p&gt;";
        assert_eq!(clean_text(s), "Hello world");
    }

    #[test]
    fn escaped_comparisons_are_kept_as_text() {
        assert_eq!(clean_text("a &lt; b and c &gt; d"), "a < b and c > d");
        assert_eq!(clean_text("I &lt;3 this -&gt; great"), "I <3 this -> great");
        // a second pass over already-clean text is a no-op
        assert_eq!(clean_text("a < b and c > d"), "a < b and c > d");
    }

    #[test]
    fn comments_and_attributed_tags_are_stripped() {
        assert_eq!(
            clean_text(r#"<!-- ad --><a href="https://x.com/a">link</a><br/>tail"#),
            "link tail"
        );
    }

    #[test]
    fn cdata_is_unwrapped() {
        assert_eq!(clean_text("<![CDATA[<i>Hi</i> there]]>"), "Hi there");
        assert_eq!(
            clean_link(" <![CDATA[https://x.com/a?b=1&amp;c=2]]> "),
            "https://x.com/a?b=1&c=2"
        );
    }

    #[test]
    fn long_text_is_capped() {
        let s = "y".repeat(3000);
        assert_eq!(clean_text(&s).chars().count(), 1500);
    }

    #[test]
    fn dates_become_rfc3339_or_empty() {
        assert_eq!(
            iso_published("Tue, 01 Oct 2024 12:30:00 +0000"),
            "2024-10-01T12:30:00Z"
        );
        assert_eq!(
            iso_published("2024-10-01T12:30:00+02:00"),
            "2024-10-01T12:30:00+02:00"
        );
        assert_eq!(iso_published("yesterday"), "");
        assert_eq!(iso_published(""), "");
    }
}
