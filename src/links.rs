//! Link extraction and normalization for crawled pages.

use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href]").expect("BUG: hardcoded CSS selector 'a[href]' is invalid")
});

/// Returns the `href` of every anchor that has one, in document order.
///
/// Empty `href` values are kept; nothing is deduplicated.
pub fn extract_links(markup: &str) -> Vec<String> {
    let document = Html::parse_document(markup);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Keeps the first `limit` links.
///
/// A negative limit counts from the end instead: `-1` keeps every link but
/// the last, and a limit below `-len` keeps nothing.
pub fn bound_links(mut links: Vec<String>, limit: i64) -> Vec<String> {
    let keep = if limit >= 0 {
        usize::try_from(limit).unwrap_or(usize::MAX)
    } else {
        let dropped = usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX);
        links.len().saturating_sub(dropped)
    };
    links.truncate(keep);
    links
}

/// Makes every link absolute by prefixing non-HTTP(S) links with `base`.
///
/// This is plain string concatenation: `("/a", "http://example.com")` becomes
/// `http://example.com/a`, and `("a", "http://example.com/dir")` becomes
/// `http://example.com/dira`. Length and order are preserved.
pub fn normalize_links(links: &[String], base: &str) -> Vec<String> {
    links
        .iter()
        .map(|link| {
            if has_http_scheme(link) {
                link.clone()
            } else {
                format!("{base}{link}")
            }
        })
        .collect()
}

pub fn has_http_scheme(link: &str) -> bool {
    link.starts_with("http://") || link.starts_with("https://")
}

pub fn validate_url(url: &str) -> Result<Url, url::ParseError> {
    let parsed = Url::parse(url)?;

    // Ensure it's HTTP or HTTPS
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(url::ParseError::RelativeUrlWithoutBase),
    }
}
