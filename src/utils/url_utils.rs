//! URL utilities for audit planning and redirect detection.

use url::Url;

/// Check if a URL is valid for auditing (http or https only)
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Reduce a URL to the parts that decide whether navigation was redirected:
/// scheme + host + port, and the path without a trailing slash.
///
/// Query strings and fragments are ignored, so tracking parameters added by
/// the server do not count as a redirect.
#[must_use]
pub fn normalize_for_comparison(url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin().ascii_serialization();
    let path = parsed.path().trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };
    Some((origin, path.to_string()))
}

/// Whether the settled URL differs from the requested one in origin or path
///
/// Unparseable URLs fall back to a plain string comparison.
#[must_use]
pub fn is_redirect(requested: &str, settled: &str) -> bool {
    match (
        normalize_for_comparison(requested),
        normalize_for_comparison(settled),
    ) {
        (Some(a), Some(b)) => a != b,
        _ => requested.trim_end_matches('/') != settled.trim_end_matches('/'),
    }
}
