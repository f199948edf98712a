//! Where audit URLs come from: plain URL files and XML sitemaps

use regex::Regex;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use crate::errors::AuditError;
use crate::utils::{CHROME_USER_AGENT, DEFAULT_TIMEOUT_SECS, MAX_SITEMAP_DEPTH, is_valid_url};

static LOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").expect("loc regex is hardcoded and valid")
});

/// Read one URL per line, skipping blanks, `#` comments and non-http(s) entries
pub async fn read_url_file(path: impl AsRef<Path>) -> Result<Vec<String>, AuditError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;

    let mut urls = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if is_valid_url(line) {
            urls.push(line.to_string());
        } else {
            log::warn!(
                "{}:{}: skipping invalid URL '{}'",
                path.display(),
                line_no + 1,
                line
            );
        }
    }

    log::info!("Read {} URLs from {}", urls.len(), path.display());
    Ok(urls)
}

/// Page URLs listed in the `<loc>` elements of an XML document
///
/// Entity-escaped ampersands are decoded and invalid URLs dropped.
#[must_use]
pub fn extract_locs(xml: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(xml)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
        .filter(|loc| is_valid_url(loc))
        .collect()
}

fn is_sitemap_index(xml: &str) -> bool {
    xml.contains("<sitemapindex")
}

/// Fetch a sitemap and return the page URLs it lists
///
/// Sitemap indexes are followed up to a fixed depth. The root sitemap must
/// load; a nested one that fails is logged and skipped. URLs keep document
/// order with duplicates removed.
pub async fn parse_sitemap(url: &str) -> Result<Vec<String>, AuditError> {
    let client = Client::builder()
        .user_agent(CHROME_USER_AGENT)
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()?;
    parse_sitemap_with(&client, url).await
}

pub async fn parse_sitemap_with(client: &Client, url: &str) -> Result<Vec<String>, AuditError> {
    let mut pending: VecDeque<(String, usize)> = VecDeque::from([(url.to_string(), 0)]);
    let mut visited_sitemaps = HashSet::new();
    let mut seen_pages = HashSet::new();
    let mut pages = Vec::new();

    while let Some((sitemap_url, depth)) = pending.pop_front() {
        if !visited_sitemaps.insert(sitemap_url.clone()) {
            continue;
        }

        let body = match fetch_xml(client, &sitemap_url).await {
            Ok(body) => body,
            Err(e) if depth == 0 => return Err(e),
            Err(e) => {
                log::warn!("Skipping nested sitemap {sitemap_url}: {e}");
                continue;
            }
        };

        let locs = extract_locs(&body);
        if is_sitemap_index(&body) {
            if depth + 1 > MAX_SITEMAP_DEPTH {
                log::warn!(
                    "Sitemap index {} exceeds nesting depth {}, not following {} entries",
                    sitemap_url,
                    MAX_SITEMAP_DEPTH,
                    locs.len()
                );
                continue;
            }
            log::debug!("Sitemap index {} lists {} sitemaps", sitemap_url, locs.len());
            pending.extend(locs.into_iter().map(|loc| (loc, depth + 1)));
        } else {
            for loc in locs {
                if seen_pages.insert(loc.clone()) {
                    pages.push(loc);
                }
            }
        }
    }

    log::info!("Sitemap {} yielded {} URLs", url, pages.len());
    Ok(pages)
}

async fn fetch_xml(client: &Client, url: &str) -> Result<String, AuditError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AuditError::SitemapParse {
            url: url.to_string(),
            message: format!("HTTP {status}"),
        });
    }
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locs_are_trimmed_and_unescaped() {
        let xml = r"<urlset>
            <url><loc> https://example.com/a?x=1&amp;y=2 </loc></url>
            <url><LOC>https://example.com/b</LOC></url>
            <url><loc>ftp://example.com/c</loc></url>
        </urlset>";
        let locs = extract_locs(xml);
        assert_eq!(
            locs,
            vec!["https://example.com/a?x=1&y=2", "https://example.com/b"]
        );
    }

    #[test]
    fn index_detection() {
        assert!(is_sitemap_index("<?xml?><sitemapindex xmlns=\"x\"></sitemapindex>"));
        assert!(!is_sitemap_index("<urlset></urlset>"));
    }
}
