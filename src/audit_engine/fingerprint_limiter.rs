//! Per-URL exclusivity
//!
//! A URL listed twice in one run is audited twice, but never by two workers at
//! the same time.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Single-permit semaphore per URL fingerprint, lazily created
#[derive(Debug, Default)]
pub struct FingerprintLimiter {
    permits: DashMap<String, Arc<Semaphore>>,
}

impl FingerprintLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical key for a URL: parsed and re-serialized, fragment dropped
    #[must_use]
    pub fn fingerprint(url: &str) -> String {
        match url::Url::parse(url.trim()) {
            Ok(mut parsed) => {
                parsed.set_fragment(None);
                parsed.to_string()
            }
            Err(_) => url.trim().to_string(),
        }
    }

    /// Wait until no other task holds `url`
    ///
    /// The semaphores are never closed, so `None` only appears if that
    /// invariant is broken.
    pub async fn acquire(&self, url: &str) -> Option<OwnedSemaphorePermit> {
        let semaphore = self
            .permits
            .entry(Self::fingerprint(url))
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone();

        match semaphore.acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => {
                log::error!("Fingerprint semaphore for '{url}' was closed unexpectedly");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fragment_does_not_change_fingerprint() {
        assert_eq!(
            FingerprintLimiter::fingerprint("https://Example.com/a#top"),
            FingerprintLimiter::fingerprint("https://example.com/a")
        );
    }

    #[tokio::test]
    async fn same_url_waits_for_holder() {
        let limiter = FingerprintLimiter::new();
        let held = limiter.acquire("https://example.com/").await;
        assert!(held.is_some());

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), limiter.acquire("https://example.com"))
                .await;
        assert!(blocked.is_err());

        let other = limiter.acquire("https://example.com/other").await;
        assert!(other.is_some());

        drop(held);
        assert!(limiter.acquire("https://example.com/").await.is_some());
    }
}
