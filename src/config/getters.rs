//! Getter methods for `TestOptions`

use std::sync::Arc;

use super::types::{AnalyzerFlags, RetryBackoff, TestOptions};
use crate::audit_engine::events::AuditEventHandler;

impl TestOptions {
    #[must_use]
    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts a single URL may consume
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    #[must_use]
    pub fn retry_backoff(&self) -> RetryBackoff {
        self.retry_backoff
    }

    #[must_use]
    pub fn flags(&self) -> &AnalyzerFlags {
        &self.flags
    }

    #[must_use]
    pub fn event_handler(&self) -> Arc<dyn AuditEventHandler> {
        self.event_callbacks.handler()
    }

    /// Apply `max_pages` to a URL list, keeping input order
    #[must_use]
    pub fn plan<'a>(&self, urls: &'a [String]) -> &'a [String] {
        match self.max_pages {
            Some(limit) if limit < urls.len() => &urls[..limit],
            _ => urls,
        }
    }
}
