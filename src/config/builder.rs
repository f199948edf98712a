//! Fluent builder for `TestOptions`
//!
//! Every setter is infallible; limits are checked once in [`TestOptionsBuilder::build`].

use std::sync::Arc;

use super::types::{AnalyzerFlags, EventCallbacks, RetryBackoff, TestOptions};
use crate::audit_engine::events::AuditEventHandler;
use crate::errors::ConfigError;
use crate::utils::{MAX_CONCURRENT_LIMIT, MAX_RETRIES_LIMIT};

#[derive(Debug, Clone, Default)]
pub struct TestOptionsBuilder {
    options: TestOptions,
}

impl TestOptions {
    /// Create a builder starting from the defaults
    #[must_use]
    pub fn builder() -> TestOptionsBuilder {
        TestOptionsBuilder::default()
    }
}

impl TestOptionsBuilder {
    /// Audit at most `limit` pages from the input list
    ///
    /// `0` means unlimited, matching the command line convention.
    #[must_use]
    pub fn max_pages(mut self, limit: usize) -> Self {
        self.options.max_pages = (limit > 0).then_some(limit);
        self
    }

    /// Per-attempt budget covering navigation and all analyzers
    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.options.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.options.max_concurrent = n;
        self
    }

    /// Retries after the first attempt; `0` disables retrying
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.options.max_retries = retries;
        self
    }

    #[must_use]
    pub fn retry_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.options.retry_backoff = backoff;
        self
    }

    /// Replace all analyzer flags at once
    #[must_use]
    pub fn analyzers(mut self, flags: AnalyzerFlags) -> Self {
        self.options.flags = flags;
        self
    }

    #[must_use]
    pub fn collect_performance_metrics(mut self, on: bool) -> Self {
        self.options.flags.collect_performance_metrics = on;
        self
    }

    #[must_use]
    pub fn use_pa11y(mut self, on: bool) -> Self {
        self.options.flags.use_pa11y = on;
        self
    }

    #[must_use]
    pub fn include_seo_analysis(mut self, on: bool) -> Self {
        self.options.flags.include_seo_analysis = on;
        self
    }

    #[must_use]
    pub fn include_social_analysis(mut self, on: bool) -> Self {
        self.options.flags.include_social_analysis = on;
        self
    }

    #[must_use]
    pub fn include_technical_seo(mut self, on: bool) -> Self {
        self.options.flags.include_technical_seo = on;
        self
    }

    #[must_use]
    pub fn include_security_analysis(mut self, on: bool) -> Self {
        self.options.flags.include_security_analysis = on;
        self
    }

    #[must_use]
    pub fn include_structured_data(mut self, on: bool) -> Self {
        self.options.flags.include_structured_data = on;
        self
    }

    #[must_use]
    pub fn include_mobile_analysis(mut self, on: bool) -> Self {
        self.options.flags.include_mobile_analysis = on;
        self
    }

    /// Receive lifecycle callbacks for every URL in the run
    #[must_use]
    pub fn event_callbacks(mut self, handler: Arc<dyn AuditEventHandler>) -> Self {
        self.options.event_callbacks = EventCallbacks::new(handler);
        self
    }

    /// Validate limits and produce the options
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any limit in [`TestOptions::validate`] is violated.
    pub fn build(self) -> Result<TestOptions, ConfigError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

impl TestOptions {
    /// Check option limits
    ///
    /// Both the builder and deserialization go through this.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `max_concurrent` is outside `1..=64`,
    /// `timeout_secs` is zero, `max_retries` exceeds 10 or an exponential
    /// backoff cap is below its base.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 || self.max_concurrent > MAX_CONCURRENT_LIMIT {
            return Err(ConfigError::MaxConcurrent {
                value: self.max_concurrent,
                max: MAX_CONCURRENT_LIMIT,
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::MaxRetries {
                value: self.max_retries,
                max: MAX_RETRIES_LIMIT,
            });
        }
        if let RetryBackoff::Exponential { base_ms, max_ms } = self.retry_backoff
            && max_ms < base_ms
        {
            return Err(ConfigError::Backoff(format!(
                "exponential cap {max_ms}ms is below base {base_ms}ms"
            )));
        }
        Ok(())
    }
}
