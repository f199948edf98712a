//! Core configuration types for audit runs
//!
//! `TestOptions` controls a single batch: how many pages, how many at once,
//! how long each attempt may take, how failures are retried and which
//! analyzers run. `DebugConfig` controls the optional diagnostic session.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::audit_engine::events::{AuditEventHandler, NoOpEventHandler};
use crate::errors::ConfigError;
use crate::utils::{
    DEFAULT_DEBUG_OUTPUT_DIR, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_RETRIES,
    DEFAULT_MEMORY_WARNING_THRESHOLD_MB, DEFAULT_SNAPSHOT_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS,
};

/// Which optional analyzers run for each page
///
/// The core accessibility analyzer always runs and has no flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerFlags {
    pub collect_performance_metrics: bool,
    pub use_pa11y: bool,
    pub include_seo_analysis: bool,
    pub include_social_analysis: bool,
    pub include_technical_seo: bool,
    pub include_security_analysis: bool,
    pub include_structured_data: bool,
    pub include_mobile_analysis: bool,
}

impl AnalyzerFlags {
    /// Every optional analyzer enabled
    #[must_use]
    pub const fn all() -> Self {
        Self {
            collect_performance_metrics: true,
            use_pa11y: true,
            include_seo_analysis: true,
            include_social_analysis: true,
            include_technical_seo: true,
            include_security_analysis: true,
            include_structured_data: true,
            include_mobile_analysis: true,
        }
    }
}

/// Delay policy between attempts of the same URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RetryBackoff {
    /// Retry as soon as the failed page has been discarded
    #[default]
    Immediate,
    Fixed { delay_ms: u64 },
    /// `base_ms * 2^(attempt-1)`, capped at `max_ms`
    Exponential { base_ms: u64, max_ms: u64 },
}

impl RetryBackoff {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Self::Immediate => Duration::ZERO,
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { base_ms, max_ms } => {
                let shift = attempt.saturating_sub(1).min(20);
                let delay = base_ms.saturating_mul(1u64 << shift).min(max_ms);
                Duration::from_millis(delay)
            }
        }
    }
}

/// Shared handle to the caller's lifecycle callbacks
#[derive(Clone)]
pub struct EventCallbacks(pub(crate) Arc<dyn AuditEventHandler>);

impl EventCallbacks {
    pub fn new(handler: Arc<dyn AuditEventHandler>) -> Self {
        Self(handler)
    }

    #[must_use]
    pub fn handler(&self) -> Arc<dyn AuditEventHandler> {
        Arc::clone(&self.0)
    }
}

impl Default for EventCallbacks {
    fn default() -> Self {
        Self(Arc::new(NoOpEventHandler))
    }
}

impl std::fmt::Debug for EventCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EventCallbacks(..)")
    }
}

/// Options for one audit run
///
/// Deserialized options pass the same limit checks as
/// [`TestOptionsBuilder::build`](super::TestOptionsBuilder::build).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTestOptions")]
pub struct TestOptions {
    /// Truncate the URL list to this many entries (`None` = unlimited)
    pub(crate) max_pages: Option<usize>,

    /// Budget in seconds for one attempt: navigation plus every analyzer
    pub(crate) timeout_secs: u64,

    /// Upper bound on pages navigating or analyzing at the same time
    pub(crate) max_concurrent: usize,

    /// Extra attempts after the first; total attempts ≤ `max_retries + 1`
    pub(crate) max_retries: u32,

    pub(crate) retry_backoff: RetryBackoff,

    #[serde(flatten)]
    pub(crate) flags: AnalyzerFlags,

    #[serde(skip)]
    pub(crate) event_callbacks: EventCallbacks,
}

/// Wire form of [`TestOptions`], checked before it becomes one
#[derive(Deserialize)]
struct RawTestOptions {
    max_pages: Option<usize>,
    timeout_secs: u64,
    max_concurrent: usize,
    max_retries: u32,
    retry_backoff: RetryBackoff,
    #[serde(flatten)]
    flags: AnalyzerFlags,
}

impl TryFrom<RawTestOptions> for TestOptions {
    type Error = ConfigError;

    fn try_from(raw: RawTestOptions) -> Result<Self, Self::Error> {
        let options = Self {
            max_pages: raw.max_pages.filter(|&limit| limit > 0),
            timeout_secs: raw.timeout_secs,
            max_concurrent: raw.max_concurrent,
            max_retries: raw.max_retries,
            retry_backoff: raw.retry_backoff,
            flags: raw.flags,
            event_callbacks: EventCallbacks::default(),
        };
        options.validate()?;
        Ok(options)
    }
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            max_pages: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: RetryBackoff::default(),
            flags: AnalyzerFlags::default(),
            event_callbacks: EventCallbacks::default(),
        }
    }
}

/// Settings for an [`AuditDebugger`](crate::debugger::AuditDebugger) session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    pub snapshot_interval: Duration,
    pub memory_warning_threshold_mb: u64,
    pub output_dir: PathBuf,
    /// File name prefix for persisted artifacts; defaults to `audit-<session id>`
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: Duration::from_secs(DEFAULT_SNAPSHOT_INTERVAL_SECS),
            memory_warning_threshold_mb: DEFAULT_MEMORY_WARNING_THRESHOLD_MB,
            output_dir: PathBuf::from(DEFAULT_DEBUG_OUTPUT_DIR),
            file_prefix: None,
        }
    }
}

impl DebugConfig {
    #[must_use]
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = interval;
        self
    }

    #[must_use]
    pub fn with_memory_warning_threshold_mb(mut self, mb: u64) -> Self {
        self.memory_warning_threshold_mb = mb;
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = Some(prefix.into());
        self
    }
}
