//! Shared configuration constants for siteaudit
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Default number of concurrent audit workers (and pooled pages)
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Upper bound accepted by the options builder
///
/// Each worker holds one Chrome tab; beyond this the browser process
/// itself becomes the bottleneck.
pub const MAX_CONCURRENT_LIMIT: usize = 64;

/// Default per-attempt budget (navigation + analyzers) in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Upper bound accepted by the options builder
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Pages scoring below this completeness percentage are flagged in batch reports
pub const COMPLETENESS_THRESHOLD: f64 = 80.0;

/// Default interval between debug snapshots
pub const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 5;

/// Default resident memory (MB) above which the debugger warns
pub const DEFAULT_MEMORY_WARNING_THRESHOLD_MB: u64 = 1024;

/// Memory must fall below this fraction of the threshold before warning again
pub const MEMORY_WARNING_REARM_RATIO: f64 = 0.9;

/// Default directory for debug artifacts
pub const DEFAULT_DEBUG_OUTPUT_DIR: &str = "./audit-debug";

/// Maximum nesting depth when following sitemap indexes
pub const MAX_SITEMAP_DEPTH: usize = 3;

/// Timeout for resetting or closing a pooled page
pub const PAGE_CLOSE_TIMEOUT_SECS: u64 = 5;

/// Chrome user agent string for audit sessions
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
/// Next update: 2025-04-29 (quarterly schedule)
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
