//! Error types for audit runs
//!
//! Attempt-level failures are [`PageError`]s tagged with a [`FailureKind`]
//! that decides whether the worker retries, gives up or marks the task as
//! crashed. Everything that escapes to the caller is an [`AuditError`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Class of an attempt failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Navigation did not settle (DNS, refused connection, HTTP-level error)
    Navigation,
    /// The attempt exceeded its time budget
    Timeout,
    /// The browser process or its connection died
    Crash,
    /// The required analyzer failed
    Analyzer,
    /// A page could not be created from the pool
    Resource,
}

impl FailureKind {
    /// Classify a browser-layer error message
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();

        // Crash check first: a dead connection often also mentions navigation
        if msg.contains("crashed")
            || msg.contains("browser closed")
            || msg.contains("browser process")
            || msg.contains("connection closed")
            || msg.contains("websocket")
            || msg.contains("channel closed")
        {
            return Self::Crash;
        }

        if msg.contains("timeout") || msg.contains("timed out") {
            return Self::Timeout;
        }

        Self::Navigation
    }

    /// Crashes are never retried; everything else is
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Crash)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Navigation => "navigation",
            Self::Timeout => "timeout",
            Self::Crash => "crash",
            Self::Analyzer => "analyzer",
            Self::Resource => "resource",
        };
        f.write_str(s)
    }
}

/// Failure of a single attempt on a single page
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct PageError {
    pub kind: FailureKind,
    pub message: String,
}

impl PageError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn navigation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Navigation, message)
    }

    #[must_use]
    pub fn timeout(secs: u64, operation: &str) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("{operation} timed out after {secs}s"),
        )
    }

    pub fn crash(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Crash, message)
    }

    pub fn analyzer(analyzer: &str, message: impl std::fmt::Display) -> Self {
        Self::new(FailureKind::Analyzer, format!("{analyzer}: {message}"))
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Resource, message)
    }

    /// Wrap an arbitrary browser-layer error, classifying it by message
    pub fn from_browser(error: impl std::fmt::Display) -> Self {
        let message = error.to_string();
        Self::new(FailureKind::classify(&message), message)
    }

    #[must_use]
    pub fn is_crash(&self) -> bool {
        self.kind == FailureKind::Crash
    }
}

/// Errors from the page resource pool
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    #[error("Page pool is closed")]
    Closed,

    #[error("Failed to create page: {0}")]
    Create(#[source] PageError),
}

impl From<PoolError> for PageError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Closed => PageError::resource("page pool is closed"),
            // Preserve crash classification so a dead browser is not retried
            PoolError::Create(inner) if inner.is_crash() => inner,
            PoolError::Create(inner) => PageError::resource(inner.message),
        }
    }
}

/// Errors while writing debug artifacts
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to create debug directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize debug data: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Invalid option values rejected by the builder
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_concurrent must be between 1 and {max}, got {value}")]
    MaxConcurrent { value: usize, max: usize },

    #[error("timeout must be at least 1 second")]
    ZeroTimeout,

    #[error("max_retries must be at most {max}, got {value}")]
    MaxRetries { value: u32, max: u32 },

    #[error("invalid retry backoff: {0}")]
    Backoff(String),
}

/// Crate-level error type
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse sitemap {url}: {message}")]
    SitemapParse { url: String, message: String },

    /// The self-checks disagree with the run summary
    #[error("Validation mismatch: {count} issues, first: {first}")]
    ValidationMismatch { count: usize, first: String },

    #[error("No URLs to audit")]
    NoUrls,
}
