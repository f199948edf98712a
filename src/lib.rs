//! Batch web-page audit orchestration
//!
//! Runs a list of URLs through a bounded pool of browser pages, analyzes each
//! settled page, folds the outcomes into a [`TestSummary`] and then checks that
//! summary against itself twice before anyone is told the run was good.

pub mod analyzers;
pub mod audit_engine;
pub mod browser_pool;
pub mod browser_profile;
pub mod browser_setup;
pub mod config;
pub mod debugger;
pub mod errors;
pub mod results;
pub mod url_source;
pub mod utils;
pub mod validation;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use analyzers::{Analyzer, AnalyzerPipeline, default_pipeline};
pub use audit_engine::{
    AuditEventHandler, AuditScheduler, NoOpEventHandler, ProgressStats, ProgressTracker,
};
pub use browser_pool::chromium::{ChromiumPage, ChromiumPageSource};
pub use browser_pool::{AuditPage, PagePool, PageSource, PoolStats};
pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use config::{AnalyzerFlags, DebugConfig, RetryBackoff, TestOptions, TestOptionsBuilder};
pub use debugger::{
    AuditDebugger, DebugArtifacts, DebugSession, DebugSnapshot, PerformanceReport, SessionWatch,
};
pub use errors::{AuditError, ConfigError, FailureKind, PageError, PersistenceError, PoolError};
pub use results::{
    AccessibilityResult, AuditIssue, PageOutcome, PageStatus, ResultField, Severity, TestSummary,
};
pub use url_source::{parse_sitemap, read_url_file};
pub use validation::{
    BatchCompletenessReport, CompletenessReport, ValidationIssue, ValidationReport,
    check_page_completeness, generate_batch_report, generate_report, validate_audit_results,
    validate_test_summary, verify_aggregations,
};

/// A finished run with both self-checks attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRun {
    pub summary: TestSummary,
    /// Per-result structure and consistency
    pub result_validation: ValidationReport,
    /// Summary aggregates recomputed from its entries
    pub summary_validation: ValidationReport,
    /// Totals re-derived from the results, compared with the summary
    pub aggregation: ValidationReport,
    pub completeness: BatchCompletenessReport,
    pub pool_stats: PoolStats,
}

impl AuditRun {
    /// Check a summary produced elsewhere, e.g. loaded from disk
    #[must_use]
    pub fn from_summary(summary: TestSummary, pool_stats: PoolStats) -> Self {
        let results: Vec<AccessibilityResult> =
            summary.accessibility_results().cloned().collect();

        let result_validation = validate_audit_results(&results);
        let summary_validation = validate_test_summary(&summary);
        let aggregation = verify_aggregations(&results).compare_with(&summary);
        let completeness = generate_batch_report(&results);

        Self {
            summary,
            result_validation,
            summary_validation,
            aggregation,
            completeness,
            pool_stats,
        }
    }

    /// True when every checker agrees with the summary
    ///
    /// Incomplete pages do not make a run untrustworthy; they are reported
    /// through `completeness` instead.
    #[must_use]
    pub fn is_trustworthy(&self) -> bool {
        self.result_validation.valid && self.summary_validation.valid && self.aggregation.valid
    }

    /// [`is_trustworthy`](Self::is_trustworthy) as a `Result`
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ValidationMismatch`] naming the first issue when
    /// any checker disagrees with the summary.
    pub fn ensure_trustworthy(&self) -> Result<(), AuditError> {
        if self.is_trustworthy() {
            return Ok(());
        }
        let first = self
            .issues()
            .next()
            .map_or_else(|| "unknown".to_string(), |issue| issue.message.clone());
        Err(AuditError::ValidationMismatch {
            count: self.issues().count(),
            first,
        })
    }

    /// All checker issues, validator first
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.result_validation
            .issues
            .iter()
            .chain(&self.summary_validation.issues)
            .chain(&self.aggregation.issues)
    }
}

/// Audit `urls` with a fresh scheduler and validate the outcome
pub async fn run_audit<S: PageSource>(
    urls: &[String],
    options: TestOptions,
    source: Arc<S>,
    pipeline: AnalyzerPipeline<S::Page>,
) -> Result<AuditRun, AuditError> {
    let scheduler = AuditScheduler::new(source, pipeline, options);
    run_with_scheduler(&scheduler, urls).await
}

/// Like [`run_audit`], for callers that need the scheduler's tracker or
/// cancellation token while the run is in flight
pub async fn run_with_scheduler<S: PageSource>(
    scheduler: &AuditScheduler<S>,
    urls: &[String],
) -> Result<AuditRun, AuditError> {
    if urls.is_empty() {
        return Err(AuditError::NoUrls);
    }

    let run = scheduler.run(urls).await;
    let summary = audit_engine::build_summary(run.records, run.planned_pages, run.wall_clock_ms);
    let audit = AuditRun::from_summary(summary, run.pool_stats);

    if audit.is_trustworthy() {
        log::info!(
            "Audit verified: {} passed, {} failed, {} crashed, {} skipped",
            audit.summary.passed_pages,
            audit.summary.failed_pages,
            audit.summary.crashed_pages,
            audit.summary.skipped_pages
        );
    } else {
        log::warn!(
            "Audit self-checks disagree with the summary ({} issues)",
            audit.issues().count()
        );
    }
    Ok(audit)
}
