//! Run-level summary built by the aggregator

use serde::{Deserialize, Serialize};

use super::page_result::AccessibilityResult;

/// Terminal status of one planned URL in a [`TestSummary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Passed,
    Failed,
    Crashed,
    /// Redirected away from the requested URL
    Skipped,
    /// Never dispatched because the run was cancelled
    Cancelled,
}

impl PageStatus {
    /// Statuses that count towards `tested_pages`
    #[must_use]
    pub const fn is_tested(self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Crashed)
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Crashed => "crashed",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageOutcome {
    pub url: String,
    pub status: PageStatus,
    /// Attempts made; 0 for URLs that were never dispatched
    pub attempts: u32,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AccessibilityResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_target: Option<String>,
}

impl PageOutcome {
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.result.as_ref().map_or(0, |r| r.error_count)
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.result.as_ref().map_or(0, |r| r.warning_count)
    }
}

/// Aggregate of one audit run
///
/// Built once by the aggregator and never mutated afterwards. The validators
/// recompute every aggregate field from `results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub total_pages: usize,
    pub tested_pages: usize,
    pub passed_pages: usize,
    pub failed_pages: usize,
    pub crashed_pages: usize,
    pub skipped_pages: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    /// Sum of every attempt of every task
    pub total_duration_ms: u64,
    /// Elapsed time of the whole run
    pub wall_clock_ms: u64,
    pub results: Vec<PageOutcome>,
}

impl TestSummary {
    /// Completed results, in input order
    pub fn accessibility_results(&self) -> impl Iterator<Item = &AccessibilityResult> {
        self.results.iter().filter_map(|o| o.result.as_ref())
    }

    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.tested_pages == 0 {
            return 0.0;
        }
        self.passed_pages as f64 / self.tested_pages as f64 * 100.0
    }
}
