//! Self-checks run over a finished audit
//!
//! Two independently written checkers look at the same data:
//! - [`report_validator`] recomputes every summary aggregate and checks
//!   per-result structure and internal consistency.
//! - [`completeness`] checks that each result carries every field its flags
//!   promised and re-derives the totals a second way.
//!
//! Disagreement is reported, never repaired.

pub mod completeness;
pub mod report_validator;

use serde::{Deserialize, Serialize};

pub use completeness::{
    AggregationVerification, BatchCompletenessReport, CompletenessReport, check_page_completeness,
    generate_batch_report, verify_aggregations,
};
pub use report_validator::{generate_report, validate_audit_results, validate_test_summary};

/// One disagreement found by a checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// `summary`, or the URL of the page the issue concerns
    pub scope: String,
    pub field: String,
    pub expected: String,
    pub actual: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn mismatch(
        scope: impl Into<String>,
        field: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        let field = field.into();
        let expected = expected.to_string();
        let actual = actual.to_string();
        Self {
            scope: scope.into(),
            message: format!("{field}: expected {expected}, found {actual}"),
            field,
            expected,
            actual,
        }
    }

    pub fn invalid(
        scope: impl Into<String>,
        field: impl Into<String>,
        actual: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self {
            scope: scope.into(),
            field: field.into(),
            expected: String::new(),
            actual: actual.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.scope, self.message)
    }
}

/// Outcome of one checker pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
    /// Number of items (results or summary entries) inspected
    pub checked: usize,
}

impl ValidationReport {
    #[must_use]
    pub fn from_issues(issues: Vec<ValidationIssue>, checked: usize) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
            checked,
        }
    }

    /// Issues touching `field`, in discovery order
    pub fn issues_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |i| i.field == field)
    }
}
