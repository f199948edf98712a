//! Structural and aggregate validation of audit output

use std::fmt::Write as _;

use super::{ValidationIssue, ValidationReport};
use crate::results::{AccessibilityResult, PageStatus, TestSummary};

const SUMMARY_SCOPE: &str = "summary";

/// Check each result's structure and internal consistency
///
/// Structure: a parseable URL, every present section score finite and within
/// `0..=100`, timing metrics finite and non-negative. Consistency: counts
/// match their lists and every issue carries a code.
#[must_use]
pub fn validate_audit_results(results: &[AccessibilityResult]) -> ValidationReport {
    let mut issues = Vec::new();

    for result in results {
        check_result(result, &mut issues);
    }

    let report = ValidationReport::from_issues(issues, results.len());
    log::debug!(
        "Validated {} results: {} issues",
        report.checked,
        report.issues.len()
    );
    report
}

fn check_result(result: &AccessibilityResult, issues: &mut Vec<ValidationIssue>) {
    let scope = if result.url.is_empty() {
        "<empty url>"
    } else {
        result.url.as_str()
    };

    if result.url.trim().is_empty() {
        issues.push(ValidationIssue::invalid(scope, "url", "", "URL is empty"));
    } else if url::Url::parse(&result.url).is_err() {
        issues.push(ValidationIssue::invalid(
            scope,
            "url",
            &result.url,
            "URL does not parse",
        ));
    }

    for (field, score) in result.section_scores() {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            issues.push(ValidationIssue::invalid(
                scope,
                format!("{field}.score"),
                score,
                format!("{field} score {score} is outside 0..=100"),
            ));
        }
    }

    if let Some(perf) = &result.performance {
        let metrics = [
            ("performance.time_to_first_byte_ms", Some(perf.time_to_first_byte_ms)),
            ("performance.first_contentful_paint_ms", perf.first_contentful_paint_ms),
            ("performance.dom_content_loaded_ms", Some(perf.dom_content_loaded_ms)),
            ("performance.load_complete_ms", Some(perf.load_complete_ms)),
        ];
        for (name, value) in metrics {
            if let Some(v) = value
                && (!v.is_finite() || v < 0.0)
            {
                issues.push(ValidationIssue::invalid(
                    scope,
                    name,
                    v,
                    format!("{name} must be finite and non-negative"),
                ));
            }
        }
    }

    if let Some(px) = result.mobile.as_ref().and_then(|m| m.base_font_size_px)
        && (!px.is_finite() || px < 0.0)
    {
        issues.push(ValidationIssue::invalid(
            scope,
            "mobile.base_font_size_px",
            px,
            "base font size must be finite and non-negative",
        ));
    }

    if result.error_count != result.errors.len() {
        issues.push(ValidationIssue::mismatch(
            scope,
            "error_count",
            result.errors.len(),
            result.error_count,
        ));
    }
    if result.warning_count != result.warnings.len() {
        issues.push(ValidationIssue::mismatch(
            scope,
            "warning_count",
            result.warnings.len(),
            result.warning_count,
        ));
    }

    for (kind, list) in [("errors", &result.errors), ("warnings", &result.warnings)] {
        for (i, issue) in list.iter().enumerate() {
            if issue.code.trim().is_empty() {
                issues.push(ValidationIssue::invalid(
                    scope,
                    format!("{kind}[{i}].code"),
                    "",
                    format!("{kind}[{i}] has no code"),
                ));
            }
        }
    }
}

/// Recompute every aggregate of `summary` from its entries
///
/// Each stored aggregate that disagrees is reported with the recomputed
/// value as `expected` and the stored one as `actual`. Per-entry coherence
/// and the two partition invariants are checked as well.
#[must_use]
pub fn validate_test_summary(summary: &TestSummary) -> ValidationReport {
    let mut issues = Vec::new();

    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut crashed = 0usize;
    let mut skipped = 0usize;
    let mut errors = 0usize;
    let mut warnings = 0usize;
    let mut duration = 0u64;

    for entry in &summary.results {
        match entry.status {
            PageStatus::Passed => passed += 1,
            PageStatus::Failed => failed += 1,
            PageStatus::Crashed => crashed += 1,
            PageStatus::Skipped | PageStatus::Cancelled => skipped += 1,
        }
        if let Some(result) = &entry.result {
            errors += result.error_count;
            warnings += result.warning_count;
        }
        duration = duration.saturating_add(entry.duration_ms);

        check_entry_coherence(entry, &mut issues);
    }
    let tested = passed + failed + crashed;

    let expected: [(&str, u64, u64); 9] = [
        ("total_pages", summary.results.len() as u64, summary.total_pages as u64),
        ("tested_pages", tested as u64, summary.tested_pages as u64),
        ("passed_pages", passed as u64, summary.passed_pages as u64),
        ("failed_pages", failed as u64, summary.failed_pages as u64),
        ("crashed_pages", crashed as u64, summary.crashed_pages as u64),
        ("skipped_pages", skipped as u64, summary.skipped_pages as u64),
        ("total_errors", errors as u64, summary.total_errors as u64),
        ("total_warnings", warnings as u64, summary.total_warnings as u64),
        ("total_duration_ms", duration, summary.total_duration_ms),
    ];
    for (field, recomputed, stored) in expected {
        if recomputed != stored {
            issues.push(ValidationIssue::mismatch(
                SUMMARY_SCOPE,
                field,
                recomputed,
                stored,
            ));
        }
    }

    // Partition invariants over the stored values
    let stored_tested = summary.passed_pages + summary.failed_pages + summary.crashed_pages;
    if summary.tested_pages != stored_tested {
        issues.push(ValidationIssue {
            scope: SUMMARY_SCOPE.to_string(),
            field: "tested_pages".to_string(),
            expected: stored_tested.to_string(),
            actual: summary.tested_pages.to_string(),
            message: format!(
                "tested_pages ({}) != passed + failed + crashed ({})",
                summary.tested_pages, stored_tested
            ),
        });
    }
    let stored_total = summary.tested_pages + summary.skipped_pages;
    if summary.total_pages != stored_total {
        issues.push(ValidationIssue {
            scope: SUMMARY_SCOPE.to_string(),
            field: "total_pages".to_string(),
            expected: stored_total.to_string(),
            actual: summary.total_pages.to_string(),
            message: format!(
                "total_pages ({}) != tested + skipped ({})",
                summary.total_pages, stored_total
            ),
        });
    }

    if !issues.is_empty() {
        log::warn!(
            "Summary validation found {} issues across {} entries",
            issues.len(),
            summary.results.len()
        );
    }
    ValidationReport::from_issues(issues, summary.results.len())
}

fn check_entry_coherence(entry: &crate::results::PageOutcome, issues: &mut Vec<ValidationIssue>) {
    let scope = entry.url.as_str();

    if entry.status.is_tested() && entry.attempts == 0 {
        issues.push(ValidationIssue::invalid(
            scope,
            "attempts",
            0,
            format!("{} entry reports zero attempts", entry.status),
        ));
    }

    match entry.status {
        PageStatus::Passed => match &entry.result {
            None => issues.push(ValidationIssue::invalid(
                scope,
                "result",
                "none",
                "passed entry has no result",
            )),
            Some(result) if result.has_blocking_errors() => {
                issues.push(ValidationIssue::invalid(
                    scope,
                    "status",
                    entry.status,
                    "passed entry carries a critical error",
                ));
            }
            Some(_) => {}
        },
        PageStatus::Failed => {
            if entry.result.is_none() && entry.error.is_none() {
                issues.push(ValidationIssue::invalid(
                    scope,
                    "error",
                    "none",
                    "failed entry has neither a result nor an error",
                ));
            }
        }
        PageStatus::Crashed => {
            if entry.error.is_none() {
                issues.push(ValidationIssue::invalid(
                    scope,
                    "error",
                    "none",
                    "crashed entry has no error",
                ));
            }
        }
        PageStatus::Skipped => {
            if entry.redirect_target.is_none() {
                issues.push(ValidationIssue::invalid(
                    scope,
                    "redirect_target",
                    "none",
                    "skipped entry has no redirect target",
                ));
            }
        }
        PageStatus::Cancelled => {}
    }
}

/// Plain-text rendering of a validation report
#[must_use]
pub fn generate_report(report: &ValidationReport) -> String {
    let mut out = String::new();
    let status = if report.valid { "VALID" } else { "INVALID" };
    let _ = writeln!(out, "Validation: {status}");
    let _ = writeln!(out, "Items checked: {}", report.checked);
    let _ = writeln!(out, "Issues found: {}", report.issues.len());

    for issue in &report.issues {
        let _ = write!(out, "  - [{}] {}", issue.scope, issue.field);
        if issue.expected.is_empty() {
            let _ = writeln!(out, ": {}", issue.message);
        } else {
            let _ = writeln!(
                out,
                ": expected {}, actual {}",
                issue.expected, issue.actual
            );
        }
    }
    out
}
