//! Data completeness checks and a second, independent recomputation of totals

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ValidationIssue, ValidationReport};
use crate::results::{AccessibilityResult, ResultField, TestSummary};
use crate::utils::COMPLETENESS_THRESHOLD;

/// Which promised fields one result actually carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub url: String,
    /// Present expected fields as a percentage of all expected fields
    pub score: f64,
    pub is_complete: bool,
    pub expected_fields: Vec<ResultField>,
    pub missing_fields: Vec<ResultField>,
    pub recommendations: Vec<String>,
}

/// Check one result against the fields its analyzer flags promised
///
/// Pure function of the result; calling it twice gives the same report.
#[must_use]
pub fn check_page_completeness(result: &AccessibilityResult) -> CompletenessReport {
    let expected_fields = ResultField::expected_for(&result.flags);
    let missing_fields: Vec<ResultField> = expected_fields
        .iter()
        .copied()
        .filter(|field| !field.is_present(result))
        .collect();

    let present = expected_fields.len() - missing_fields.len();
    // accessibility is always expected, so the denominator is never zero
    let score = present as f64 / expected_fields.len().max(1) as f64 * 100.0;

    let recommendations = missing_fields
        .iter()
        .map(|field| recommendation_for(*field, result))
        .collect();

    CompletenessReport {
        url: result.url.clone(),
        score,
        is_complete: missing_fields.is_empty(),
        expected_fields,
        missing_fields,
        recommendations,
    }
}

fn recommendation_for(field: ResultField, result: &AccessibilityResult) -> String {
    let cause = result
        .analyzer_failures
        .iter()
        .find(|f| f.field == field)
        .map(|f| format!(" (analyzer '{}' failed: {})", f.analyzer, f.message));

    match cause {
        Some(cause) => format!("Re-run the {field} analysis for this page{cause}"),
        None if field.is_required() => {
            format!("The required {field} analysis is missing; check the analyzer pipeline")
        }
        None => format!("Enable or register an analyzer that produces the {field} section"),
    }
}

/// Completeness over a batch of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCompletenessReport {
    /// Mean page score; 100 for an empty batch
    pub overall_score: f64,
    pub complete_pages: usize,
    pub pages: Vec<CompletenessReport>,
    /// URLs scoring below the completeness threshold
    pub flagged_pages: Vec<String>,
}

#[must_use]
pub fn generate_batch_report(results: &[AccessibilityResult]) -> BatchCompletenessReport {
    let pages: Vec<CompletenessReport> = results.iter().map(check_page_completeness).collect();

    let overall_score = if pages.is_empty() {
        100.0
    } else {
        pages.iter().map(|p| p.score).sum::<f64>() / pages.len() as f64
    };
    let flagged_pages: Vec<String> = pages
        .iter()
        .filter(|p| p.score < COMPLETENESS_THRESHOLD)
        .map(|p| p.url.clone())
        .collect();
    let complete_pages = pages.iter().filter(|p| p.is_complete).count();

    if !flagged_pages.is_empty() {
        log::warn!(
            "{} of {} pages are below {}% completeness",
            flagged_pages.len(),
            pages.len(),
            COMPLETENESS_THRESHOLD
        );
    }

    BatchCompletenessReport {
        overall_score,
        complete_pages,
        pages,
        flagged_pages,
    }
}

/// Totals re-derived straight from the page results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationVerification {
    pub pages: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_images: usize,
    pub images_missing_alt: usize,
    /// How many pages carry each section
    pub field_presence: BTreeMap<ResultField, usize>,
    /// Per-result plausibility problems
    pub implausible: Vec<ValidationIssue>,
}

/// Independently recompute batch totals and sanity-check each result
///
/// Counts come from the issue lists themselves rather than the stored
/// `error_count`/`warning_count`, so a stale counter shows up as a
/// disagreement with the summary.
#[must_use]
pub fn verify_aggregations(results: &[AccessibilityResult]) -> AggregationVerification {
    let mut verification = AggregationVerification::default();

    for result in results {
        verification.pages += 1;
        verification.total_errors += result.errors.len();
        verification.total_warnings += result.warnings.len();

        for field in ResultField::ALL {
            if field.is_present(result) {
                *verification.field_presence.entry(field).or_insert(0) += 1;
            }
        }

        if let Some(a11y) = &result.accessibility {
            verification.total_images += a11y.images_total;
            verification.images_missing_alt += a11y.images_missing_alt;

            if a11y.images_missing_alt > a11y.images_total {
                verification.implausible.push(ValidationIssue::invalid(
                    &result.url,
                    "accessibility.images_missing_alt",
                    a11y.images_missing_alt,
                    format!(
                        "{} images missing alt but only {} images on the page",
                        a11y.images_missing_alt, a11y.images_total
                    ),
                ));
            }
        }

        if let Some(sd) = &result.structured_data
            && sd.invalid_json_ld_blocks > sd.json_ld_blocks
        {
            verification.implausible.push(ValidationIssue::invalid(
                &result.url,
                "structured_data.invalid_json_ld_blocks",
                sd.invalid_json_ld_blocks,
                "more invalid JSON-LD blocks than blocks",
            ));
        }

        if let Some(perf) = &result.performance
            && perf.load_complete_ms > 0.0
            && perf.dom_content_loaded_ms > perf.load_complete_ms
        {
            verification.implausible.push(ValidationIssue::invalid(
                &result.url,
                "performance.dom_content_loaded_ms",
                perf.dom_content_loaded_ms,
                "DOMContentLoaded fired after load completed",
            ));
        }

        if result.analyzer_failures.iter().any(|f| f.field.is_present(result)) {
            verification.implausible.push(ValidationIssue::invalid(
                &result.url,
                "analyzer_failures",
                result.analyzer_failures.len(),
                "a failed analyzer's field is nevertheless present",
            ));
        }
    }

    verification
}

impl AggregationVerification {
    /// Compare these independently derived totals with a summary
    ///
    /// Only completed pages contribute results, so `pages` is compared with
    /// the number of summary entries carrying a result.
    #[must_use]
    pub fn compare_with(&self, summary: &TestSummary) -> ValidationReport {
        let mut issues = self.implausible.clone();

        let with_result = summary.results.iter().filter(|o| o.result.is_some()).count();
        let checks = [
            ("pages_with_results", self.pages, with_result),
            ("total_errors", self.total_errors, summary.total_errors),
            ("total_warnings", self.total_warnings, summary.total_warnings),
        ];
        for (field, ours, theirs) in checks {
            if ours != theirs {
                issues.push(ValidationIssue::mismatch("summary", field, ours, theirs));
            }
        }

        ValidationReport::from_issues(issues, self.pages)
    }

    #[must_use]
    pub fn presence_of(&self, field: ResultField) -> usize {
        self.field_presence.get(&field).copied().unwrap_or(0)
    }
}
