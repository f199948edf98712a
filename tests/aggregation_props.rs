//! Property tests: summary invariants hold for any mix of outcomes

use kodegen_tools_siteaudit::audit_engine::{TaskOutcome, TaskRecord, build_summary};
use kodegen_tools_siteaudit::errors::FailureKind;
use kodegen_tools_siteaudit::results::{AccessibilityFindings, AnalysisResult, AnalysisSection};
use kodegen_tools_siteaudit::{
    AccessibilityResult, AnalyzerFlags, AuditIssue, PageStatus, Severity, validate_test_summary,
    verify_aggregations,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Kind {
    Completed {
        errors: usize,
        warnings: usize,
        critical: bool,
    },
    Failed,
    Crashed,
    Redirected,
    Cancelled,
}

fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![
        4 => (0usize..6, 0usize..6, any::<bool>()).prop_map(|(errors, warnings, critical)| {
            Kind::Completed { errors, warnings, critical }
        }),
        2 => Just(Kind::Failed),
        1 => Just(Kind::Crashed),
        1 => Just(Kind::Redirected),
        1 => Just(Kind::Cancelled),
    ]
}

fn record(index: usize, kind: &Kind, attempts: u32, duration_ms: u64) -> TaskRecord {
    let url = format!("https://p.test/{index}");
    let outcome = match kind {
        Kind::Completed {
            errors,
            warnings,
            critical,
        } => {
            let mut result = AccessibilityResult::new(&url, AnalyzerFlags::default());
            let severity = if *critical {
                Severity::Critical
            } else {
                Severity::Moderate
            };
            result.merge(
                AnalysisResult::new(AnalysisSection::Accessibility(AccessibilityFindings {
                    score: 75.0,
                    ..Default::default()
                }))
                .with_errors(
                    (0..*errors)
                        .map(|_| AuditIssue::new("rule", "violation", severity))
                        .collect(),
                )
                .with_warnings(
                    (0..*warnings)
                        .map(|_| AuditIssue::new("hint", "notice", Severity::Minor))
                        .collect(),
                ),
            );
            result.finalize(duration_ms);
            TaskOutcome::Completed(Box::new(result))
        }
        Kind::Failed => TaskOutcome::Failed {
            error: "navigation failed".to_string(),
            kind: FailureKind::Navigation,
        },
        Kind::Crashed => TaskOutcome::Crashed {
            error: "Target crashed".to_string(),
        },
        Kind::Redirected => TaskOutcome::RedirectSkipped {
            target: "https://elsewhere.test/".to_string(),
        },
        Kind::Cancelled => return TaskRecord::cancelled(index, url),
    };
    TaskRecord {
        index,
        url,
        outcome,
        attempts,
        duration_ms,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn partition_and_sums_hold(
        kinds in prop::collection::vec((kind(), 1u32..4, 0u64..5_000), 0..40),
        seed in any::<u64>(),
    ) {
        let mut records: Vec<TaskRecord> = kinds
            .iter()
            .enumerate()
            .map(|(i, (k, attempts, ms))| record(i, k, *attempts, *ms))
            .collect();
        // completion order is arbitrary
        if !records.is_empty() {
            let k = (seed % records.len() as u64) as usize;
            records.rotate_left(k);
        }

        let summary = build_summary(records, kinds.len(), 1_000);

        prop_assert_eq!(summary.total_pages, kinds.len());
        prop_assert_eq!(
            summary.tested_pages,
            summary.passed_pages + summary.failed_pages + summary.crashed_pages
        );
        prop_assert_eq!(summary.total_pages, summary.tested_pages + summary.skipped_pages);

        let errors: usize = summary.accessibility_results().map(|r| r.error_count).sum();
        let warnings: usize = summary.accessibility_results().map(|r| r.warning_count).sum();
        prop_assert_eq!(summary.total_errors, errors);
        prop_assert_eq!(summary.total_warnings, warnings);

        for (i, entry) in summary.results.iter().enumerate() {
            prop_assert_eq!(&entry.url, &format!("https://p.test/{i}"));
            if entry.status == PageStatus::Passed {
                prop_assert!(entry.result.as_ref().is_some_and(|r| !r.has_blocking_errors()));
            }
        }

        prop_assert!(validate_test_summary(&summary).valid);
        let results: Vec<AccessibilityResult> = summary.accessibility_results().cloned().collect();
        prop_assert!(verify_aggregations(&results).compare_with(&summary).valid);
    }
}
