//! Folds task records into the run summary

use super::task_types::{TaskOutcome, TaskRecord};
use crate::results::{PageOutcome, PageStatus, TestSummary};

/// Build the one and only [`TestSummary`] for a run
///
/// `records` should hold one record per planned URL; they are sorted back
/// into input order here. `total_pages` is taken from `planned_pages`, so a
/// lost record shows up as a `total_pages` mismatch in summary validation.
/// A completed page with a blocking (critical) error counts as failed.
#[must_use]
pub fn build_summary(
    mut records: Vec<TaskRecord>,
    planned_pages: usize,
    wall_clock_ms: u64,
) -> TestSummary {
    records.sort_by_key(|r| r.index);
    if records.len() != planned_pages {
        log::error!(
            "Run produced {} records for {} planned pages",
            records.len(),
            planned_pages
        );
    }

    let mut summary = TestSummary {
        total_pages: planned_pages,
        tested_pages: 0,
        passed_pages: 0,
        failed_pages: 0,
        crashed_pages: 0,
        skipped_pages: 0,
        total_errors: 0,
        total_warnings: 0,
        total_duration_ms: 0,
        wall_clock_ms,
        results: Vec::with_capacity(records.len()),
    };

    for record in records {
        let outcome = page_outcome(record);

        match outcome.status {
            PageStatus::Passed => summary.passed_pages += 1,
            PageStatus::Failed => summary.failed_pages += 1,
            PageStatus::Crashed => summary.crashed_pages += 1,
            PageStatus::Skipped | PageStatus::Cancelled => summary.skipped_pages += 1,
        }
        summary.total_errors += outcome.error_count();
        summary.total_warnings += outcome.warning_count();
        summary.total_duration_ms = summary.total_duration_ms.saturating_add(outcome.duration_ms);
        summary.results.push(outcome);
    }

    summary.tested_pages = summary.passed_pages + summary.failed_pages + summary.crashed_pages;

    log::info!(
        "Summary: {} pages, {} passed, {} failed, {} crashed, {} skipped, {} errors, {} warnings",
        summary.total_pages,
        summary.passed_pages,
        summary.failed_pages,
        summary.crashed_pages,
        summary.skipped_pages,
        summary.total_errors,
        summary.total_warnings
    );

    summary
}

fn page_outcome(record: TaskRecord) -> PageOutcome {
    let mut outcome = PageOutcome {
        url: record.url,
        status: PageStatus::Cancelled,
        attempts: record.attempts,
        duration_ms: record.duration_ms,
        result: None,
        error: None,
        redirect_target: None,
    };

    match record.outcome {
        TaskOutcome::Completed(result) => {
            outcome.status = if result.has_blocking_errors() {
                PageStatus::Failed
            } else {
                PageStatus::Passed
            };
            outcome.result = Some(*result);
        }
        TaskOutcome::RedirectSkipped { target } => {
            outcome.status = PageStatus::Skipped;
            outcome.redirect_target = Some(target);
        }
        TaskOutcome::Failed { error, .. } => {
            outcome.status = PageStatus::Failed;
            outcome.error = Some(error);
        }
        TaskOutcome::Crashed { error } => {
            outcome.status = PageStatus::Crashed;
            outcome.error = Some(error);
        }
        TaskOutcome::Cancelled => {}
    }

    outcome
}
