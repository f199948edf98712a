//! Shared live counters for a running audit
//!
//! Workers update the tracker as tasks finish; the debugger samples it on its
//! own timer. All counters are plain atomics, so reads never block workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::events::ProgressStats;
use super::task_types::TaskOutcome;

#[derive(Debug, Default)]
struct Counters {
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    in_flight: AtomicUsize,
}

/// Cheaply cloneable view onto one run's progress
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    inner: Arc<Counters>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters for a run of `total` pages
    pub fn start_run(&self, total: usize) {
        self.inner.total.store(total, Ordering::Release);
        self.inner.completed.store(0, Ordering::Release);
        self.inner.failed.store(0, Ordering::Release);
        self.inner.skipped.store(0, Ordering::Release);
        self.inner.in_flight.store(0, Ordering::Release);
    }

    pub(crate) fn task_started(&self) {
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    /// Count a task that reached a terminal state
    pub(crate) fn task_finished(&self, outcome: &TaskOutcome) {
        self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.record_terminal(outcome);
    }

    /// Count a task that was never dispatched
    pub(crate) fn record_terminal(&self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Failed { .. } | TaskOutcome::Crashed { .. } => {
                self.inner.failed.fetch_add(1, Ordering::AcqRel);
            }
            TaskOutcome::RedirectSkipped { .. } | TaskOutcome::Cancelled => {
                self.inner.skipped.fetch_add(1, Ordering::AcqRel);
            }
            TaskOutcome::Completed(result) if result.has_blocking_errors() => {
                self.inner.failed.fetch_add(1, Ordering::AcqRel);
            }
            TaskOutcome::Completed(_) => {}
        }
        self.inner.completed.fetch_add(1, Ordering::AcqRel);
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressStats {
        ProgressStats {
            total_pages: self.inner.total.load(Ordering::Acquire),
            completed_pages: self.inner.completed.load(Ordering::Acquire),
            failed_pages: self.inner.failed.load(Ordering::Acquire),
            skipped_pages: self.inner.skipped.load(Ordering::Acquire),
        }
    }

    /// Tasks currently between dispatch and their terminal state
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }
}
