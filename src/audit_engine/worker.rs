//! Drives one URL from dispatch to a terminal record
//!
//! Each attempt leases a page, navigates, checks for a redirect and runs the
//! analyzer pipeline, all under one time budget. A failed attempt discards
//! its page so the next attempt starts fresh.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::page_timeout::with_attempt_timeout;
use super::task_types::{AuditTask, TaskOutcome, TaskRecord, TaskState};
use crate::analyzers::AnalyzerPipeline;
use crate::browser_pool::{AuditPage, PagePool, PageSource};
use crate::config::TestOptions;
use crate::errors::{FailureKind, PageError};
use crate::results::AccessibilityResult;
use crate::utils::is_redirect;

/// Shared state every worker loop needs
pub(crate) struct WorkerContext<S: PageSource> {
    pub pool: Arc<PagePool<S>>,
    pub pipeline: Arc<AnalyzerPipeline<S::Page>>,
    pub options: Arc<TestOptions>,
    pub cancel: CancellationToken,
}

/// What a successful attempt produced
enum AttemptSuccess {
    Analyzed(AccessibilityResult),
    Redirected(String),
}

/// Run `url` through as many attempts as the options allow
pub(crate) async fn run_task<S: PageSource>(
    ctx: &WorkerContext<S>,
    index: usize,
    url: String,
) -> TaskRecord {
    let mut task = AuditTask::new(index, url);
    let max_attempts = ctx.options.max_attempts();
    let mut total_ms: u64 = 0;

    loop {
        task.begin_attempt();
        let started = Instant::now();
        let outcome = run_attempt(ctx, &mut task).await;
        total_ms = total_ms.saturating_add(elapsed_ms(started));

        let error = match outcome {
            Ok(AttemptSuccess::Analyzed(mut result)) => {
                result.finalize(total_ms);
                task.transition(TaskState::Completed);
                debug!(
                    "Audited {} in {} attempt(s): {} errors, {} warnings",
                    task.url, task.attempt, result.error_count, result.warning_count
                );
                return finish(task, TaskOutcome::Completed(Box::new(result)), total_ms);
            }
            Ok(AttemptSuccess::Redirected(target)) => {
                task.transition(TaskState::RedirectSkipped);
                info!("Skipping {}: redirected to {}", task.url, target);
                return finish(task, TaskOutcome::RedirectSkipped { target }, total_ms);
            }
            Err(e) => e,
        };

        if error.is_crash() {
            task.transition(TaskState::Crashed);
            warn!("Browser crashed while auditing {}: {}", task.url, error);
            return finish(
                task,
                TaskOutcome::Crashed {
                    error: error.message,
                },
                total_ms,
            );
        }

        task.transition(TaskState::Error);
        if task.attempt >= max_attempts {
            task.transition(TaskState::Failed);
            warn!(
                "Giving up on {} after {} attempt(s): {}",
                task.url, task.attempt, error
            );
            return fail(task, error, total_ms);
        }

        task.transition(TaskState::RetryWait);
        debug!(
            "Attempt {}/{} for {} failed, retrying: {}",
            task.attempt, max_attempts, task.url, error
        );

        let delay = ctx.options.retry_backoff().delay_for(task.attempt);
        let cancelled = tokio::select! {
            () = ctx.cancel.cancelled() => true,
            () = tokio::time::sleep(delay) => false,
        };
        if cancelled {
            task.transition(TaskState::Failed);
            info!("Run cancelled before retrying {}", task.url);
            return fail(task, error, total_ms);
        }
    }
}

/// One lease, one navigation, one pipeline pass
async fn run_attempt<S: PageSource>(
    ctx: &WorkerContext<S>,
    task: &mut AuditTask,
) -> Result<AttemptSuccess, PageError> {
    let lease = ctx.pool.acquire().await.map_err(PageError::from)?;
    debug!(
        "Attempt {} for {} on page {}",
        task.attempt,
        task.url,
        lease.id()
    );

    let url = task.url.clone();
    let outcome = with_attempt_timeout(
        async {
            let settled = lease.page().navigate(&url).await?;
            if is_redirect(&url, &settled) {
                return Ok(AttemptSuccess::Redirected(settled));
            }
            task.transition(TaskState::Analyzing);
            let result = ctx.pipeline.run(lease.page(), &url, &ctx.options).await?;
            Ok(AttemptSuccess::Analyzed(result))
        },
        ctx.options.timeout_secs(),
        "Audit attempt",
    )
    .await;

    ctx.pool.release(lease, outcome.is_ok()).await;
    outcome
}

fn finish(task: AuditTask, outcome: TaskOutcome, duration_ms: u64) -> TaskRecord {
    TaskRecord {
        index: task.index,
        url: task.url,
        outcome,
        attempts: task.attempt,
        duration_ms,
    }
}

fn fail(task: AuditTask, error: PageError, duration_ms: u64) -> TaskRecord {
    finish(
        task,
        TaskOutcome::Failed {
            error: error.message,
            kind: error.kind,
        },
        duration_ms,
    )
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Record for a worker that panicked outside the analyzer pipeline
pub(crate) fn panicked_record(index: usize, url: String) -> TaskRecord {
    TaskRecord {
        index,
        url,
        outcome: TaskOutcome::Failed {
            error: "audit worker panicked".to_string(),
            kind: FailureKind::Navigation,
        },
        attempts: 1,
        duration_ms: 0,
    }
}
