//! Bounded-concurrency batch scheduler
//!
//! Coordinates one audit run with:
//! - A FIFO queue seeded in input order
//! - `min(max_concurrent, urls)` worker loops sharing one page pool
//! - Per-URL exclusivity for duplicate entries
//! - Lifecycle callbacks on a dedicated dispatcher task
//! - Cooperative cancellation

use futures::FutureExt;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{debug, error, info};
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::aggregator::build_summary;
use super::events::{AuditEvent, EventSender, spawn_dispatcher};
use super::fingerprint_limiter::FingerprintLimiter;
use super::progress::ProgressTracker;
use super::task_types::{TaskOutcome, TaskRecord};
use super::worker::{WorkerContext, panicked_record, run_task};
use crate::analyzers::AnalyzerPipeline;
use crate::browser_pool::{PagePool, PageSource, PoolStats};
use crate::config::TestOptions;
use crate::results::TestSummary;

type UrlQueue = Arc<Mutex<VecDeque<(usize, String)>>>;

/// Everything a run produced, before aggregation
#[derive(Debug)]
pub struct RunRecords {
    /// One record per planned URL, in completion order
    pub records: Vec<TaskRecord>,
    /// URLs left after `max_pages` truncation
    pub planned_pages: usize,
    pub wall_clock_ms: u64,
    pub pool_stats: PoolStats,
}

/// Runs batches of URLs against one page source
pub struct AuditScheduler<S: PageSource> {
    source: Arc<S>,
    pipeline: Arc<AnalyzerPipeline<S::Page>>,
    options: Arc<TestOptions>,
    tracker: ProgressTracker,
    cancel: CancellationToken,
}

impl<S: PageSource> AuditScheduler<S> {
    pub fn new(source: Arc<S>, pipeline: AnalyzerPipeline<S::Page>, options: TestOptions) -> Self {
        Self {
            source,
            pipeline: Arc::new(pipeline),
            options: Arc::new(options),
            tracker: ProgressTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Live counters for the current run, e.g. for a debugger session
    #[must_use]
    pub fn tracker(&self) -> ProgressTracker {
        self.tracker.clone()
    }

    /// Cancelling stops workers from pulling further URLs
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn options(&self) -> &TestOptions {
        &self.options
    }

    /// Audit `urls` (after `max_pages` truncation) and return one record per URL
    pub async fn run(&self, urls: &[String]) -> RunRecords {
        let started = Instant::now();
        let planned = self.options.plan(urls);
        let total = planned.len();
        self.tracker.start_run(total);

        let pool = PagePool::new(Arc::clone(&self.source), self.options.max_concurrent());
        if total == 0 {
            info!("No URLs to audit");
            return RunRecords {
                records: Vec::new(),
                planned_pages: 0,
                wall_clock_ms: 0,
                pool_stats: pool.stats(),
            };
        }

        let queue: UrlQueue = Arc::new(Mutex::new(
            planned.iter().cloned().enumerate().collect(),
        ));
        let (events, dispatcher) = spawn_dispatcher(self.options.event_handler(), total);
        let ctx = Arc::new(WorkerContext {
            pool: Arc::clone(&pool),
            pipeline: Arc::clone(&self.pipeline),
            options: Arc::clone(&self.options),
            cancel: self.cancel.clone(),
        });
        let fingerprints = Arc::new(FingerprintLimiter::new());

        let worker_count = self.options.max_concurrent().min(total);
        info!(
            "Auditing {} URLs with {} workers (timeout {}s, {} retries)",
            total,
            worker_count,
            self.options.timeout_secs(),
            self.options.max_retries()
        );

        let mut workers = FuturesUnordered::new();
        for worker_id in 0..worker_count {
            workers.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&ctx),
                Arc::clone(&queue),
                Arc::clone(&fingerprints),
                events.clone(),
                self.tracker.clone(),
            )));
        }
        drop(events);

        let mut records = Vec::with_capacity(total);
        while let Some(joined) = workers.next().await {
            match joined {
                Ok(mut finished) => records.append(&mut finished),
                Err(e) => error!("Audit worker task failed: {e}"),
            }
        }

        // Anything still queued was never dispatched
        let leftover: Vec<(usize, String)> = queue.lock().await.drain(..).collect();
        if !leftover.is_empty() {
            info!("Run cancelled with {} URLs not dispatched", leftover.len());
        }
        for (index, url) in leftover {
            let record = TaskRecord::cancelled(index, url);
            self.tracker.record_terminal(&record.outcome);
            records.push(record);
        }

        if let Err(e) = dispatcher.await {
            error!("Event dispatcher task failed: {e}");
        }

        pool.close().await;
        let pool_stats = pool.stats();
        let wall_clock_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "Audit run finished: {} records in {} ms (pages created {}, peak in use {})",
            records.len(),
            wall_clock_ms,
            pool_stats.created,
            pool_stats.peak_in_use
        );

        RunRecords {
            records,
            planned_pages: total,
            wall_clock_ms,
            pool_stats,
        }
    }

    /// Run and fold the records into a [`TestSummary`]
    pub async fn run_and_aggregate(&self, urls: &[String]) -> TestSummary {
        let run = self.run(urls).await;
        build_summary(run.records, run.planned_pages, run.wall_clock_ms)
    }
}

async fn worker_loop<S: PageSource>(
    worker_id: usize,
    ctx: Arc<WorkerContext<S>>,
    queue: UrlQueue,
    fingerprints: Arc<FingerprintLimiter>,
    events: EventSender,
    tracker: ProgressTracker,
) -> Vec<TaskRecord> {
    let mut records = Vec::new();

    loop {
        if ctx.cancel.is_cancelled() {
            debug!("Worker {worker_id} stopping: run cancelled");
            break;
        }

        let Some((index, url)) = queue.lock().await.pop_front() else {
            break;
        };

        let _permit = fingerprints.acquire(&url).await;

        tracker.task_started();
        events.send(AuditEvent::Started { url: url.clone() });

        let record = AssertUnwindSafe(run_task(&ctx, index, url.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!("Worker {worker_id} panicked while auditing {url}");
                panicked_record(index, url)
            });

        debug!(
            "Worker {worker_id} finished {}: {}",
            record.url,
            record.outcome.label()
        );
        tracker.task_finished(&record.outcome);
        emit_terminal(&events, &record);
        records.push(record);
    }

    debug!("Worker {worker_id} finished {} tasks", records.len());
    records
}

fn emit_terminal(events: &EventSender, record: &TaskRecord) {
    let url = record.url.clone();
    let event = match &record.outcome {
        TaskOutcome::Completed(result) => AuditEvent::Completed {
            url,
            result: result.clone(),
            duration_ms: record.duration_ms,
            attempts: record.attempts,
        },
        TaskOutcome::RedirectSkipped { target } => AuditEvent::Skipped {
            url,
            target: target.clone(),
        },
        TaskOutcome::Failed { error, .. } | TaskOutcome::Crashed { error } => AuditEvent::Failed {
            url,
            error: error.clone(),
            attempts: record.attempts,
        },
        TaskOutcome::Cancelled => return,
    };
    events.send(event);
}
