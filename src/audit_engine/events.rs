//! Lifecycle callbacks for audit runs
//!
//! Workers never call the handler directly. They push [`AuditEvent`]s into an
//! unbounded channel drained by a single dispatcher task, so callbacks run one
//! at a time, in arrival order, and a slow or panicking handler cannot stall
//! or kill a worker.

use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::results::AccessibilityResult;

/// Cumulative counters passed to [`AuditEventHandler::on_progress_update`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub total_pages: usize,
    /// Tasks in any terminal state
    pub completed_pages: usize,
    /// Failed or crashed tasks, plus audited pages with a critical error
    pub failed_pages: usize,
    /// Redirect-skipped tasks
    pub skipped_pages: usize,
}

/// Receiver of per-URL lifecycle events
///
/// Every method has a no-op default; implement only what you need.
pub trait AuditEventHandler: Send + Sync {
    fn on_url_started(&self, _url: &str) {}

    fn on_url_completed(
        &self,
        _url: &str,
        _result: &AccessibilityResult,
        _duration_ms: u64,
        _attempts: u32,
    ) {
    }

    fn on_url_failed(&self, _url: &str, _error: &str, _attempts: u32) {}

    fn on_url_skipped(&self, _url: &str, _redirect_target: &str) {}

    fn on_progress_update(&self, _stats: ProgressStats) {}
}

/// Handler that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventHandler;

impl AuditEventHandler for NoOpEventHandler {}

#[derive(Debug)]
pub(crate) enum AuditEvent {
    Started {
        url: String,
    },
    Completed {
        url: String,
        result: Box<AccessibilityResult>,
        duration_ms: u64,
        attempts: u32,
    },
    Failed {
        url: String,
        error: String,
        attempts: u32,
    },
    Skipped {
        url: String,
        target: String,
    },
}

/// Cloneable sending side held by every worker
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl EventSender {
    pub(crate) fn send(&self, event: AuditEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("Event dispatcher already stopped, dropping event");
        }
    }
}

/// Spawn the dispatcher task for a run of `total_pages` URLs
///
/// The task ends once every [`EventSender`] has been dropped and the channel
/// is drained; await the handle to be sure all callbacks have run.
pub(crate) fn spawn_dispatcher(
    handler: Arc<dyn AuditEventHandler>,
    total_pages: usize,
) -> (EventSender, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();

    let task = tokio::spawn(async move {
        let mut stats = ProgressStats {
            total_pages,
            ..ProgressStats::default()
        };

        while let Some(event) = rx.recv().await {
            let terminal = match &event {
                AuditEvent::Started { .. } => false,
                AuditEvent::Completed { result, .. } => {
                    stats.completed_pages += 1;
                    if result.has_blocking_errors() {
                        stats.failed_pages += 1;
                    }
                    true
                }
                AuditEvent::Failed { .. } => {
                    stats.completed_pages += 1;
                    stats.failed_pages += 1;
                    true
                }
                AuditEvent::Skipped { .. } => {
                    stats.completed_pages += 1;
                    stats.skipped_pages += 1;
                    true
                }
            };

            deliver(handler.as_ref(), &event);
            if terminal {
                let snapshot = stats;
                guarded("on_progress_update", || handler.on_progress_update(snapshot));
            }
        }
        log::debug!(
            "Event dispatcher finished ({}/{} pages reported)",
            stats.completed_pages,
            stats.total_pages
        );
    });

    (EventSender { tx }, task)
}

fn deliver(handler: &dyn AuditEventHandler, event: &AuditEvent) {
    match event {
        AuditEvent::Started { url } => guarded("on_url_started", || handler.on_url_started(url)),
        AuditEvent::Completed {
            url,
            result,
            duration_ms,
            attempts,
        } => guarded("on_url_completed", || {
            handler.on_url_completed(url, result, *duration_ms, *attempts);
        }),
        AuditEvent::Failed {
            url,
            error,
            attempts,
        } => guarded("on_url_failed", || {
            handler.on_url_failed(url, error, *attempts);
        }),
        AuditEvent::Skipped { url, target } => {
            guarded("on_url_skipped", || handler.on_url_skipped(url, target));
        }
    }
}

/// Run a callback, logging instead of propagating a panic
fn guarded(name: &str, f: impl FnOnce()) {
    if std::panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        log::error!("Event callback {name} panicked; continuing");
    }
}
