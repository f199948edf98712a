//! Diagnostic session for an audit run
//!
//! An [`AuditDebugger`] samples run progress and process memory on its own
//! timer while the scheduler works, warns when memory climbs past a threshold
//! and can persist the collected timeline next to the run summary. It is an
//! explicit session object: start one per run, end it (or drop it) when the
//! run is over.

pub mod memory;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit_engine::{ProgressStats, ProgressTracker};
use crate::config::DebugConfig;
use crate::errors::PersistenceError;
use crate::results::TestSummary;
use crate::utils::MEMORY_WARNING_REARM_RATIO;
use memory::MemorySampler;

/// Shortest timer period accepted; `tokio::time::interval` rejects zero
const MIN_SNAPSHOT_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Milliseconds since the session started
    pub elapsed_ms: u64,
    pub total_pages: usize,
    pub completed_pages: usize,
    pub failed_pages: usize,
    /// Pages mid-attempt when the timer sampled; zero for manual snapshots
    #[serde(default)]
    pub in_flight_pages: usize,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSession {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub snapshots: Vec<DebugSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub session_id: String,
    pub session_duration_ms: u64,
    pub snapshot_count: usize,
    pub peak_memory_mb: f64,
    pub average_memory_mb: f64,
    pub memory_warnings: usize,
    /// Mean time per dispatched task, including retried attempts
    pub average_task_duration_ms: Option<f64>,
    /// Finished pages per minute of wall-clock time
    pub throughput_pages_per_minute: Option<f64>,
}

/// Files written by [`AuditDebugger::save_audit_debug_data`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugArtifacts {
    pub timeline_path: PathBuf,
    pub summary_path: PathBuf,
}

#[derive(Serialize)]
struct TimelineFile<'a> {
    session: &'a DebugSession,
    performance: &'a PerformanceReport,
    config: &'a DebugConfig,
}

struct SessionState {
    config: DebugConfig,
    session_id: String,
    started_at: DateTime<Utc>,
    started: Instant,
    snapshots: Mutex<Vec<DebugSnapshot>>,
    ended_at: Mutex<Option<DateTime<Utc>>>,
    sampler: Mutex<MemorySampler>,
    warning_armed: AtomicBool,
    memory_warnings: AtomicUsize,
    timer_running: AtomicBool,
}

impl SessionState {
    fn record(&self, stats: ProgressStats, in_flight: usize, memory_mb: f64) -> DebugSnapshot {
        let snapshot = DebugSnapshot {
            timestamp: Utc::now(),
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            total_pages: stats.total_pages,
            completed_pages: stats.completed_pages,
            failed_pages: stats.failed_pages,
            in_flight_pages: in_flight,
            memory_mb,
        };
        self.snapshots.lock().push(snapshot.clone());
        self.check_memory(memory_mb);
        snapshot
    }

    /// Warn once per excursion above the threshold
    fn check_memory(&self, memory_mb: f64) -> bool {
        let threshold = self.config.memory_warning_threshold_mb as f64;

        if memory_mb > threshold {
            if self.warning_armed.swap(false, Ordering::AcqRel) {
                self.memory_warnings.fetch_add(1, Ordering::Relaxed);
                warn!(
                    session = %self.session_id,
                    "Memory usage {:.1} MB exceeds warning threshold {} MB",
                    memory_mb,
                    self.config.memory_warning_threshold_mb
                );
                return true;
            }
        } else if memory_mb < threshold * MEMORY_WARNING_REARM_RATIO
            && !self.warning_armed.swap(true, Ordering::AcqRel)
        {
            debug!(
                session = %self.session_id,
                "Memory back to {:.1} MB, warning re-armed",
                memory_mb
            );
        }
        false
    }
}

/// Read-only handle onto a session that outlives the [`AuditDebugger`]
#[derive(Clone)]
pub struct SessionWatch {
    state: Arc<SessionState>,
}

impl SessionWatch {
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.state.snapshots.lock().len()
    }

    /// False once the snapshot timer task has stopped or been dropped
    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.state.timer_running.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for SessionWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionWatch")
            .field("session_id", &self.state.session_id)
            .field("timer_running", &self.timer_running())
            .finish()
    }
}

pub struct AuditDebugger {
    state: Arc<SessionState>,
    cancel: CancellationToken,
    timer: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for AuditDebugger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditDebugger")
            .field("session_id", &self.state.session_id)
            .field("snapshots", &self.state.snapshots.lock().len())
            .finish_non_exhaustive()
    }
}

impl AuditDebugger {
    /// Start a session and its snapshot timer
    ///
    /// The timer samples `tracker` every `config.snapshot_interval` until
    /// [`end_session`](Self::end_session) is called or the debugger is dropped.
    /// Must be called from within a tokio runtime.
    pub fn start_session(config: DebugConfig, tracker: ProgressTracker) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let interval = config.snapshot_interval.max(MIN_SNAPSHOT_INTERVAL);
        info!(
            session = %session_id,
            "Debug session started (snapshot every {:?}, warn above {} MB)",
            interval,
            config.memory_warning_threshold_mb
        );

        let state = Arc::new(SessionState {
            config,
            session_id,
            started_at: Utc::now(),
            started: Instant::now(),
            snapshots: Mutex::new(Vec::new()),
            ended_at: Mutex::new(None),
            sampler: Mutex::new(MemorySampler::new()),
            warning_armed: AtomicBool::new(true),
            memory_warnings: AtomicUsize::new(0),
            timer_running: AtomicBool::new(true),
        });

        let cancel = CancellationToken::new();
        let timer = tokio::spawn(snapshot_loop(
            TimerRunning(Arc::clone(&state)),
            Arc::clone(&state),
            tracker,
            interval,
            cancel.clone(),
        ));

        Self {
            state,
            cancel,
            timer: Some(timer),
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.state.session_id
    }

    #[must_use]
    pub fn watch(&self) -> SessionWatch {
        SessionWatch {
            state: Arc::clone(&self.state),
        }
    }

    /// Sample memory now and append a snapshot with the given counters
    pub fn take_snapshot(&self, total: usize, completed: usize, failed: usize) -> DebugSnapshot {
        let memory_mb = self.state.sampler.lock().sample_mb();
        self.state.record(manual_stats(total, completed, failed), 0, memory_mb)
    }

    /// Append a snapshot with an externally measured memory value
    pub fn record_snapshot(
        &self,
        total: usize,
        completed: usize,
        failed: usize,
        memory_mb: f64,
    ) -> DebugSnapshot {
        self.state.record(manual_stats(total, completed, failed), 0, memory_mb)
    }

    /// Run the memory warning check; true when a warning was emitted
    pub fn check_memory_warning(&self, memory_mb: f64) -> bool {
        self.state.check_memory(memory_mb)
    }

    #[must_use]
    pub fn memory_warnings(&self) -> usize {
        self.state.memory_warnings.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<DebugSnapshot> {
        self.state.snapshots.lock().clone()
    }

    /// Whether the snapshot timer is still running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the timer and return the session so far
    ///
    /// Calling it again returns the same session with the original end time.
    pub fn end_session(&mut self) -> DebugSession {
        self.cancel.cancel();
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let ended_at = {
            let mut ended_at = self.state.ended_at.lock();
            if ended_at.is_none() {
                *ended_at = Some(Utc::now());
                info!(
                    session = %self.state.session_id,
                    "Debug session ended with {} snapshots",
                    self.state.snapshots.lock().len()
                );
            }
            *ended_at
        };
        self.session(ended_at)
    }

    fn session(&self, ended_at: Option<DateTime<Utc>>) -> DebugSession {
        DebugSession {
            session_id: self.state.session_id.clone(),
            started_at: self.state.started_at,
            ended_at,
            snapshots: self.snapshots(),
        }
    }

    #[must_use]
    pub fn generate_performance_report(&self, summary: Option<&TestSummary>) -> PerformanceReport {
        let snapshots = self.state.snapshots.lock();
        let snapshot_count = snapshots.len();
        let peak_memory_mb = snapshots.iter().map(|s| s.memory_mb).fold(0.0, f64::max);
        let average_memory_mb = if snapshot_count == 0 {
            0.0
        } else {
            snapshots.iter().map(|s| s.memory_mb).sum::<f64>() / snapshot_count as f64
        };
        drop(snapshots);

        let session_duration_ms = match *self.state.ended_at.lock() {
            Some(end) => u64::try_from((end - self.state.started_at).num_milliseconds()).unwrap_or(0),
            None => u64::try_from(self.state.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        let (average_task_duration_ms, throughput_pages_per_minute) = match summary {
            Some(summary) => {
                let dispatched = summary.results.iter().filter(|r| r.attempts > 0).count();
                let average = (dispatched > 0)
                    .then(|| summary.total_duration_ms as f64 / dispatched as f64);
                let throughput = (summary.wall_clock_ms > 0)
                    .then(|| dispatched as f64 / (summary.wall_clock_ms as f64 / 60_000.0));
                (average, throughput)
            }
            None => (None, None),
        };

        PerformanceReport {
            session_id: self.state.session_id.clone(),
            session_duration_ms,
            snapshot_count,
            peak_memory_mb,
            average_memory_mb,
            memory_warnings: self.memory_warnings(),
            average_task_duration_ms,
            throughput_pages_per_minute,
        }
    }

    /// Write `<prefix>-timeline.json` and `<prefix>-summary.json` to the output dir
    ///
    /// Failures are logged and returned; they never affect the audit itself.
    pub async fn save_audit_debug_data(
        &self,
        summary: &TestSummary,
    ) -> Result<DebugArtifacts, PersistenceError> {
        let result = self.write_artifacts(summary).await;
        match &result {
            Ok(artifacts) => info!(
                session = %self.state.session_id,
                "Debug data written to {}",
                artifacts.timeline_path.display()
            ),
            Err(e) => warn!(
                session = %self.state.session_id,
                "Failed to save debug data: {}",
                e
            ),
        }
        result
    }

    async fn write_artifacts(&self, summary: &TestSummary) -> Result<DebugArtifacts, PersistenceError> {
        let dir = self.state.config.output_dir.clone();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| PersistenceError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        let prefix = self
            .state
            .config
            .file_prefix
            .clone()
            .unwrap_or_else(|| format!("audit-{}", self.state.session_id));
        let timeline_path = dir.join(format!("{prefix}-timeline.json"));
        let summary_path = dir.join(format!("{prefix}-summary.json"));

        let session = self.session(*self.state.ended_at.lock());
        let performance = self.generate_performance_report(Some(summary));
        let timeline = serde_json::to_vec_pretty(&TimelineFile {
            session: &session,
            performance: &performance,
            config: &self.state.config,
        })?;
        let summary_json = serde_json::to_vec_pretty(summary)?;

        tokio::fs::write(&timeline_path, timeline)
            .await
            .map_err(|source| PersistenceError::Write {
                path: timeline_path.clone(),
                source,
            })?;
        tokio::fs::write(&summary_path, summary_json)
            .await
            .map_err(|source| PersistenceError::Write {
                path: summary_path.clone(),
                source,
            })?;

        Ok(DebugArtifacts {
            timeline_path,
            summary_path,
        })
    }
}

impl Drop for AuditDebugger {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

fn manual_stats(total: usize, completed: usize, failed: usize) -> ProgressStats {
    ProgressStats {
        total_pages: total,
        completed_pages: completed,
        failed_pages: failed,
        skipped_pages: 0,
    }
}

/// Clears `timer_running` however the timer task ends, abort included
struct TimerRunning(Arc<SessionState>);

impl Drop for TimerRunning {
    fn drop(&mut self) {
        self.0.timer_running.store(false, Ordering::Release);
    }
}

async fn snapshot_loop(
    _running: TimerRunning,
    state: Arc<SessionState>,
    tracker: ProgressTracker,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let stats = tracker.snapshot();
                let memory_mb = state.sampler.lock().sample_mb();
                state.record(stats, tracker.in_flight(), memory_mb);
            }
        }
    }
    debug!(session = %state.session_id, "Snapshot timer stopped");
}
