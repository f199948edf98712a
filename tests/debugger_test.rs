//! Debug session timer, memory warnings and persistence

use kodegen_tools_siteaudit::audit_engine::{ProgressTracker, TaskOutcome, TaskRecord, build_summary};
use kodegen_tools_siteaudit::errors::FailureKind;
use kodegen_tools_siteaudit::{
    AccessibilityResult, AnalyzerFlags, AuditDebugger, DebugConfig, PersistenceError, TestSummary,
};
use std::time::Duration;
use tempfile::TempDir;

fn quiet_config() -> DebugConfig {
    // long interval: only the timer's immediate first tick could fire
    DebugConfig::default().with_snapshot_interval(Duration::from_secs(3600))
}

fn summary() -> TestSummary {
    let mut ok = AccessibilityResult::new("https://a.test/", AnalyzerFlags::default());
    ok.finalize(1_000);
    let records = vec![
        TaskRecord {
            index: 0,
            url: ok.url.clone(),
            outcome: TaskOutcome::Completed(Box::new(ok)),
            attempts: 1,
            duration_ms: 1_000,
        },
        TaskRecord {
            index: 1,
            url: "https://a.test/b".to_string(),
            outcome: TaskOutcome::Failed {
                error: "net::ERR_TIMED_OUT".to_string(),
                kind: FailureKind::Timeout,
            },
            attempts: 3,
            duration_ms: 1_500,
        },
        TaskRecord {
            index: 2,
            url: "https://a.test/c".to_string(),
            outcome: TaskOutcome::RedirectSkipped {
                target: "https://a.test/d".to_string(),
            },
            attempts: 1,
            duration_ms: 500,
        },
        TaskRecord::cancelled(3, "https://a.test/e".to_string()),
    ];
    build_summary(records, 4, 60_000)
}

#[tokio::test]
async fn timer_collects_snapshots_until_the_session_ends() {
    let tracker = ProgressTracker::new();
    tracker.start_run(4);
    let config = DebugConfig::default().with_snapshot_interval(Duration::from_millis(20));
    let mut debugger = AuditDebugger::start_session(config, tracker);
    assert!(debugger.is_active());

    tokio::time::sleep(Duration::from_millis(150)).await;
    let session = debugger.end_session();
    assert!(!debugger.is_active());
    assert!(session.snapshots.len() >= 3, "got {}", session.snapshots.len());
    assert!(session.ended_at.is_some());
    assert!(session.snapshots.iter().all(|s| s.total_pages == 4 && s.in_flight_pages == 0));
    for pair in session.snapshots.windows(2) {
        assert!(pair[0].elapsed_ms <= pair[1].elapsed_ms);
    }

    let count = session.snapshots.len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(debugger.snapshots().len(), count);

    // ending twice keeps the first end time
    assert_eq!(debugger.end_session().ended_at, session.ended_at);
}

#[tokio::test]
async fn dropping_the_debugger_stops_its_timer() {
    let tracker = ProgressTracker::new();
    tracker.start_run(2);
    let config = DebugConfig::default().with_snapshot_interval(Duration::from_millis(10));
    let debugger = AuditDebugger::start_session(config, tracker);
    let watch = debugger.watch();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(watch.timer_running());
    assert!(watch.snapshot_count() >= 1);

    // no end_session, as when the run bails out with an error
    drop(debugger);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!watch.timer_running());

    let count = watch.snapshot_count();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(watch.snapshot_count(), count);
}

#[tokio::test]
async fn take_snapshot_records_counters_and_memory() {
    let mut debugger = AuditDebugger::start_session(quiet_config(), ProgressTracker::new());
    debugger.end_session();

    let snapshot = debugger.take_snapshot(10, 4, 1);
    assert_eq!(snapshot.total_pages, 10);
    assert_eq!(snapshot.completed_pages, 4);
    assert_eq!(snapshot.failed_pages, 1);
    assert!(snapshot.memory_mb >= 0.0);
    assert_eq!(debugger.snapshots().last(), Some(&snapshot));
}

#[tokio::test]
async fn memory_warning_fires_once_per_excursion() {
    let config = quiet_config().with_memory_warning_threshold_mb(100);
    let mut debugger = AuditDebugger::start_session(config, ProgressTracker::new());
    debugger.end_session();

    assert!(!debugger.check_memory_warning(50.0));
    assert!(debugger.check_memory_warning(150.0));
    assert!(!debugger.check_memory_warning(160.0));
    // below the threshold but above 90 MB: still disarmed
    assert!(!debugger.check_memory_warning(95.0));
    assert!(!debugger.check_memory_warning(120.0));
    // re-armed below 90 MB
    assert!(!debugger.check_memory_warning(80.0));
    assert!(debugger.check_memory_warning(130.0));

    assert_eq!(debugger.memory_warnings(), 2);
}

#[tokio::test]
async fn snapshots_run_the_memory_check() {
    let config = quiet_config().with_memory_warning_threshold_mb(100);
    let mut debugger = AuditDebugger::start_session(config, ProgressTracker::new());
    debugger.end_session();

    debugger.record_snapshot(1, 0, 0, 500.0);
    debugger.record_snapshot(1, 1, 0, 600.0);
    assert_eq!(debugger.memory_warnings(), 1);
}

#[tokio::test]
async fn performance_report_math() {
    let mut debugger = AuditDebugger::start_session(quiet_config(), ProgressTracker::new());
    debugger.end_session();

    debugger.record_snapshot(4, 1, 0, 100.0);
    debugger.record_snapshot(4, 2, 1, 300.0);
    debugger.record_snapshot(4, 4, 1, 200.0);

    let report = debugger.generate_performance_report(Some(&summary()));
    assert_eq!(report.snapshot_count, 3);
    assert_eq!(report.peak_memory_mb, 300.0);
    assert_eq!(report.average_memory_mb, 200.0);
    // three dispatched tasks over 3000 ms; the cancelled one never ran
    assert_eq!(report.average_task_duration_ms, Some(1_000.0));
    assert_eq!(report.throughput_pages_per_minute, Some(3.0));
    assert_eq!(report.session_id, debugger.session_id());

    let bare = debugger.generate_performance_report(None);
    assert_eq!(bare.average_task_duration_ms, None);
    assert_eq!(bare.throughput_pages_per_minute, None);
}

#[tokio::test]
async fn debug_data_is_written_to_the_output_dir() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("nested").join("debug");
    let config = quiet_config().with_output_dir(&out).with_file_prefix("run1");
    let mut debugger = AuditDebugger::start_session(config, ProgressTracker::new());
    debugger.end_session();
    debugger.record_snapshot(4, 4, 1, 123.0);

    let summary = summary();
    let artifacts = debugger.save_audit_debug_data(&summary).await.unwrap();

    assert_eq!(artifacts.timeline_path, out.join("run1-timeline.json"));
    assert_eq!(artifacts.summary_path, out.join("run1-summary.json"));

    let saved: TestSummary =
        serde_json::from_slice(&std::fs::read(&artifacts.summary_path).unwrap()).unwrap();
    assert_eq!(saved, summary);

    let timeline: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&artifacts.timeline_path).unwrap()).unwrap();
    assert_eq!(timeline["session"]["session_id"], debugger.session_id());
    let snapshots = timeline["session"]["snapshots"].as_array().unwrap();
    assert_eq!(snapshots.last().unwrap()["memory_mb"], 123.0);
    assert_eq!(timeline["performance"]["peak_memory_mb"], 123.0);
}

#[tokio::test]
async fn default_prefix_uses_the_session_id() {
    let dir = TempDir::new().unwrap();
    let mut debugger =
        AuditDebugger::start_session(quiet_config().with_output_dir(dir.path()), ProgressTracker::new());
    debugger.end_session();

    let artifacts = debugger.save_audit_debug_data(&summary()).await.unwrap();
    let name = artifacts.summary_path.file_name().unwrap().to_string_lossy().to_string();
    assert_eq!(name, format!("audit-{}-summary.json", debugger.session_id()));
}

#[tokio::test]
async fn unwritable_output_dir_is_an_error_not_a_panic() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let config = quiet_config().with_output_dir(blocker.join("debug"));
    let mut debugger = AuditDebugger::start_session(config, ProgressTracker::new());
    debugger.end_session();

    let err = debugger.save_audit_debug_data(&summary()).await.unwrap_err();
    assert!(matches!(err, PersistenceError::CreateDir { .. }));
}
