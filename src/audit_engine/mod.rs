//! Audit Engine Module
//!
//! Scheduling, per-URL workers and aggregation for batch audits.

pub mod aggregator;
pub mod events;
pub mod fingerprint_limiter;
pub mod page_timeout;
pub mod progress;
pub mod scheduler;
pub mod task_types;
pub(crate) mod worker;

pub use aggregator::build_summary;
pub use events::{AuditEventHandler, NoOpEventHandler, ProgressStats};
pub use fingerprint_limiter::FingerprintLimiter;
pub use page_timeout::with_attempt_timeout;
pub use progress::ProgressTracker;
pub use scheduler::{AuditScheduler, RunRecords};
pub use task_types::{AuditTask, TaskOutcome, TaskRecord, TaskState};
