//! Result types produced by an audit run
//!
//! `AccessibilityResult` is the merged per-page output of every enabled
//! analyzer. `TestSummary` is the run-level aggregate built once all tasks
//! have reached a terminal state.

pub mod issue;
pub mod page_result;
pub mod sections;
pub mod summary;

pub use issue::{AuditIssue, Severity};
pub use page_result::{AccessibilityResult, AnalysisResult, AnalysisSection, AnalyzerFailure, ResultField};
pub use sections::{
    AccessibilityFindings, MobileFindings, Pa11yFindings, PerformanceMetrics, SecurityFindings,
    SeoFindings, SocialFindings, StructuredDataFindings, TechnicalSeoFindings,
};
pub use summary::{PageOutcome, PageStatus, TestSummary};
