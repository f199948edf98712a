//! Configuration module for audit runs
//!
//! This module provides `TestOptions` and its builder, plus `DebugConfig`
//! for the diagnostic session.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::TestOptionsBuilder;
pub use types::{AnalyzerFlags, DebugConfig, EventCallbacks, RetryBackoff, TestOptions};
