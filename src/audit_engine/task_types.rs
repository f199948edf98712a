//! Per-URL task state and terminal records

use serde::{Deserialize, Serialize};

use crate::errors::FailureKind;
use crate::results::AccessibilityResult;

/// Lifecycle state of one [`AuditTask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Navigating,
    Analyzing,
    /// An attempt failed and the task is waiting to retry
    Error,
    RetryWait,
    RedirectSkipped,
    Completed,
    Crashed,
    Failed,
}

impl TaskState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::RedirectSkipped | Self::Completed | Self::Crashed | Self::Failed
        )
    }

    /// Whether `self -> next` is an edge of the task state machine
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use TaskState::{
            Analyzing, Completed, Crashed, Error, Failed, Navigating, Pending, RedirectSkipped,
            RetryWait,
        };
        matches!(
            (self, next),
            (Pending, Navigating)
                | (Pending, Failed)
                | (Navigating, Analyzing)
                | (Navigating, RedirectSkipped)
                | (Navigating, Error)
                | (Navigating, Crashed)
                | (Analyzing, Completed)
                | (Analyzing, Error)
                | (Analyzing, Crashed)
                | (Error, RetryWait)
                | (Error, Failed)
                | (RetryWait, Navigating)
                | (RetryWait, Failed)
        )
    }
}

/// One planned URL moving through the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTask {
    pub index: usize,
    pub url: String,
    /// Attempts started so far (1-based once navigating)
    pub attempt: u32,
    pub state: TaskState,
}

impl AuditTask {
    pub fn new(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
            attempt: 0,
            state: TaskState::Pending,
        }
    }

    /// Move to `next`, logging edges outside the state machine
    pub fn transition(&mut self, next: TaskState) {
        if !self.state.can_transition_to(next) {
            log::error!(
                "Task {} ({}) made unexpected transition {:?} -> {:?}",
                self.index,
                self.url,
                self.state,
                next
            );
        }
        log::trace!("Task {} {:?} -> {:?}", self.index, self.state, next);
        self.state = next;
    }

    /// Start a new attempt
    pub fn begin_attempt(&mut self) {
        self.attempt += 1;
        self.transition(TaskState::Navigating);
    }
}

/// How a task ended
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Completed(Box<AccessibilityResult>),
    RedirectSkipped { target: String },
    Failed { error: String, kind: FailureKind },
    Crashed { error: String },
    /// Never dispatched because the run was cancelled
    Cancelled,
}

impl TaskOutcome {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::RedirectSkipped { .. } => "redirect_skipped",
            Self::Failed { .. } => "failed",
            Self::Crashed { .. } => "crashed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Terminal record of one planned URL, handed to the aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    /// Position in the planned URL list
    pub index: usize,
    pub url: String,
    pub outcome: TaskOutcome,
    pub attempts: u32,
    /// Sum of the wall time of every attempt
    pub duration_ms: u64,
}

impl TaskRecord {
    #[must_use]
    pub fn cancelled(index: usize, url: String) -> Self {
        Self {
            index,
            url,
            outcome: TaskOutcome::Cancelled,
            attempts: 0,
            duration_ms: 0,
        }
    }
}
