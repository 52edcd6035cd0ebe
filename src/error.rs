//! # Error types used by the dagvisor engine and tasks.
//!
//! This module defines four error enums, one per failure domain:
//!
//! - [`GraphError`] rejected mutations of the dependency graph.
//! - [`ControlError`] invalid arguments on the scheduler control surface.
//! - [`TaskError`] failures raised by individual task executions.
//! - [`SampleError`] host-metric reads that failed inside the adaptive controller.
//!
//! All types provide `as_label()` returning a short stable snake_case label
//! for logs and metrics.
//!
//! ## Propagation policy
//! - `GraphError` and `ControlError` are raised synchronously to the caller;
//!   the graph/scheduler state is unchanged after a failed call.
//! - `TaskError` is never raised across the scheduler boundary. It is caught
//!   at the dispatch boundary and surfaced as a `TaskFailed` event.
//! - `SampleError` is surfaced as a `SampleFailed` event; the sampling loop
//!   keeps running.

use thiserror::Error;

use crate::tasks::TaskId;

/// # Errors produced by dependency-graph mutations.
///
/// Every failed mutation leaves the graph in the exact state it was in
/// before the call.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Attempted to register a task id that already exists in the graph.
    #[error("task '{id}' is already registered")]
    DuplicateTask {
        /// The duplicate task id.
        id: TaskId,
    },

    /// Referenced a task id that is not registered in the graph.
    #[error("task '{id}' is not registered")]
    UnknownTask {
        /// The missing task id.
        id: TaskId,
    },

    /// A mutation would introduce a cycle, or an ordering traversal found one.
    #[error("dependency cycle detected through task '{id}'")]
    Cycle {
        /// A task on the rejected cycle.
        id: TaskId,
    },
}

impl GraphError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            GraphError::DuplicateTask { .. } => "graph_duplicate_task",
            GraphError::UnknownTask { .. } => "graph_unknown_task",
            GraphError::Cycle { .. } => "graph_cycle",
        }
    }
}

/// # Errors produced by the scheduler control surface.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The concurrency bound must be a positive integer.
    #[error("concurrency must be a positive integer, got {value}")]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },
}

impl ControlError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ControlError::InvalidConcurrency { .. } => "control_invalid_concurrency",
        }
    }
}

/// # Errors produced by task execution.
///
/// These represent failures of individual async tasks driven by the
/// scheduler. They are delivered to observers via `TaskFailed` events and
/// never tear down the engine. A failed task is not marked completed, so its
/// dependents stay blocked.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    /// Task execution failed.
    #[error("execution failed: {reason}")]
    Fail { reason: String },

    /// Task observed its cancellation token and exited early.
    ///
    /// Settles as a failure for accounting purposes: the task produced no
    /// result, so its dependents must not run.
    #[error("context canceled")]
    Canceled,
}

impl TaskError {
    /// Convenience constructor for the common failure case.
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }
}

/// # Errors produced while sampling host utilization.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum SampleError {
    /// A metric source could not be read.
    #[error("failed to read host metrics: {reason}")]
    Read { reason: String },

    /// A metric source was readable but not in the expected shape.
    #[error("malformed metric source: {detail}")]
    Parse { detail: String },
}

impl SampleError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            SampleError::Read { .. } => "sample_read",
            SampleError::Parse { .. } => "sample_parse",
        }
    }
}

impl From<std::io::Error> for SampleError {
    fn from(e: std::io::Error) -> Self {
        SampleError::Read {
            reason: e.to_string(),
        }
    }
}
