//! # Task abstractions.
//!
//! This module provides the core task-related types:
//! - [`Task`] - trait for implementing async result-producing tasks
//! - [`TaskFn`] - function-based task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`TaskId`] / [`TaskOutput`] - id and result-value aliases

mod task;
mod task_fn;

pub use task::{BoxTaskFuture, Task, TaskId, TaskOutput, TaskRef};
pub use task_fn::TaskFn;
