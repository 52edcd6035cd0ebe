//! # Task abstraction for graph-driven execution.
//!
//! Defines the core [`Task`] trait for async units of work.
//!
//! - **[`Task`]** — trait for implementing async tasks that produce a result
//! - **[`TaskRef`]** — shared handle (`Arc<dyn Task>`) for passing tasks across the engine
//! - **[`BoxTaskFuture`]** — type alias for boxed task futures
//! - **[`TaskId`]** / **[`TaskOutput`]** — the id and result-value types
//!
//! ## Rules
//! - The crate provides [`TaskFn`](crate::TaskFn) — a function-backed
//!   implementation that wraps closures as tasks.
//! - Tasks receive a [`CancellationToken`]; it is cancelled when the run is
//!   reset, never when the scheduler drains on `stop` (stopping is a
//!   cooperative drain, not an interruption).
//! - A task is a capability providing a single operation: run to a result or
//!   an error. Completion is tracked by the graph, never inside the task.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Opaque, user-supplied task identifier, unique within a graph.
pub type TaskId = String;

/// Result value produced by a successful task execution.
///
/// Carried by `TaskCompleted` events and handed to subscribers; JSON keeps
/// the payload transport-friendly for monitors and adapters.
pub type TaskOutput = serde_json::Value;

/// Boxed future returned by [`Task::run`].
///
/// This is a type alias for `Pin<Box<dyn Future<...>>>`:
/// - **Boxed**: Required for trait objects (dynamic dispatch)
/// - **Pinned**: Required for async futures (self-referential structs)
/// - **Send**: Task futures can be sent across threads
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<TaskOutput, TaskError>> + Send + 'static>>;

/// Shared handle to a task object.
///
/// Type alias for `Arc<dyn Task>`, used throughout the engine for:
/// - Registering tasks in a [`TaskGraph`](crate::TaskGraph)
/// - Sharing tasks between the graph and dispatched workers
/// - Cloning task references cheaply
pub type TaskRef = Arc<dyn Task>;

/// Asynchronous unit of work with a stable identity.
///
/// A `Task` represents a unit of work that can be:
/// - **Run multiple times** (via [`run`](Task::run); each call yields a fresh future)
/// - **Ordered** by a dependency graph (identity via [`id`](Task::id))
/// - **Dispatched** by a [`Scheduler`](crate::Scheduler)
///
/// ## Rules
///
/// - **Stateless running**: `run(&self)` is `Fn`, not `FnMut` — no shared
///   mutable state; share state explicitly through `Arc` inside the closure
///   if needed
/// - **Fresh futures**: each `run()` call creates a **new** independent future
/// - **Deadlines**: there is no per-task timeout at this layer; wrap the body
///   in `tokio::time::timeout` yourself if you need one
pub trait Task: Send + Sync + 'static {
    /// Returns the stable task id.
    ///
    /// Used as the graph key and in lifecycle events.
    fn id(&self) -> &str;

    /// Creates a new future that runs the task to a result value or an error.
    ///
    /// The token is cancelled when the owning run is reset; honoring it is
    /// optional but lets in-flight work bail out early instead of producing
    /// a result nobody will consume.
    fn run(&self, ctx: CancellationToken) -> BoxTaskFuture;
}
