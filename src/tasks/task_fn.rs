//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a
//! fresh future per run. This avoids shared mutable state and needs no
//! `Mutex`.
//!
//! ## Concurrency semantics
//! - Each call to [`TaskFn::run`] creates a **new** future owning its state.
//! - No hidden mutation between runs; if shared state is needed, use
//!   `Arc<...>` explicitly inside the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use dagvisor::{TaskFn, TaskRef, TaskError, TaskOutput};
//!
//! let t: TaskRef = TaskFn::arc("extract", |_ctx: CancellationToken| async move {
//!     Ok::<TaskOutput, TaskError>(serde_json::json!({"rows": 128}))
//! });
//!
//! assert_eq!(t.id(), "extract");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{BoxTaskFuture, Task, TaskOutput};

/// Function-backed task implementation.
///
/// Wraps a closure that *creates* a new future per run.
#[derive(Debug)]
pub struct TaskFn<F> {
    id: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(id: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { id: id.into(), f }
    }

    /// Creates the task and returns it as a shared handle (`Arc<dyn Task>`).
    ///
    /// ## Example
    /// ```rust
    /// use tokio_util::sync::CancellationToken;
    /// use dagvisor::{TaskFn, TaskRef, TaskError, TaskOutput};
    ///
    /// let t: TaskRef = TaskFn::arc("hello", |_ctx: CancellationToken| async {
    ///     Ok::<TaskOutput, TaskError>(TaskOutput::Null)
    /// });
    /// assert_eq!(t.id(), "hello");
    /// ```
    pub fn arc(id: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(id, f))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<TaskOutput, TaskError>> + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn run(&self, ctx: CancellationToken) -> BoxTaskFuture {
        let fut = (self.f)(ctx);
        Box::pin(fut)
    }
}
