//! Internal node storage for the task graph.

use std::fmt;

use crate::tasks::{TaskId, TaskRef};

/// Internal node structure: the task plus immediate deps and dependents.
///
/// `deps` and `rdeps` are kept as ordered, deduplicated vectors so that
/// traversal order is stable for identical insertion sequences.
#[derive(Clone)]
pub(crate) struct TaskNode {
    /// The registered task object.
    pub(crate) task: TaskRef,
    /// Direct prerequisites: tasks that must complete before this one can run.
    pub(crate) deps: Vec<TaskId>,
    /// Direct dependents: tasks that list this one as a prerequisite.
    pub(crate) rdeps: Vec<TaskId>,
}

impl TaskNode {
    pub(crate) fn new(task: TaskRef) -> Self {
        Self {
            task,
            deps: Vec::new(),
            rdeps: Vec::new(),
        }
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("task", &self.task.id())
            .field("deps", &self.deps)
            .field("rdeps", &self.rdeps)
            .finish()
    }
}
