//! # TaskGraph: dependency model with incremental cycle rejection.
//!
//! Stores task records, forward (`deps`) and reverse (`rdeps`) adjacency and
//! a completion set. Mutations validate before committing, so a failed call
//! leaves the graph exactly as it was.
//!
//! ## Invariants (hold after every non-failing mutation)
//! - Every id appearing in `deps[x]` or `rdeps[x]` is registered.
//! - `y ∈ deps[x] ⇔ x ∈ rdeps[y]`.
//! - The dependency relation is acyclic.
//! - The completed set is a subset of the registered ids.
//!
//! ## Determinism
//! Registration order is preserved and used as the tie-break everywhere:
//! [`TaskGraph::ready_tasks`] and [`TaskGraph::topological_order`] return the
//! same sequence for identical insertion sequences.

use std::collections::{HashMap, HashSet};

use crate::error::GraphError;
use crate::tasks::{TaskId, TaskRef};

use super::node::TaskNode;

/// Visitation colors for the ordering traversal.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current traversal path; reaching a grey node means a cycle.
    Grey,
    /// Fully explored and already in the output.
    Black,
}

/// In-memory dependency graph keyed by task id.
///
/// The graph is mutated by user code before (or between) runs; during a run
/// the scheduler only reads adjacency and appends to the completed set.
/// Concurrent mutation while a scheduler drives the graph is not supported —
/// share it behind the same lock the scheduler uses.
#[derive(Clone, Default, Debug)]
pub struct TaskGraph {
    /// Task records plus adjacency.
    nodes: HashMap<TaskId, TaskNode>,
    /// Registration order; the deterministic tie-break for all queries.
    order: Vec<TaskId>,
    /// Ids whose task has completed successfully.
    completed: HashSet<TaskId>,
}

impl TaskGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task under its own id.
    ///
    /// Fails with [`GraphError::DuplicateTask`] if the id is already
    /// registered. Returns `&mut Self` so registrations chain with `?`.
    pub fn add_task(&mut self, task: TaskRef) -> Result<&mut Self, GraphError> {
        let id = task.id().to_string();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateTask { id });
        }
        self.order.push(id.clone());
        self.nodes.insert(id, TaskNode::new(task));
        Ok(self)
    }

    /// Declares that `id` depends on `prereq`.
    ///
    /// See [`TaskGraph::add_dependencies`] for the full semantics.
    pub fn add_dependency(&mut self, id: &str, prereq: &str) -> Result<&mut Self, GraphError> {
        self.add_dependencies(id, [prereq])
    }

    /// Declares that `id` depends on every id in `prereqs`.
    ///
    /// The call is atomic: every prerequisite is validated before any edge is
    /// committed, so a failure leaves the graph unchanged.
    ///
    /// ### Failure modes
    /// - [`GraphError::UnknownTask`] if `id` or any prerequisite is not
    ///   registered.
    /// - [`GraphError::Cycle`] on a self-dependency, or when `id` is already
    ///   reachable from a prerequisite over deps edges (the edge would close
    ///   a cycle).
    ///
    /// ### Idempotence
    /// Prerequisites already recorded for `id` (or repeated within
    /// `prereqs`) are skipped; no duplicate edges are ever stored.
    pub fn add_dependencies<I, S>(&mut self, id: &str, prereqs: I) -> Result<&mut Self, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::UnknownTask { id: id.to_string() });
        }

        // Validation pass. Checking each prerequisite against the current
        // graph is sound for the batch as a whole: every new edge emanates
        // from `id`, and a deps-traversal from a prerequisite can only cross
        // those edges after already reaching `id`.
        let mut accepted: Vec<TaskId> = Vec::new();
        for prereq in prereqs {
            let prereq = prereq.as_ref();
            if !self.nodes.contains_key(prereq) {
                return Err(GraphError::UnknownTask {
                    id: prereq.to_string(),
                });
            }
            if prereq == id {
                return Err(GraphError::Cycle { id: id.to_string() });
            }
            let duplicate = self.nodes[id].deps.iter().any(|d| d == prereq)
                || accepted.iter().any(|d| d == prereq);
            if duplicate {
                continue;
            }
            if self.reaches(prereq, id) {
                return Err(GraphError::Cycle { id: id.to_string() });
            }
            accepted.push(prereq.to_string());
        }

        // Commit pass.
        for prereq in accepted {
            if let Some(node) = self.nodes.get_mut(id) {
                node.deps.push(prereq.clone());
            }
            if let Some(node) = self.nodes.get_mut(&prereq) {
                node.rdeps.push(id.to_string());
            }
        }
        Ok(self)
    }

    /// True if `target` is reachable from `from` following deps edges.
    fn reaches(&self, from: &str, target: &str) -> bool {
        let mut stack: Vec<&str> = vec![from];
        let mut seen: HashSet<&str> = HashSet::new();

        while let Some(cur) = stack.pop() {
            if cur == target {
                return true;
            }
            if !seen.insert(cur) {
                continue;
            }
            if let Some(node) = self.nodes.get(cur) {
                stack.extend(node.deps.iter().map(TaskId::as_str));
            }
        }
        false
    }

    /// Returns the ids that are ready to run, in registration order.
    ///
    /// A task is ready when it is not completed and every prerequisite is.
    /// Running/queued filtering is the scheduler's concern, not the graph's.
    #[must_use]
    pub fn ready_tasks(&self) -> Vec<TaskId> {
        self.order
            .iter()
            .filter(|id| !self.completed.contains(*id))
            .filter(|id| self.nodes[*id].deps.iter().all(|d| self.completed.contains(d)))
            .cloned()
            .collect()
    }

    /// Marks `id` as completed.
    ///
    /// Idempotent on already-completed ids. Deliberately lenient about
    /// unsatisfied prerequisites so that completion replay is tolerated; the
    /// dispatch-order invariant is enforced by the scheduler.
    pub fn mark_completed(&mut self, id: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::UnknownTask { id: id.to_string() });
        }
        self.completed.insert(id.to_string());
        Ok(())
    }

    /// Empties the completed set. Tasks and edges remain.
    pub fn reset(&mut self) {
        self.completed.clear();
    }

    /// True iff every registered task has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed.len() == self.nodes.len()
    }

    /// True if `id` is in the completed set.
    #[must_use]
    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    /// Number of completed tasks.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Returns a total order consistent with the dependency relation: every
    /// prerequisite precedes its dependents.
    ///
    /// Computed by an iterative depth-first traversal with white/grey/black
    /// marking over registration-ordered roots, so the order is stable across
    /// runs for identical insertion sequences. A grey hit raises
    /// [`GraphError::Cycle`]; this cannot occur if mutation invariants held.
    pub fn topological_order(&self) -> Result<Vec<TaskId>, GraphError> {
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(self.nodes.len());
        let mut out: Vec<TaskId> = Vec::with_capacity(self.nodes.len());
        // (id, expanded): expanded entries turn black on second pop.
        let mut stack: Vec<(&str, bool)> = Vec::new();

        for root in &self.order {
            if marks.get(root.as_str()) == Some(&Mark::Black) {
                continue;
            }
            stack.push((root.as_str(), false));

            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    marks.insert(id, Mark::Black);
                    out.push(id.to_string());
                    continue;
                }
                match marks.get(id) {
                    Some(Mark::Black) => continue,
                    Some(Mark::Grey) => {
                        // `id` is its own ancestor on the traversal path.
                        return Err(GraphError::Cycle { id: id.to_string() });
                    }
                    None => {}
                }
                marks.insert(id, Mark::Grey);
                stack.push((id, true));
                // Reverse push so prerequisites are visited in stored order.
                for dep in self.nodes[id].deps.iter().rev() {
                    if marks.get(dep.as_str()) != Some(&Mark::Black) {
                        stack.push((dep.as_str(), false));
                    }
                }
            }
        }
        Ok(out)
    }

    /// Returns the task registered under `id`.
    pub fn task(&self, id: &str) -> Result<TaskRef, GraphError> {
        self.nodes
            .get(id)
            .map(|n| n.task.clone())
            .ok_or_else(|| GraphError::UnknownTask { id: id.to_string() })
    }

    /// Returns the direct prerequisites of `id`, in insertion order.
    pub fn deps(&self, id: &str) -> Result<&[TaskId], GraphError> {
        self.nodes
            .get(id)
            .map(|n| n.deps.as_slice())
            .ok_or_else(|| GraphError::UnknownTask { id: id.to_string() })
    }

    /// Returns the direct dependents of `id`, in insertion order.
    pub fn rdeps(&self, id: &str) -> Result<&[TaskId], GraphError> {
        self.nodes
            .get(id)
            .map(|n| n.rdeps.as_slice())
            .ok_or_else(|| GraphError::UnknownTask { id: id.to_string() })
    }

    /// All registered ids, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(TaskId::as_str)
    }

    /// True if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no tasks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
