//! # Scheduler coordination state.
//!
//! All mutable scheduler state lives in [`State`] behind one mutex — the
//! running set, the ready queue, counters, mode flags and the run epoch.
//! Workers never touch it directly; they hand a settlement back to the
//! scheduler, which owns every transition.
//!
//! [`QueueStats`] is the externally visible snapshot of this state, handed
//! to monitors via `Scheduler::stats()` and attached to `QueueCompleted` /
//! `QueueStalled` events.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::tasks::TaskId;

/// Internal coordination state. Guarded by `Inner::state`.
pub(crate) struct State {
    /// In-flight tasks: id → worker join handle.
    pub(crate) running: HashMap<TaskId, JoinHandle<()>>,
    /// Ready ids awaiting a free worker slot, in discovery order.
    pub(crate) queue: VecDeque<TaskId>,
    /// Membership mirror of `queue` for O(1) duplicate checks.
    pub(crate) queued: HashSet<TaskId>,
    /// Ids that settled with an error this run. Terminal: the graph keeps
    /// reporting them as ready (they are not completed), but they must
    /// never be dispatched again until `start` or `reset` retries them.
    pub(crate) failed_ids: HashSet<TaskId>,
    /// Current concurrency bound.
    pub(crate) concurrency: usize,
    /// Dispatch is active.
    pub(crate) processing: bool,
    /// New dispatches are inhibited; in-flight tasks continue.
    pub(crate) paused: bool,
    /// Tasks settled successfully this run.
    pub(crate) completed: usize,
    /// Tasks settled with an error this run.
    pub(crate) failed: usize,
    /// Task count snapshot taken at start.
    pub(crate) total: usize,
    /// First `start()` of the run.
    pub(crate) started_at: Option<Instant>,
    /// Run completion, stall or stop.
    pub(crate) ended_at: Option<Instant>,
    /// Run generation. Bumped by reset; settlements from an older epoch are
    /// reported but no longer change graph, counters or dispatch.
    pub(crate) epoch: u64,
    /// Cooperative token handed to every task of the current run. Cancelled
    /// by reset, never by stop.
    pub(crate) run_token: CancellationToken,
}

impl State {
    pub(crate) fn new(concurrency: usize) -> Self {
        Self {
            running: HashMap::new(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            failed_ids: HashSet::new(),
            concurrency,
            processing: false,
            paused: false,
            completed: 0,
            failed: 0,
            total: 0,
            started_at: None,
            ended_at: None,
            epoch: 0,
            run_token: CancellationToken::new(),
        }
    }

    /// Produces the externally visible snapshot.
    pub(crate) fn stats(&self) -> QueueStats {
        let elapsed = self
            .started_at
            .map(|s| self.ended_at.unwrap_or_else(Instant::now).duration_since(s));
        QueueStats {
            total: self.total,
            completed: self.completed,
            failed: self.failed,
            running: self.running.len(),
            queued: self.queue.len(),
            concurrency: self.concurrency,
            processing: self.processing,
            paused: self.paused,
            elapsed,
        }
    }
}

/// Point-in-time snapshot of scheduler counters and mode flags.
///
/// Serializable so monitors can relay it as JSON without translation.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    /// Task count snapshotted when the run started.
    pub total: usize,
    /// Tasks that settled successfully.
    pub completed: usize,
    /// Tasks that settled with an error.
    pub failed: usize,
    /// Current size of the running set.
    pub running: usize,
    /// Current size of the ready queue.
    pub queued: usize,
    /// Current concurrency bound.
    pub concurrency: usize,
    /// Dispatch is active.
    pub processing: bool,
    /// Dispatch is inhibited.
    pub paused: bool,
    /// Wall-clock duration of the run so far (or final duration once ended).
    pub elapsed: Option<Duration>,
}
