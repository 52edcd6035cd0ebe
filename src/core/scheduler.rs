//! # Scheduler: drives a task graph to completion under a bounded pool.
//!
//! The [`Scheduler`] owns the runtime components (event bus, subscriber
//! fan-out, coordination state) and drives a shared [`TaskGraph`] from ready
//! set to completion without ever exceeding the current concurrency bound.
//!
//! - Dispatch ready tasks to workers, at most `concurrency` in flight
//! - Settle each worker result back into graph and counters
//! - Emit lifecycle events for every transition
//! - Expose pause/resume/stop/reset and runtime retuning of the bound
//!
//! ## Architecture
//! ```text
//! TaskGraph ──► Scheduler::start()
//!                    │
//!                    ├──► seed ready queue from graph
//!                    ├──► pump(): dispatch while |running| < concurrency
//!                    │         └──► worker: task.run(ctx) → settle()
//!                    │
//!                    ├──► settle(): mark graph, refresh ready, pump again
//!                    │         └──► QueueCompleted / QueueStalled at quiescence
//!                    │
//!                    └──► subscriber listener
//!                              └──► fans out to SubscriberSet
//! ```
//!
//! ## Rules
//! - `|running| ≤ concurrency` between any two transitions
//! - A task's `TaskCompleted` is published **before** `TaskStarted` of any
//!   dependent (strictly smaller `seq`)
//! - `QueueCompleted` is published at most once per run, after every task
//!   event of that run
//! - A failed task is **not** marked completed; it is terminal for the run
//!   and its dependents stay blocked while independent branches keep
//!   draining
//! - Narrowing the bound never preempts; widening dispatches immediately
//! - All coordination state sits behind **one mutex**, never held across an
//!   `.await`; workers call back into `settle` rather than touching state

use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::controller::AdaptiveController;
use crate::core::state::{QueueStats, State};
use crate::error::{ControlError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::graph::TaskGraph;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::{TaskId, TaskOutput};

/// Bounded-concurrency execution engine over a shared [`TaskGraph`].
///
/// Cheap to clone; clones share the same engine. The scheduler shares the
/// graph rather than owning it: the graph may outlive the scheduler and be
/// reused after [`Scheduler::reset`].
///
/// Constructing a scheduler (and most control calls) requires a running
/// Tokio runtime, since workers and subscriber queues are spawned tasks.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    graph: Arc<Mutex<TaskGraph>>,
    state: Mutex<State>,
    bus: Bus,
}

impl Scheduler {
    /// Creates a new scheduler over `graph`.
    ///
    /// Spawns one worker task per subscriber plus the fan-out listener.
    /// When `cfg.autostart` is set, processing begins immediately.
    pub fn new(
        graph: Arc<Mutex<TaskGraph>>,
        cfg: SchedulerConfig,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(subscribers, bus.clone());

        let scheduler = Self {
            inner: Arc::new(Inner {
                graph,
                state: Mutex::new(State::new(cfg.concurrency_clamped())),
                bus,
            }),
        };
        scheduler.subscriber_listener(subs);

        if cfg.autostart {
            scheduler.start();
        }
        scheduler
    }

    /// Begins (or continues) processing. No-op when already processing.
    ///
    /// Snapshots the task count, records `started_at` if unset, clears the
    /// pause flag, seeds the ready queue from the graph and dispatches.
    pub fn start(&self) -> &Self {
        let mut st = self.lock_state();
        if st.processing {
            return self;
        }
        st.processing = true;
        st.paused = false;
        if st.started_at.is_none() {
            st.started_at = Some(Instant::now());
        }
        st.ended_at = None;
        // A fresh start retries tasks that failed in the previous run.
        st.failed_ids.clear();
        {
            let graph = self.lock_graph();
            st.total = graph.len();
            Self::refresh_ready(&mut st, &graph);
        }
        self.pump(&mut st);
        self.maybe_finish(&mut st);
        self
    }

    /// Inhibits new dispatches; in-flight tasks continue. Emits `Paused`.
    pub fn pause(&self) -> &Self {
        let mut st = self.lock_state();
        if !st.paused {
            st.paused = true;
            self.inner.bus.publish(Event::now(EventKind::Paused));
        }
        self
    }

    /// Clears the pause flag and resumes dispatch. Emits `Resumed`.
    ///
    /// When not currently processing, behaves as [`Scheduler::start`].
    pub fn resume(&self) -> &Self {
        {
            let mut st = self.lock_state();
            if st.processing {
                if st.paused {
                    st.paused = false;
                    self.inner.bus.publish(Event::now(EventKind::Resumed));
                    self.pump(&mut st);
                    self.maybe_finish(&mut st);
                }
                return self;
            }
        }
        self.inner.bus.publish(Event::now(EventKind::Resumed));
        self.start();
        self
    }

    /// Stops processing and drops the pending ready queue. Emits `Stopped`.
    ///
    /// With `wait_for_running`, awaits every in-flight task before
    /// returning. Without it, returns immediately; late settlements are
    /// still tallied and reported, but trigger no further dispatch and no
    /// `QueueCompleted`.
    pub async fn stop(&self, wait_for_running: bool) {
        let handles: Vec<JoinHandle<()>> = {
            let mut st = self.lock_state();
            st.processing = false;
            st.queue.clear();
            st.queued.clear();
            if wait_for_running {
                st.running.drain().map(|(_, h)| h).collect()
            } else {
                Vec::new()
            }
        };

        for handle in handles {
            let _ = handle.await;
        }

        let mut st = self.lock_state();
        st.ended_at = Some(Instant::now());
        drop(st);
        self.inner.bus.publish(Event::now(EventKind::Stopped));
    }

    /// Stops without waiting, clears all run state and the graph's
    /// completion set. Emits `Reset`.
    ///
    /// The run token is cancelled so in-flight tasks may bail out
    /// cooperatively; whenever they settle, their results are reported but
    /// no longer change counters or the graph.
    pub fn reset(&self) -> &Self {
        let mut st = self.lock_state();
        st.processing = false;
        st.paused = false;
        st.queue.clear();
        st.queued.clear();
        st.running.clear();
        st.failed_ids.clear();
        st.completed = 0;
        st.failed = 0;
        st.total = 0;
        st.started_at = None;
        st.ended_at = None;
        st.epoch += 1;
        st.run_token.cancel();
        st.run_token = CancellationToken::new();
        self.lock_graph().reset();
        self.inner.bus.publish(Event::now(EventKind::Reset));
        self
    }

    /// Retunes the concurrency bound. Emits `ConcurrencyChanged` on change.
    ///
    /// Fails with [`ControlError::InvalidConcurrency`] when `n == 0`.
    /// Widening while processing dispatches additional ready tasks
    /// immediately; narrowing never preempts running tasks.
    pub fn set_concurrency(&self, n: usize) -> Result<(), ControlError> {
        if n == 0 {
            return Err(ControlError::InvalidConcurrency { value: n });
        }
        let mut st = self.lock_state();
        if st.concurrency != n {
            st.concurrency = n;
            self.inner
                .bus
                .publish(Event::now(EventKind::ConcurrencyChanged).with_concurrency(n));
            if st.processing && !st.paused {
                self.pump(&mut st);
            }
        }
        Ok(())
    }

    /// Subscribes this scheduler to an adaptive controller's proposals.
    ///
    /// One-way coupling: the controller emits `ConcurrencyUpdated` events;
    /// this forwarder applies each via [`Scheduler::set_concurrency`]. The
    /// controller holds no reference to the scheduler. The forwarder exits
    /// when the controller is dropped.
    pub fn adopt(&self, controller: &AdaptiveController) {
        let mut rx = controller.subscribe();
        let scheduler = self.clone();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) if ev.kind == EventKind::ConcurrencyUpdated => {
                        if let Some(n) = ev.concurrency {
                            // Proposals are clamped to min >= 1 at the source.
                            let _ = scheduler.set_concurrency(n);
                        }
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        });
    }

    /// Snapshot of counters, sizes, bound and mode flags.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.lock_state().stats()
    }

    /// Sorted ids of currently in-flight tasks.
    #[must_use]
    pub fn running(&self) -> Vec<TaskId> {
        let st = self.lock_state();
        let mut ids: Vec<TaskId> = st.running.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// True while dispatch is active.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.lock_state().processing
    }

    /// True while dispatch is inhibited.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.lock_state().paused
    }

    /// Current concurrency bound.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.lock_state().concurrency
    }

    /// Handle to the shared graph.
    #[must_use]
    pub fn graph(&self) -> Arc<Mutex<TaskGraph>> {
        Arc::clone(&self.inner.graph)
    }

    /// Creates a direct receiver for every future engine event.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Spawns the listener that fans bus events out to subscribers.
    ///
    /// Exits when the bus closes (scheduler dropped).
    fn subscriber_listener(&self, subs: SubscriberSet) {
        let mut rx = self.inner.bus.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subs.emit_arc(Arc::new(ev)),
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        });
    }

    /// Locks coordination state, recovering from worker panics.
    ///
    /// A poisoned lock only means a worker panicked between transitions; the
    /// state itself is consistent at every release point.
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the shared graph. Always acquired after the state lock.
    fn lock_graph(&self) -> MutexGuard<'_, TaskGraph> {
        self.inner
            .graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Pulls newly-ready ids out of the graph into the ready queue.
    ///
    /// Skips ids that are in flight, already queued, or terminally failed —
    /// the graph keeps reporting failed ids as ready (they were never
    /// completed), and re-dispatching them would loop forever.
    fn refresh_ready(st: &mut State, graph: &TaskGraph) {
        for id in graph.ready_tasks() {
            if st.running.contains_key(&id)
                || st.failed_ids.contains(&id)
                || !st.queued.insert(id.clone())
            {
                continue;
            }
            st.queue.push_back(id);
        }
    }

    /// Dispatch step: launch ready tasks while a worker slot is free.
    ///
    /// Publishes `TaskStarted` for every launch, strictly after the
    /// settlement events that unblocked it.
    fn pump(&self, st: &mut State) {
        while st.processing && !st.paused && st.running.len() < st.concurrency {
            let Some(id) = st.queue.pop_front() else {
                break;
            };
            st.queued.remove(&id);

            let task = match self.lock_graph().task(&id) {
                Ok(task) => task,
                // Ready ids come from the graph itself; losing one between
                // refresh and dispatch is a programmer bug.
                Err(err) => unreachable!("ready task vanished from graph: {err}"),
            };

            self.inner
                .bus
                .publish(Event::now(EventKind::TaskStarted).with_task(id.as_str()));

            let engine = self.clone();
            let token = st.run_token.clone();
            let epoch = st.epoch;
            let task_id = id.clone();
            let handle = tokio::spawn(async move {
                let result = task.run(token).await;
                engine.settle(task_id, epoch, result);
            });

            match st.running.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert(handle);
                }
                // refresh_ready filters running ids, so a queued id is
                // never also in flight.
                Entry::Occupied(_) => unreachable!("task dispatched twice"),
            }
        }
    }

    /// Settlement path, called by every worker exactly once.
    ///
    /// Publishes the terminal task event, folds the result into graph and
    /// counters, refreshes the ready queue, dispatches further work and
    /// detects end-of-run.
    fn settle(&self, id: TaskId, epoch: u64, result: Result<TaskOutput, TaskError>) {
        let mut st = self.lock_state();

        if st.epoch != epoch {
            // The run this task belonged to was reset. Report the outcome,
            // touch nothing.
            drop(st);
            self.publish_settlement(&id, result);
            return;
        }

        st.running.remove(&id);
        match result {
            Ok(value) => {
                let mut graph = self.lock_graph();
                if let Err(err) = graph.mark_completed(&id) {
                    unreachable!("settled task missing from graph: {err}");
                }
                drop(graph);
                st.completed += 1;
                self.inner.bus.publish(
                    Event::now(EventKind::TaskCompleted)
                        .with_task(id.as_str())
                        .with_result(value),
                );
            }
            Err(err) => {
                // Not marked completed: dependents stay blocked, and the id
                // joins the terminal set so it is never dispatched again.
                st.failed += 1;
                st.failed_ids.insert(id.clone());
                self.inner.bus.publish(
                    Event::now(EventKind::TaskFailed)
                        .with_task(id.as_str())
                        .with_error(err.to_string()),
                );
            }
        }

        if !st.processing {
            // Stopped mid-run: tallied above, but no further dispatch.
            return;
        }

        {
            let graph = self.lock_graph();
            Self::refresh_ready(&mut st, &graph);
        }
        self.pump(&mut st);
        self.maybe_finish(&mut st);
    }

    /// End-of-run detection.
    ///
    /// Complete graph → `QueueCompleted`. Quiescent but incomplete (failures
    /// block the remainder) → `QueueStalled`. Both leave processing mode.
    fn maybe_finish(&self, st: &mut State) {
        if !st.processing {
            return;
        }
        let complete = self.lock_graph().is_complete();
        if complete {
            st.ended_at = Some(Instant::now());
            st.processing = false;
            let stats = st.stats();
            self.inner
                .bus
                .publish(Event::now(EventKind::QueueCompleted).with_stats(stats));
        } else if st.running.is_empty() && st.queue.is_empty() && !st.paused {
            st.ended_at = Some(Instant::now());
            st.processing = false;
            let stats = st.stats();
            self.inner
                .bus
                .publish(Event::now(EventKind::QueueStalled).with_stats(stats));
        }
    }

    /// Terminal event for a settlement that is no longer part of a run.
    fn publish_settlement(&self, id: &str, result: Result<TaskOutput, TaskError>) {
        match result {
            Ok(value) => self.inner.bus.publish(
                Event::now(EventKind::TaskCompleted)
                    .with_task(id)
                    .with_result(value),
            ),
            Err(err) => self.inner.bus.publish(
                Event::now(EventKind::TaskFailed)
                    .with_task(id)
                    .with_error(err.to_string()),
            ),
        }
    }
}
