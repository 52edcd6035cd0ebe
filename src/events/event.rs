//! # Runtime events emitted by the scheduler and the adaptive controller.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Task lifecycle**: dispatch flow (started, completed, failed)
//! - **Queue lifecycle**: run control (paused, resumed, stopped, reset,
//!   completed, stalled, concurrency changes)
//! - **Controller events**: concurrency proposals, metric samples, sampling
//!   failures
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task
//! id, error messages, task results and utilization percentages.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. This guarantees that events can be ordered correctly even
//! when delivered out-of-order through independent subscriber queues. In
//! particular, the `TaskCompleted` event for a task always carries a lower
//! `seq` than the `TaskStarted` event of any of its dependents.
//!
//! ## Event flow examples
//!
//! ### Diamond run (a → {b, c} → d)
//! ```text
//! Scheduler::start()
//!   → TaskStarted(a)
//!   → TaskCompleted(a)
//!   → TaskStarted(b) / TaskStarted(c)
//!   → TaskCompleted(b) / TaskCompleted(c)
//!   → TaskStarted(d)
//!   → TaskCompleted(d)
//!   → QueueCompleted{stats}
//! ```
//!
//! ### Failure isolation
//! ```text
//! TaskStarted(a)
//!   → TaskFailed(a)          [dependents of a stay blocked]
//!   → ... independent branches drain ...
//!   → QueueStalled{stats}    [no QueueCompleted for this run]
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::QueueStats;
use crate::tasks::{TaskId, TaskOutput};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    SubscriberPanicked,
    /// Subscriber dropped an event (queue full or worker closed).
    SubscriberOverflow,

    // === Task lifecycle events ===
    /// Task was dispatched to the worker pool.
    TaskStarted,
    /// Task finished successfully; its result is attached.
    TaskCompleted,
    /// Task failed; it is not marked completed and its dependents stay
    /// blocked.
    TaskFailed,

    // === Queue lifecycle events ===
    /// Every registered task completed; stats snapshot attached.
    ///
    /// Emitted at most once per run, strictly after all `TaskCompleted` /
    /// `TaskFailed` events of that run.
    QueueCompleted,
    /// The run went quiescent with unfinished tasks blocked by failures.
    ///
    /// `QueueCompleted` is never emitted for such a run.
    QueueStalled,
    /// New dispatches are inhibited; in-flight tasks continue.
    Paused,
    /// Dispatch resumed after a pause.
    Resumed,
    /// Processing stopped; the pending ready queue was dropped.
    Stopped,
    /// Scheduler and graph completion state were reset.
    Reset,
    /// The scheduler adopted a new concurrency bound.
    ConcurrencyChanged,

    // === Controller events ===
    /// The adaptive controller recommends a new concurrency bound.
    ConcurrencyUpdated,
    /// Utilization sample that changed the recommendation; attached metadata
    /// holds cpu/memory percentages and old/new bounds.
    MetricsSampled,
    /// A host-metric read failed; the sampling loop continues.
    SampleFailed,
}

/// Runtime event with optional metadata.
///
/// Carries information about task lifecycle, results, errors, concurrency
/// retunes and utilization samples.
///
/// ## Fields
///
/// - `seq`: Unique sequence number for ordering (monotonically increasing)
/// - `at`: Wall-clock timestamp (may go backwards due to NTP, use for logging only)
/// - `kind`: Event classification
/// - `task`, `error`, `result`, `concurrency`, `previous`, `cpu`, `memory`,
///   `stats`: Optional metadata, populated per kind
#[derive(Debug, Clone)]
pub struct Event {
    /// Unique sequence number for ordering.
    pub seq: u64,
    /// Wall-clock timestamp of emission.
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// Id of the task, if applicable.
    pub task: Option<TaskId>,
    /// Error message, if applicable.
    pub error: Option<String>,
    /// Task result value (`TaskCompleted` only).
    pub result: Option<TaskOutput>,
    /// New concurrency bound (`ConcurrencyChanged` / `ConcurrencyUpdated` /
    /// `MetricsSampled`).
    pub concurrency: Option<usize>,
    /// Previous concurrency bound (`MetricsSampled` only).
    pub previous: Option<usize>,
    /// Averaged CPU utilization percentage (`MetricsSampled` only).
    pub cpu: Option<f64>,
    /// Averaged memory utilization percentage (`MetricsSampled` only).
    pub memory: Option<f64>,
    /// Queue stats snapshot (`QueueCompleted` / `QueueStalled`).
    pub stats: Option<QueueStats>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            task: None,
            error: None,
            result: None,
            concurrency: None,
            previous: None,
            cpu: None,
            memory: None,
            stats: None,
        }
    }

    /// Attaches a task id.
    pub fn with_task(mut self, id: impl Into<TaskId>) -> Self {
        self.task = Some(id.into());
        self
    }

    /// Attaches an error message.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }

    /// Attaches a task result value.
    pub fn with_result(mut self, value: TaskOutput) -> Self {
        self.result = Some(value);
        self
    }

    /// Attaches a concurrency bound.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = Some(n);
        self
    }

    /// Attaches the previous concurrency bound.
    pub fn with_previous(mut self, n: usize) -> Self {
        self.previous = Some(n);
        self
    }

    /// Attaches averaged utilization percentages.
    pub fn with_utilization(mut self, cpu: f64, memory: f64) -> Self {
        self.cpu = Some(cpu);
        self.memory = Some(memory);
        self
    }

    /// Attaches a queue stats snapshot.
    pub fn with_stats(mut self, stats: QueueStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Creates a subscriber overflow event.
    ///
    /// Emitted when a subscriber's queue is full and an event is dropped.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_error(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    ///
    /// Emitted when a subscriber panics during event processing.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_error(info)
    }
}
