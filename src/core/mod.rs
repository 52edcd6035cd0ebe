//! Engine core: dispatch and lifecycle.
//!
//! This module contains the scheduler that drives a
//! [`TaskGraph`](crate::TaskGraph) to completion. The public API re-exported
//! from here is [`Scheduler`] and its [`QueueStats`] snapshot; everything
//! else is internal coordination.
//!
//! ## Files & responsibilities
//! - **scheduler.rs**: public facade; owns the Bus and the coordination
//!   mutex, seeds/refreshes the ready queue, dispatches workers, settles
//!   results, publishes every lifecycle event and exposes the control
//!   surface (pause/resume/stop/reset/set_concurrency).
//! - **state.rs**: the coordination state behind the mutex (running set,
//!   ready queue, counters, flags, run epoch) and the [`QueueStats`]
//!   snapshot.
//!
//! ## Event data-plane (who publishes & who consumes)
//!
//! Producers (publish to Bus):
//! - **Scheduler control** → `Paused` / `Resumed` / `Stopped` / `Reset` /
//!   `ConcurrencyChanged`
//! - **Dispatch** → `TaskStarted`
//! - **Settlement** → `TaskCompleted{result}` / `TaskFailed{error}`,
//!   then `QueueCompleted{stats}` or `QueueStalled{stats}` at quiescence
//! - **SubscriberSet workers** → `SubscriberOverflow`, `SubscriberPanicked`
//!
//! Consumers (subscribe to Bus):
//! - **subscriber listener** (single fan-out point to `SubscriberSet`)
//! - **controller forwarder** installed by `Scheduler::adopt` (applies
//!   `ConcurrencyUpdated` proposals)
//! - any direct receiver from `Scheduler::subscribe()`
//!
//! ## Wiring (module-level flow)
//! ```text
//! Application code
//!   └─ builds TaskGraph, shares it (Arc<Mutex>), creates Scheduler, start()
//!
//! Scheduler::start()
//!   ├─ snapshot total, seed ready queue (registration order)
//!   └─ pump():
//!        while processing ∧ ¬paused ∧ |running| < concurrency ∧ queue ≠ ∅
//!          ├─ pop id, publish TaskStarted
//!          └─ spawn worker: task.run(token) → settle(id, epoch, result)
//!
//! settle(id, epoch, result)
//!   ├─ stale epoch → report only (run was reset)
//!   ├─ Ok  → graph.mark_completed(id); completed += 1; TaskCompleted
//!   ├─ Err → failed += 1; id joins terminal set; TaskFailed  [graph untouched]
//!   ├─ refresh ready queue (skips running/queued/terminal ids), pump()
//!   └─ graph complete   → QueueCompleted{stats}
//!      quiescent + incomplete → QueueStalled{stats}
//! ```
//!
//! ## Notes
//! - Event ordering is maintained via a global monotonic sequence number.
//! - Settlement events for a task always precede the `TaskStarted` of any
//!   dependent.
//! - The coordination mutex is never held across an `.await`.

mod scheduler;
mod state;

pub use scheduler::Scheduler;
pub use state::QueueStats;
