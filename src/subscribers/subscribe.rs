//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] — the extension point for plugging custom event
//! handlers into the engine (monitors, metric exporters, distribution
//! adapters).
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Bounded queue** (configurable capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics caught, reported as `SubscriberPanicked` event)
//!
//! ## Architecture
//! ```text
//! SubscriberSet ──► [queue] ──► worker task ──► subscriber.on_event()
//!                  (bounded)             └────► panic caught & isolated
//! ```
//!
//! ## Rules
//! - Slow subscribers only affect themselves (queue overflow → event drop)
//! - Panics are **isolated** (do not crash the engine or other subscribers)
//! - Subscribers **do not block** publishers or other subscribers
//! - Queue capacity is **per-subscriber** (not global)
//!
//! ## Overflow behavior
//! When a subscriber's queue is full:
//! 1. Event is **dropped** for this subscriber only
//! 2. `SubscriberOverflow` event is published (for observability)
//! 3. Other subscribers are **unaffected**

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for engine observability.
///
/// Receives events from the engine via a dedicated worker task with a
/// bounded queue.
///
/// Each subscriber runs in isolation:
/// - **Bounded queue** buffers events (capacity via [`queue_capacity`](Self::queue_capacity))
/// - **Panic handling** isolates failures (reported as `SubscriberPanicked`)
/// - **Dedicated worker task** processes events sequentially
///
/// ### Implementation requirements
/// - **Performance**: Slow processing only affects this subscriber's queue
/// - **Async-friendly**: Avoid blocking operations, use async I/O
/// - **Error handling**: Handle errors internally, do not panic
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// ### Context
    /// - Called from dedicated worker task (not publisher)
    /// - Events processed sequentially (FIFO order)
    /// - Panics are caught and reported as `SubscriberPanicked`
    async fn on_event(&self, event: &Event);

    /// Returns subscriber name for logging and metrics.
    ///
    /// Used in `SubscriberOverflow` and `SubscriberPanicked` events. Keep
    /// short and descriptive (e.g., "metrics", "monitor", "audit").
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns preferred queue capacity for this subscriber.
    ///
    /// ### Overflow behavior
    /// 1. New event is **dropped** (not queued)
    /// 2. `SubscriberOverflow` event published
    /// 3. Other subscribers unaffected
    ///
    /// ### Default
    /// Returns 1024 (reasonable for most use cases).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
