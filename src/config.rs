//! # Scheduler configuration.
//!
//! Provides [`SchedulerConfig`] centralized settings for the queue engine.
//!
//! ## Field semantics
//! - `concurrency`: initial worker-pool bound (must be positive; retunable at
//!   runtime via `Scheduler::set_concurrency`)
//! - `autostart`: begin processing as soon as the scheduler is constructed
//! - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)

/// Configuration for a [`Scheduler`](crate::Scheduler).
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Initial concurrency bound: the maximum number of tasks simultaneously
    /// in the running set.
    ///
    /// Can be retuned at runtime via `set_concurrency`, either manually or by
    /// an attached [`AdaptiveController`](crate::AdaptiveController).
    /// Narrowing never preempts running tasks; the excess is burned off as
    /// tasks finish.
    pub concurrency: usize,

    /// Start processing immediately on construction.
    ///
    /// When `false` (default), the caller starts the engine explicitly with
    /// `Scheduler::start()`.
    pub autostart: bool,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow direct subscribers that lag behind more than `bus_capacity`
    /// events will receive `Lagged` and skip older items. Minimum value is 1
    /// (enforced by Bus).
    pub bus_capacity: usize,
}

impl SchedulerConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the initial concurrency clamped to a minimum of 1.
    ///
    /// A zero in the config would otherwise deadlock dispatch before the
    /// control surface ever gets a chance to validate it.
    #[inline]
    pub fn concurrency_clamped(&self) -> usize {
        self.concurrency.max(1)
    }
}

impl Default for SchedulerConfig {
    /// Default configuration:
    ///
    /// - `concurrency = 4`
    /// - `autostart = false`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            concurrency: 4,
            autostart: false,
            bus_capacity: 1024,
        }
    }
}
