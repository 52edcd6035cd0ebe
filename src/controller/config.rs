//! # Adaptive controller configuration.
//!
//! Provides [`ControllerConfig`] settings for the utilization sampler and
//! its control law.
//!
//! ## Sentinel handling
//! - `min` and `step` are clamped to a minimum of 1 by the accessors
//! - `max` is clamped to at least `min`
//! - `history` is clamped to a minimum of 1 (a window of 0 samples cannot
//!   produce an average)

use std::time::Duration;

/// Configuration for an [`AdaptiveController`](crate::AdaptiveController).
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Lower bound for recommended concurrency.
    pub min: usize,

    /// Upper bound for recommended concurrency.
    ///
    /// Defaults to the host CPU count.
    pub max: usize,

    /// Recommendation the controller starts from, clamped into
    /// `[min, max]`.
    pub initial: usize,

    /// Target whole-host CPU utilization, percent.
    ///
    /// The control law holds inside a ±10-point band around this target.
    pub target_cpu: f64,

    /// Target whole-host memory utilization, percent.
    ///
    /// Upshifts require headroom below this value; more than 10 points
    /// above it forces a downshift regardless of CPU.
    pub target_memory: f64,

    /// Interval between utilization samples.
    pub check_interval: Duration,

    /// How far one adjustment moves the recommendation.
    pub step: usize,

    /// Rolling-window length for averaging samples.
    pub history: usize,

    /// Capacity of the controller's event bus ring buffer.
    pub bus_capacity: usize,
}

impl ControllerConfig {
    /// Lower bound clamped to a minimum of 1.
    #[inline]
    pub fn min_clamped(&self) -> usize {
        self.min.max(1)
    }

    /// Upper bound clamped to at least the lower bound.
    #[inline]
    pub fn max_clamped(&self) -> usize {
        self.max.max(self.min_clamped())
    }

    /// Adjustment step clamped to a minimum of 1.
    #[inline]
    pub fn step_clamped(&self) -> usize {
        self.step.max(1)
    }

    /// Window length clamped to a minimum of 1.
    #[inline]
    pub fn history_clamped(&self) -> usize {
        self.history.max(1)
    }

    /// Sampling interval clamped to a non-zero duration.
    #[inline]
    pub fn check_interval_clamped(&self) -> Duration {
        self.check_interval.max(Duration::from_millis(1))
    }

    /// Starting recommendation clamped into `[min, max]`.
    #[inline]
    pub fn initial_clamped(&self) -> usize {
        self.initial.clamp(self.min_clamped(), self.max_clamped())
    }
}

impl Default for ControllerConfig {
    /// Default configuration:
    ///
    /// - `min = 1`, `max = host CPU count`, `initial = 4`
    /// - `target_cpu = 70.0`, `target_memory = 80.0`
    /// - `check_interval = 5s`, `step = 1`, `history = 3`
    /// - `bus_capacity = 256`
    fn default() -> Self {
        Self {
            min: 1,
            max: num_cpus::get(),
            initial: 4,
            target_cpu: 70.0,
            target_memory: 80.0,
            check_interval: Duration::from_secs(5),
            step: 1,
            history: 3,
            bus_capacity: 256,
        }
    }
}
