//! # Adaptive concurrency controller.
//!
//! An out-of-band sampler that periodically reads host CPU and memory
//! utilization and proposes a concurrency bound for a scheduler to adopt.
//!
//! ## Wiring
//! ```text
//! SystemProbe ──► AdaptiveController (sampling loop)
//!                       │ ConcurrencyUpdated / MetricsSampled / SampleFailed
//!                       ▼
//!                  controller Bus ──► Scheduler::adopt forwarder
//!                                          └──► scheduler.set_concurrency(n)
//! ```
//!
//! The coupling is strictly one-way: the controller publishes proposals and
//! holds no reference to any scheduler.

mod config;
mod core;
mod probe;

pub use config::ControllerConfig;
pub use probe::{Probe, SystemProbe, Utilization};
pub use self::core::{AdaptiveController, ControllerMetrics};
