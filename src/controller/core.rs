//! # AdaptiveController: out-of-band concurrency advisor.
//!
//! Samples host utilization on an interval and recommends a concurrency
//! bound within `[min, max]`. The controller shares no state with any
//! scheduler — it is a pure advisor publishing proposals on its own bus; a
//! scheduler adopts them via [`Scheduler::adopt`](crate::Scheduler::adopt).
//!
//! ## Control law (per sample)
//! ```text
//! push cpu/mem into rolling windows (length = history), average
//!   avg_cpu > target_cpu + 10                       → current − step
//!   avg_cpu < target_cpu − 10 ∧ avg_mem < target_mem → current + step
//!   otherwise                                        → hold
//!   avg_mem > target_mem + 10                        → current − step (overrides)
//! clamp to [min, max]
//! changed? → publish ConcurrencyUpdated(new) + MetricsSampled{...}
//! ```
//!
//! ## Rules
//! - `start()`/`stop()` are idempotent
//! - Sampling failures publish `SampleFailed` and the loop continues
//! - `MetricsSampled` fires only when the recommendation changes

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};

use super::config::ControllerConfig;
use super::probe::{Probe, SystemProbe, Utilization};

/// Dead band around the utilization targets, in percentage points.
const BAND: f64 = 10.0;

/// Rolling sampler state. Guarded by `CtrlInner::state`.
struct CtrlState {
    current: usize,
    cpu_window: VecDeque<f64>,
    mem_window: VecDeque<f64>,
    samples: u64,
}

/// Snapshot of the controller's rolling state.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerMetrics {
    /// Currently recommended concurrency bound.
    pub concurrency: usize,
    /// Rolling-window CPU average, percent. `None` before the first sample.
    pub avg_cpu: Option<f64>,
    /// Rolling-window memory average, percent. `None` before the first sample.
    pub avg_memory: Option<f64>,
    /// Samples ingested since construction.
    pub samples: u64,
}

struct CtrlInner {
    cfg: ControllerConfig,
    probe: Arc<dyn Probe>,
    bus: Bus,
    state: Mutex<CtrlState>,
    sampler: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

/// Utilization-driven concurrency advisor.
///
/// Cheap to clone; clones share the same sampler.
#[derive(Clone)]
pub struct AdaptiveController {
    inner: Arc<CtrlInner>,
}

impl AdaptiveController {
    /// Creates a controller backed by the host [`SystemProbe`].
    #[must_use]
    pub fn new(cfg: ControllerConfig) -> Self {
        Self::with_probe(cfg, Arc::new(SystemProbe::new()))
    }

    /// Creates a controller with a custom utilization source.
    #[must_use]
    pub fn with_probe(cfg: ControllerConfig, probe: Arc<dyn Probe>) -> Self {
        let current = cfg.initial_clamped();
        let bus = Bus::new(cfg.bus_capacity);
        Self {
            inner: Arc::new(CtrlInner {
                cfg,
                probe,
                bus,
                state: Mutex::new(CtrlState {
                    current,
                    cpu_window: VecDeque::new(),
                    mem_window: VecDeque::new(),
                    samples: 0,
                }),
                sampler: Mutex::new(None),
            }),
        }
    }

    /// Begins sampling at the configured interval. Idempotent.
    pub fn start(&self) -> &Self {
        let mut guard = self.inner.lock_sampler();
        if guard.is_some() {
            return self;
        }

        let inner = Arc::clone(&self.inner);
        let token = CancellationToken::new();
        let loop_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.cfg.check_interval_clamped());
            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => inner.tick().await,
                }
            }
        });

        *guard = Some((token, handle));
        self
    }

    /// Halts sampling. Idempotent.
    ///
    /// Cancellation is cooperative: an in-progress sample finishes first.
    pub fn stop(&self) -> &Self {
        if let Some((token, _handle)) = self.inner.lock_sampler().take() {
            token.cancel();
        }
        self
    }

    /// Manual override, clamped into `[min, max]`.
    ///
    /// Publishes `ConcurrencyUpdated` when the recommendation changes.
    pub fn set_concurrency(&self, n: usize) -> &Self {
        let clamped = n.clamp(self.inner.cfg.min_clamped(), self.inner.cfg.max_clamped());
        let mut st = self.inner.lock_state();
        if st.current != clamped {
            st.current = clamped;
            self.inner
                .bus
                .publish(Event::now(EventKind::ConcurrencyUpdated).with_concurrency(clamped));
        }
        self
    }

    /// Feeds one utilization sample through the control law.
    ///
    /// This is the same path the sampling loop takes; exposing it lets
    /// callers drive the controller from their own metric source.
    pub fn ingest(&self, sample: Utilization) {
        self.inner.ingest(sample);
    }

    /// Currently recommended concurrency bound.
    #[must_use]
    pub fn current(&self) -> usize {
        self.inner.lock_state().current
    }

    /// Snapshot of the rolling windows and recommendation.
    #[must_use]
    pub fn metrics(&self) -> ControllerMetrics {
        let st = self.inner.lock_state();
        ControllerMetrics {
            concurrency: st.current,
            avg_cpu: average(&st.cpu_window),
            avg_memory: average(&st.mem_window),
            samples: st.samples,
        }
    }

    /// Creates a receiver for every future controller event.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }
}

impl CtrlInner {
    fn lock_state(&self) -> MutexGuard<'_, CtrlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_sampler(&self) -> MutexGuard<'_, Option<(CancellationToken, JoinHandle<()>)>> {
        self.sampler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One loop iteration: sample, then ingest or report the failure.
    async fn tick(&self) {
        match self.probe.sample().await {
            Ok(sample) => self.ingest(sample),
            Err(err) => {
                self.bus
                    .publish(Event::now(EventKind::SampleFailed).with_error(err.to_string()));
            }
        }
    }

    /// Applies the control law to one sample.
    fn ingest(&self, sample: Utilization) {
        let history = self.cfg.history_clamped();
        let mut st = self.lock_state();

        push_window(&mut st.cpu_window, sample.cpu, history);
        push_window(&mut st.mem_window, sample.memory, history);
        st.samples += 1;

        // Windows are non-empty after the push.
        let avg_cpu = average(&st.cpu_window).unwrap_or(sample.cpu);
        let avg_mem = average(&st.mem_window).unwrap_or(sample.memory);

        let next = self.propose(avg_cpu, avg_mem, st.current);
        if next == st.current {
            return;
        }

        let previous = st.current;
        st.current = next;
        drop(st);

        self.bus
            .publish(Event::now(EventKind::ConcurrencyUpdated).with_concurrency(next));
        self.bus.publish(
            Event::now(EventKind::MetricsSampled)
                .with_utilization(avg_cpu, avg_mem)
                .with_concurrency(next)
                .with_previous(previous),
        );
    }

    /// The control law proper: propose a bound from window averages.
    fn propose(&self, avg_cpu: f64, avg_mem: f64, current: usize) -> usize {
        let step = self.cfg.step_clamped();
        let mut next = current;

        if avg_cpu > self.cfg.target_cpu + BAND {
            next = current.saturating_sub(step);
        } else if avg_cpu < self.cfg.target_cpu - BAND && avg_mem < self.cfg.target_memory {
            next = current.saturating_add(step);
        }

        // Memory pressure dominates whatever CPU suggested.
        if avg_mem > self.cfg.target_memory + BAND {
            next = current.saturating_sub(step);
        }

        next.clamp(self.cfg.min_clamped(), self.cfg.max_clamped())
    }
}

fn push_window(window: &mut VecDeque<f64>, value: f64, capacity: usize) {
    while window.len() >= capacity {
        window.pop_front();
    }
    window.push_back(value);
}

fn average(window: &VecDeque<f64>) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    Some(window.iter().sum::<f64>() / window.len() as f64)
}
