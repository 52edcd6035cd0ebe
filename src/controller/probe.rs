//! # Host utilization probes.
//!
//! [`Probe`] is the capability the controller samples through: one
//! operation, read whole-host CPU and memory utilization. Production code
//! uses [`SystemProbe`]; tests inject scripted probes to drive the control
//! law deterministically.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SampleError;

/// One whole-host utilization sample, in percent (0–100).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Utilization {
    /// CPU busy share since the previous sample.
    pub cpu: f64,
    /// Used-memory share right now.
    pub memory: f64,
}

/// Source of host utilization samples.
///
/// Implementations must be cheap to call at the controller's check
/// interval. Failures are surfaced as `SampleFailed` events and never halt
/// the sampling loop.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Reads one utilization sample.
    async fn sample(&self) -> Result<Utilization, SampleError>;
}

/// Aggregate CPU time counters from `/proc/stat`, in clock ticks.
#[derive(Debug, Clone, Copy)]
struct CpuCounters {
    busy: u64,
    total: u64,
}

/// Probe backed by the Linux `/proc` filesystem.
///
/// CPU utilization is the busy share of the aggregate `cpu` line between
/// two consecutive samples (the first sample reports the since-boot
/// average). Memory utilization is `1 - MemAvailable/MemTotal` from
/// `/proc/meminfo`.
pub struct SystemProbe {
    prev: Mutex<Option<CpuCounters>>,
}

impl SystemProbe {
    /// Creates a probe with no sampling history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prev: Mutex::new(None),
        }
    }

    fn cpu_percent(&self, now: CpuCounters) -> f64 {
        let mut prev = self.prev.lock().unwrap_or_else(PoisonError::into_inner);
        let base = prev.replace(now).unwrap_or(CpuCounters { busy: 0, total: 0 });

        let total = now.total.saturating_sub(base.total);
        if total == 0 {
            return 0.0;
        }
        let busy = now.busy.saturating_sub(base.busy);
        busy as f64 / total as f64 * 100.0
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for SystemProbe {
    async fn sample(&self) -> Result<Utilization, SampleError> {
        let stat = tokio::fs::read_to_string("/proc/stat").await?;
        let meminfo = tokio::fs::read_to_string("/proc/meminfo").await?;

        let counters = parse_cpu_counters(&stat)?;
        let memory = parse_memory_percent(&meminfo)?;

        Ok(Utilization {
            cpu: self.cpu_percent(counters),
            memory,
        })
    }
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
fn parse_cpu_counters(stat: &str) -> Result<CpuCounters, SampleError> {
    let line = stat.lines().next().ok_or_else(|| SampleError::Parse {
        detail: "/proc/stat is empty".into(),
    })?;

    let mut fields = line.split_whitespace();
    if fields.next() != Some("cpu") {
        return Err(SampleError::Parse {
            detail: "/proc/stat does not start with an aggregate cpu line".into(),
        });
    }

    let values = fields
        .map(str::parse::<u64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SampleError::Parse {
            detail: format!("non-numeric cpu field: {e}"),
        })?;
    if values.len() < 4 {
        return Err(SampleError::Parse {
            detail: format!("expected at least 4 cpu fields, got {}", values.len()),
        });
    }

    // user nice system idle [iowait irq softirq steal ...]
    let total: u64 = values.iter().sum();
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Ok(CpuCounters {
        busy: total.saturating_sub(idle),
        total,
    })
}

/// Derives used-memory percent from `/proc/meminfo`.
fn parse_memory_percent(meminfo: &str) -> Result<f64, SampleError> {
    let mut total: Option<u64> = None;
    let mut available: Option<u64> = None;

    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total = first_number(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available = first_number(rest);
        }
        if total.is_some() && available.is_some() {
            break;
        }
    }

    match (total, available) {
        (Some(total), Some(available)) if total > 0 => {
            let used = total.saturating_sub(available);
            Ok(used as f64 / total as f64 * 100.0)
        }
        _ => Err(SampleError::Parse {
            detail: "MemTotal/MemAvailable missing from /proc/meminfo".into(),
        }),
    }
}

fn first_number(rest: &str) -> Option<u64> {
    rest.split_whitespace().next()?.parse().ok()
}
