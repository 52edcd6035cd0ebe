//! # Demo: adaptive
//!
//! A batch of independent tasks whose concurrency bound is retuned at
//! runtime by an [`AdaptiveController`] sampling host utilization.
//!
//! Demonstrates how to:
//! - Wire a controller to a scheduler with [`Scheduler::adopt`].
//! - Observe `ConcurrencyUpdated` / `MetricsSampled` events.
//!
//! ## Run
//! ```bash
//! cargo run --example adaptive
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use dagvisor::{
    AdaptiveController, ControllerConfig, EventKind, LogWriter, Scheduler, SchedulerConfig,
    TaskError, TaskFn, TaskGraph, TaskOutput,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Twenty independent sleepy tasks
    let mut graph = TaskGraph::new();
    for i in 0..20 {
        graph.add_task(TaskFn::arc(
            format!("batch-{i:02}"),
            |_ctx: CancellationToken| async {
                tokio::time::sleep(Duration::from_millis(150)).await;
                Ok::<TaskOutput, TaskError>(TaskOutput::Null)
            },
        ))?;
    }

    // 2. Scheduler starts narrow; the controller may widen it
    let scheduler = Scheduler::new(
        Arc::new(Mutex::new(graph)),
        SchedulerConfig {
            concurrency: 2,
            ..Default::default()
        },
        vec![Arc::new(LogWriter::new())],
    );

    let controller = AdaptiveController::new(ControllerConfig {
        initial: 2,
        check_interval: Duration::from_millis(500),
        ..Default::default()
    });
    scheduler.adopt(&controller);
    controller.start();

    let mut events = scheduler.subscribe();
    scheduler.start();

    loop {
        let ev = events.recv().await?;
        if ev.kind == EventKind::QueueCompleted {
            break;
        }
    }

    controller.stop();
    println!("controller metrics: {:?}", controller.metrics());
    Ok(())
}
