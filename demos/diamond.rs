//! # Demo: diamond
//!
//! Minimal diamond-shaped pipeline driven to completion with two workers.
//!
//! Demonstrates how to:
//! - Register tasks with [`TaskFn`] and declare dependencies.
//! - Run the graph under a [`Scheduler`] with the built-in [`LogWriter`].
//! - Wait for the `QueueCompleted` event.
//!
//! ## Flow
//! ```text
//!            ┌─► transform-a ─┐
//! extract ───┤                ├─► load
//!            └─► transform-b ─┘
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example diamond
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use dagvisor::{
    EventKind, LogWriter, Scheduler, SchedulerConfig, TaskError, TaskFn, TaskGraph, TaskOutput,
};

fn step(id: &'static str, millis: u64) -> dagvisor::TaskRef {
    TaskFn::arc(id, move |_ctx: CancellationToken| async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok::<TaskOutput, TaskError>(serde_json::json!({ "step": id }))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Build the dependency graph
    let mut graph = TaskGraph::new();
    graph
        .add_task(step("extract", 50))?
        .add_task(step("transform-a", 80))?
        .add_task(step("transform-b", 30))?
        .add_task(step("load", 20))?;
    graph
        .add_dependency("transform-a", "extract")?
        .add_dependency("transform-b", "extract")?
        .add_dependencies("load", ["transform-a", "transform-b"])?;

    println!("plan: {:?}", graph.topological_order()?);

    // 2. Drive it with two workers and the logging subscriber
    let scheduler = Scheduler::new(
        Arc::new(Mutex::new(graph)),
        SchedulerConfig {
            concurrency: 2,
            ..Default::default()
        },
        vec![Arc::new(LogWriter::new())],
    );

    let mut events = scheduler.subscribe();
    scheduler.start();

    // 3. Wait for the run to finish
    loop {
        let ev = events.recv().await?;
        if ev.kind == EventKind::QueueCompleted {
            let stats = ev.stats.expect("completion carries stats");
            println!(
                "done: {}/{} tasks in {:?}",
                stats.completed, stats.total, stats.elapsed
            );
            break;
        }
    }
    Ok(())
}
