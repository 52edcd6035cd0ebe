//! # dagvisor
//!
//! **Dagvisor** is a dependency-graph task engine.
//!
//! It executes a user-supplied set of async tasks whose ordering is
//! constrained by a DAG of dependencies, under a bounded, dynamically
//! adjustable degree of concurrency. The crate is designed as a building
//! block for pipelines, build-style runners and higher-level orchestrators.
//!
//! ## Features
//!
//! | Area               | Description                                                            | Key types / traits                          |
//! |--------------------|------------------------------------------------------------------------|---------------------------------------------|
//! | **Task graph**     | Dependency model with incremental cycle rejection and ready queries.   | [`TaskGraph`]                               |
//! | **Scheduling**     | Bounded worker pool driving the graph; pause/resume/stop/reset.        | [`Scheduler`], [`SchedulerConfig`], [`QueueStats`] |
//! | **Adaptive bound** | Host-utilization sampler proposing concurrency retunes.                | [`AdaptiveController`], [`Probe`]           |
//! | **Events**         | Broadcast bus plus isolated per-subscriber delivery.                   | [`Event`], [`EventKind`], [`Subscribe`]     |
//! | **Errors**         | Typed errors per failure domain.                                       | [`GraphError`], [`TaskError`]               |
//! | **Tasks**          | Define tasks as closures or trait impls, composable and shareable.     | [`TaskRef`], [`TaskFn`]                     |
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//! use tokio_util::sync::CancellationToken;
//! use dagvisor::{
//!     LogWriter, Scheduler, SchedulerConfig, TaskError, TaskFn, TaskGraph, TaskOutput,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build the dependency graph: extract ──► transform ──► load
//!     let mut graph = TaskGraph::new();
//!     graph
//!         .add_task(TaskFn::arc("extract", |_ctx: CancellationToken| async {
//!             Ok::<TaskOutput, TaskError>(serde_json::json!({"rows": 128}))
//!         }))?
//!         .add_task(TaskFn::arc("transform", |_ctx: CancellationToken| async {
//!             Ok::<TaskOutput, TaskError>(TaskOutput::Null)
//!         }))?
//!         .add_task(TaskFn::arc("load", |_ctx: CancellationToken| async {
//!             Ok::<TaskOutput, TaskError>(TaskOutput::Null)
//!         }))?;
//!     graph
//!         .add_dependency("transform", "extract")?
//!         .add_dependency("load", "transform")?;
//!
//!     // Drive it with two workers and a logging subscriber.
//!     let scheduler = Scheduler::new(
//!         Arc::new(Mutex::new(graph)),
//!         SchedulerConfig { concurrency: 2, ..Default::default() },
//!         vec![Arc::new(LogWriter::new())],
//!     );
//!
//!     let mut events = scheduler.subscribe();
//!     scheduler.start();
//!     loop {
//!         let ev = events.recv().await?;
//!         if ev.kind == dagvisor::EventKind::QueueCompleted {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ---

mod config;
mod controller;
mod core;
mod error;
mod events;
mod graph;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::SchedulerConfig;
pub use controller::{
    AdaptiveController, ControllerConfig, ControllerMetrics, Probe, SystemProbe, Utilization,
};
pub use crate::core::{QueueStats, Scheduler};
pub use error::{ControlError, GraphError, SampleError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use graph::TaskGraph;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, Task, TaskFn, TaskId, TaskOutput, TaskRef};
