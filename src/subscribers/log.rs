//! # LogWriter — simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [started] task="extract"
//! [completed] task="extract" result=Some(Null)
//! [failed] task="transform" err="execution failed: upstream 500"
//! [concurrency-changed] n=5
//! [queue-completed] completed=4 failed=0
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::TaskStarted => {
                println!("[started] task={:?}", e.task);
            }
            EventKind::TaskCompleted => {
                println!("[completed] task={:?} result={:?}", e.task, e.result);
            }
            EventKind::TaskFailed => {
                println!("[failed] task={:?} err={:?}", e.task, e.error);
            }
            EventKind::QueueCompleted => {
                let (done, failed) = e
                    .stats
                    .as_ref()
                    .map(|s| (s.completed, s.failed))
                    .unwrap_or((0, 0));
                println!("[queue-completed] completed={done} failed={failed}");
            }
            EventKind::QueueStalled => {
                let (done, failed) = e
                    .stats
                    .as_ref()
                    .map(|s| (s.completed, s.failed))
                    .unwrap_or((0, 0));
                println!("[queue-stalled] completed={done} failed={failed}");
            }
            EventKind::Paused => println!("[paused]"),
            EventKind::Resumed => println!("[resumed]"),
            EventKind::Stopped => println!("[stopped]"),
            EventKind::Reset => println!("[reset]"),
            EventKind::ConcurrencyChanged => {
                println!("[concurrency-changed] n={:?}", e.concurrency);
            }
            EventKind::ConcurrencyUpdated => {
                println!("[concurrency-updated] n={:?}", e.concurrency);
            }
            EventKind::MetricsSampled => {
                println!(
                    "[metrics] cpu={:?} mem={:?} n={:?} prev={:?}",
                    e.cpu, e.memory, e.concurrency, e.previous
                );
            }
            EventKind::SampleFailed => {
                println!("[sample-failed] err={:?}", e.error);
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                println!("[subscriber-incident] err={:?}", e.error);
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
