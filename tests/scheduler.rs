//! Scheduler behaviour: dispatch ordering, the concurrency bound, failure
//! isolation, the control surface and run determinism.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast::Receiver;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use dagvisor::{
    ControlError, Event, EventKind, Scheduler, SchedulerConfig, TaskError, TaskFn, TaskGraph,
    TaskOutput, TaskRef,
};

fn noop(id: &str) -> TaskRef {
    TaskFn::arc(id.to_string(), |_ctx: CancellationToken| async {
        Ok::<TaskOutput, TaskError>(TaskOutput::Null)
    })
}

fn failing(id: &str) -> TaskRef {
    TaskFn::arc(id.to_string(), |_ctx: CancellationToken| async {
        Err::<TaskOutput, TaskError>(TaskError::fail("boom"))
    })
}

/// Task that parks on `gate` until the test hands out a permit.
fn gated(id: &str, gate: Arc<Semaphore>) -> TaskRef {
    TaskFn::arc(id.to_string(), move |_ctx: CancellationToken| {
        let gate = Arc::clone(&gate);
        async move {
            gate.acquire().await.unwrap().forget();
            Ok::<TaskOutput, TaskError>(TaskOutput::Null)
        }
    })
}

fn scheduler_for(graph: TaskGraph, concurrency: usize) -> Scheduler {
    Scheduler::new(
        Arc::new(Mutex::new(graph)),
        SchedulerConfig {
            concurrency,
            ..Default::default()
        },
        Vec::new(),
    )
}

/// Receives events until one of `terminal` shows up (5s safety timeout).
async fn drain_until(rx: &mut Receiver<Event>, terminal: &[EventKind]) -> Vec<Event> {
    let mut out = Vec::new();
    loop {
        let ev = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for terminal event")
            .expect("event bus closed");
        let kind = ev.kind;
        out.push(ev);
        if terminal.contains(&kind) {
            return out;
        }
    }
}

/// Next task-lifecycle event, skipping control noise.
async fn next_task_event(rx: &mut Receiver<Event>) -> Event {
    loop {
        let ev = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for task event")
            .expect("event bus closed");
        if matches!(
            ev.kind,
            EventKind::TaskStarted | EventKind::TaskCompleted | EventKind::TaskFailed
        ) {
            return ev;
        }
    }
}

fn task_trace(events: &[Event]) -> Vec<(EventKind, String)> {
    events
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                EventKind::TaskStarted | EventKind::TaskCompleted | EventKind::TaskFailed
            )
        })
        .map(|e| (e.kind, e.task.clone().unwrap()))
        .collect()
}

/// Highest number of simultaneously running tasks implied by the trace.
fn peak_running(events: &[Event]) -> usize {
    let mut current = 0usize;
    let mut peak = 0usize;
    for ev in events {
        match ev.kind {
            EventKind::TaskStarted => {
                current += 1;
                peak = peak.max(current);
            }
            EventKind::TaskCompleted | EventKind::TaskFailed => current -= 1,
            _ => {}
        }
    }
    peak
}

fn chain() -> TaskGraph {
    let mut graph = TaskGraph::new();
    graph
        .add_task(noop("a"))
        .unwrap()
        .add_task(noop("b"))
        .unwrap()
        .add_task(noop("c"))
        .unwrap();
    graph
        .add_dependency("b", "a")
        .unwrap()
        .add_dependency("c", "b")
        .unwrap();
    graph
}

#[tokio::test]
async fn linear_chain_runs_sequentially() {
    let scheduler = scheduler_for(chain(), 4);
    let mut rx = scheduler.subscribe();

    scheduler.start();
    let events = drain_until(&mut rx, &[EventKind::QueueCompleted]).await;

    let expected = [
        (EventKind::TaskStarted, "a"),
        (EventKind::TaskCompleted, "a"),
        (EventKind::TaskStarted, "b"),
        (EventKind::TaskCompleted, "b"),
        (EventKind::TaskStarted, "c"),
        (EventKind::TaskCompleted, "c"),
    ];
    let trace = task_trace(&events);
    assert_eq!(
        trace,
        expected
            .iter()
            .map(|(k, id)| (*k, id.to_string()))
            .collect::<Vec<_>>()
    );

    // The bound is 4, but the chain never admits parallelism.
    assert_eq!(peak_running(&events), 1);

    let stats = events.last().unwrap().stats.clone().unwrap();
    assert_eq!(stats.completed, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.total, 3);
}

#[tokio::test]
async fn diamond_fans_out_and_joins() {
    let mut graph = TaskGraph::new();
    for id in ["a", "b", "c", "d"] {
        graph.add_task(noop(id)).unwrap();
    }
    graph
        .add_dependency("b", "a")
        .unwrap()
        .add_dependency("c", "a")
        .unwrap()
        .add_dependencies("d", ["b", "c"])
        .unwrap();

    let scheduler = scheduler_for(graph, 2);
    let mut rx = scheduler.subscribe();

    scheduler.start();
    let events = drain_until(&mut rx, &[EventKind::QueueCompleted]).await;
    let trace = task_trace(&events);

    let position = |kind: EventKind, id: &str| {
        trace
            .iter()
            .position(|(k, t)| *k == kind && t == id)
            .unwrap_or_else(|| panic!("missing {kind:?} for {id}"))
    };

    // b and c both start only after a completed, d only after both joined.
    let a_done = position(EventKind::TaskCompleted, "a");
    assert!(position(EventKind::TaskStarted, "b") > a_done);
    assert!(position(EventKind::TaskStarted, "c") > a_done);
    let d_start = position(EventKind::TaskStarted, "d");
    assert!(d_start > position(EventKind::TaskCompleted, "b"));
    assert!(d_start > position(EventKind::TaskCompleted, "c"));

    assert!(peak_running(&events) <= 2);
    let stats = events.last().unwrap().stats.clone().unwrap();
    assert_eq!(stats.completed, 4);
}

#[tokio::test]
async fn failure_blocks_dependents_but_not_independent_branches() {
    let mut graph = TaskGraph::new();
    graph
        .add_task(failing("a"))
        .unwrap()
        .add_task(noop("b"))
        .unwrap()
        .add_task(noop("c"))
        .unwrap();
    graph.add_dependency("b", "a").unwrap();

    let scheduler = scheduler_for(graph, 2);
    let mut rx = scheduler.subscribe();

    scheduler.start();
    let events = drain_until(&mut rx, &[EventKind::QueueCompleted, EventKind::QueueStalled]).await;

    // The run stalls instead of completing.
    assert_eq!(events.last().unwrap().kind, EventKind::QueueStalled);

    let trace = task_trace(&events);
    assert!(trace.contains(&(EventKind::TaskFailed, "a".to_string())));
    assert!(trace.contains(&(EventKind::TaskCompleted, "c".to_string())));
    assert!(
        !trace.iter().any(|(_, id)| id == "b"),
        "dependent of a failed task must never start: {trace:?}"
    );

    let stats = events.last().unwrap().stats.clone().unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.total, 3);

    // The graph keeps the failed task incomplete.
    let graph = scheduler.graph();
    assert!(!graph.lock().unwrap().is_complete());
}

#[tokio::test]
async fn widening_the_bound_dispatches_immediately() {
    let gate = Arc::new(Semaphore::new(0));
    let mut graph = TaskGraph::new();
    for id in ["t1", "t2", "t3", "t4"] {
        graph.add_task(gated(id, Arc::clone(&gate))).unwrap();
    }

    let scheduler = scheduler_for(graph, 1);
    let mut rx = scheduler.subscribe();

    scheduler.start();
    let first = next_task_event(&mut rx).await;
    assert_eq!(first.kind, EventKind::TaskStarted);

    // Widening with a non-empty ready queue launches more work at once,
    // not only on the next completion.
    scheduler.set_concurrency(3).unwrap();
    let second = next_task_event(&mut rx).await;
    let third = next_task_event(&mut rx).await;
    assert_eq!(second.kind, EventKind::TaskStarted);
    assert_eq!(third.kind, EventKind::TaskStarted);
    assert_eq!(scheduler.running().len(), 3);

    gate.add_permits(4);
    let events = drain_until(&mut rx, &[EventKind::QueueCompleted]).await;
    let started = task_trace(&events)
        .iter()
        .filter(|(k, _)| *k == EventKind::TaskStarted)
        .count();
    assert_eq!(started, 1, "only the fourth task was left to start");
    assert_eq!(scheduler.stats().completed, 4);
}

#[tokio::test]
async fn zero_concurrency_is_rejected() {
    let scheduler = scheduler_for(chain(), 2);
    let err = scheduler.set_concurrency(0).unwrap_err();
    assert!(matches!(err, ControlError::InvalidConcurrency { value: 0 }));
    assert_eq!(scheduler.concurrency(), 2);
}

#[tokio::test]
async fn pause_inhibits_dispatch_until_resume() {
    let gate = Arc::new(Semaphore::new(0));
    let mut graph = TaskGraph::new();
    graph
        .add_task(gated("a", Arc::clone(&gate)))
        .unwrap()
        .add_task(noop("b"))
        .unwrap();
    graph.add_dependency("b", "a").unwrap();

    let scheduler = scheduler_for(graph, 2);
    let mut rx = scheduler.subscribe();

    scheduler.start();
    let first = next_task_event(&mut rx).await;
    assert_eq!((first.kind, first.task.as_deref()), (EventKind::TaskStarted, Some("a")));

    scheduler.pause();
    gate.add_permits(1);

    // The in-flight task still settles while paused...
    let done = next_task_event(&mut rx).await;
    assert_eq!((done.kind, done.task.as_deref()), (EventKind::TaskCompleted, Some("a")));

    // ...but its unblocked dependent must not start.
    let quiet = tokio::time::timeout(Duration::from_millis(100), next_task_event(&mut rx)).await;
    assert!(quiet.is_err(), "no dispatch may happen while paused");
    assert!(scheduler.is_paused());

    scheduler.resume();
    let events = drain_until(&mut rx, &[EventKind::QueueCompleted]).await;
    let trace = task_trace(&events);
    assert_eq!(
        trace,
        vec![
            (EventKind::TaskStarted, "b".to_string()),
            (EventKind::TaskCompleted, "b".to_string()),
        ]
    );
}

#[tokio::test]
async fn stop_with_wait_drains_in_flight_work() {
    let gate = Arc::new(Semaphore::new(0));
    let mut graph = TaskGraph::new();
    for id in ["t1", "t2", "t3"] {
        graph.add_task(gated(id, Arc::clone(&gate))).unwrap();
    }

    let scheduler = scheduler_for(graph, 2);
    let mut rx = scheduler.subscribe();
    scheduler.start();

    let _ = next_task_event(&mut rx).await;
    let _ = next_task_event(&mut rx).await;

    // Enter the drain before releasing the gate, so the third task is
    // dropped from the queue rather than dispatched by a settlement.
    let stopper = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.stop(true).await }
    });
    while scheduler.is_processing() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    gate.add_permits(2);
    stopper.await.unwrap();

    let stats = scheduler.stats();
    assert!(!stats.processing);
    assert_eq!(stats.running, 0);
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.completed, 2);

    let events = drain_until(&mut rx, &[EventKind::Stopped]).await;
    let started = task_trace(&events)
        .iter()
        .filter(|(k, _)| *k == EventKind::TaskStarted)
        .count();
    assert_eq!(started, 0, "no dispatch after stop");
}

#[tokio::test]
async fn reset_produces_an_identical_rerun() {
    let scheduler = scheduler_for(chain(), 4);
    let mut rx = scheduler.subscribe();

    scheduler.start();
    let first = drain_until(&mut rx, &[EventKind::QueueCompleted]).await;

    scheduler.reset();
    let stats = scheduler.stats();
    assert_eq!((stats.completed, stats.failed, stats.total), (0, 0, 0));
    assert!(!scheduler.graph().lock().unwrap().is_complete());

    scheduler.start();
    let second = drain_until(&mut rx, &[EventKind::QueueCompleted]).await;

    assert_eq!(task_trace(&first), task_trace(&second));
}

#[tokio::test]
async fn resume_from_idle_behaves_as_start() {
    let scheduler = scheduler_for(chain(), 2);
    let mut rx = scheduler.subscribe();

    scheduler.resume();
    let events = drain_until(&mut rx, &[EventKind::QueueCompleted]).await;
    assert_eq!(events.last().unwrap().stats.clone().unwrap().completed, 3);
}

#[tokio::test]
async fn starting_twice_is_a_no_op() {
    let gate = Arc::new(Semaphore::new(0));
    let mut graph = TaskGraph::new();
    graph.add_task(gated("only", Arc::clone(&gate))).unwrap();

    let scheduler = scheduler_for(graph, 4);
    let mut rx = scheduler.subscribe();

    scheduler.start();
    scheduler.start();
    let first = next_task_event(&mut rx).await;
    assert_eq!(first.kind, EventKind::TaskStarted);

    gate.add_permits(1);
    let events = drain_until(&mut rx, &[EventKind::QueueCompleted]).await;
    let more_starts = task_trace(&events)
        .iter()
        .filter(|(k, _)| *k == EventKind::TaskStarted)
        .count();
    assert_eq!(more_starts, 0, "the single task must be dispatched exactly once");
}

#[tokio::test]
async fn autostart_runs_without_an_explicit_start() {
    let scheduler = Scheduler::new(
        Arc::new(Mutex::new(chain())),
        SchedulerConfig {
            autostart: true,
            ..Default::default()
        },
        Vec::new(),
    );

    // Events from construction are unobservable; poll the stats instead.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        let stats = scheduler.stats();
        if stats.completed == 3 && !stats.processing {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "autostart run never finished");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn empty_graph_completes_immediately() {
    let scheduler = scheduler_for(TaskGraph::new(), 1);
    let mut rx = scheduler.subscribe();

    scheduler.start();
    let events = drain_until(&mut rx, &[EventKind::QueueCompleted]).await;
    let stats = events.last().unwrap().stats.clone().unwrap();
    assert_eq!((stats.total, stats.completed), (0, 0));
}

struct Panicky;

#[async_trait::async_trait]
impl dagvisor::Subscribe for Panicky {
    async fn on_event(&self, _event: &Event) {
        panic!("subscriber bug");
    }

    fn name(&self) -> &'static str {
        "panicky"
    }
}

#[tokio::test]
async fn panicking_subscriber_does_not_disturb_the_run() {
    let scheduler = Scheduler::new(
        Arc::new(Mutex::new(chain())),
        SchedulerConfig::default(),
        vec![Arc::new(Panicky)],
    );
    let mut rx = scheduler.subscribe();

    scheduler.start();
    let events = drain_until(&mut rx, &[EventKind::QueueCompleted]).await;
    assert_eq!(events.last().unwrap().stats.clone().unwrap().completed, 3);
}
