//! Dependency-graph invariants: cycle rejection, adjacency symmetry,
//! ready-set maintenance and ordering determinism.

use dagvisor::{GraphError, TaskError, TaskFn, TaskGraph, TaskOutput, TaskRef};
use tokio_util::sync::CancellationToken;

fn noop(id: &str) -> TaskRef {
    TaskFn::arc(id.to_string(), |_ctx: CancellationToken| async {
        Ok::<TaskOutput, TaskError>(TaskOutput::Null)
    })
}

/// Registers `a, b, c` with `b` after `a` and `c` after `b`.
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

/// Registers `a, b, c, d` as a diamond: b/c after a, d after both.
fn diamond() -> TaskGraph {
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
    graph
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut graph = TaskGraph::new();
    graph.add_task(noop("a")).unwrap();

    let err = graph.add_task(noop("a")).unwrap_err();
    assert!(matches!(err, GraphError::DuplicateTask { id } if id == "a"));
    assert_eq!(graph.len(), 1);
}

#[test]
fn dependency_on_unknown_id_is_rejected_without_mutation() {
    let mut graph = TaskGraph::new();
    graph.add_task(noop("a")).unwrap();

    let err = graph.add_dependency("a", "ghost").unwrap_err();
    assert!(matches!(err, GraphError::UnknownTask { id } if id == "ghost"));
    assert!(graph.deps("a").unwrap().is_empty());

    let err = graph.add_dependency("ghost", "a").unwrap_err();
    assert!(matches!(err, GraphError::UnknownTask { id } if id == "ghost"));
    assert!(graph.rdeps("a").unwrap().is_empty());
}

#[test]
fn batch_dependency_declaration_is_atomic() {
    let mut graph = TaskGraph::new();
    graph.add_task(noop("a")).unwrap().add_task(noop("b")).unwrap();

    let err = graph.add_dependencies("b", ["a", "ghost"]).unwrap_err();
    assert!(matches!(err, GraphError::UnknownTask { .. }));
    // Nothing from the failed batch was committed.
    assert!(graph.deps("b").unwrap().is_empty());
    assert!(graph.rdeps("a").unwrap().is_empty());
}

#[test]
fn self_dependency_raises_cycle() {
    let mut graph = TaskGraph::new();
    graph.add_task(noop("a")).unwrap();

    let err = graph.add_dependency("a", "a").unwrap_err();
    assert!(matches!(err, GraphError::Cycle { .. }));
    assert!(graph.deps("a").unwrap().is_empty());
}

#[test]
fn closing_edge_raises_cycle_and_leaves_graph_unchanged() {
    let mut graph = chain();

    let err = graph.add_dependency("a", "c").unwrap_err();
    assert!(matches!(err, GraphError::Cycle { .. }));

    assert!(graph.deps("a").unwrap().is_empty());
    let order = graph.topological_order().unwrap();
    assert_eq!(order, vec!["a", "b", "c"]);
}

#[test]
fn duplicate_edge_is_idempotent() {
    let mut graph = TaskGraph::new();
    graph.add_task(noop("a")).unwrap().add_task(noop("b")).unwrap();

    graph.add_dependency("b", "a").unwrap();
    graph.add_dependency("b", "a").unwrap();
    graph.add_dependencies("b", ["a", "a"]).unwrap();

    assert_eq!(graph.deps("b").unwrap(), ["a"]);
    assert_eq!(graph.rdeps("a").unwrap(), ["b"]);
}

#[test]
fn deps_and_rdeps_are_mutual_inverses() {
    let graph = diamond();

    for x in ["a", "b", "c", "d"] {
        for y in graph.deps(x).unwrap() {
            assert!(
                graph.rdeps(y).unwrap().contains(&x.to_string()),
                "{x} depends on {y} but {y} does not list {x} as dependent"
            );
        }
        for y in graph.rdeps(x).unwrap() {
            assert!(
                graph.deps(y).unwrap().contains(&x.to_string()),
                "{y} is dependent of {x} but does not list {x} as prerequisite"
            );
        }
    }
}

#[test]
fn ready_set_follows_completion() {
    let mut graph = diamond();

    assert_eq!(graph.ready_tasks(), vec!["a"]);

    graph.mark_completed("a").unwrap();
    assert_eq!(graph.ready_tasks(), vec!["b", "c"]);

    graph.mark_completed("b").unwrap();
    assert_eq!(graph.ready_tasks(), vec!["c"]);

    graph.mark_completed("c").unwrap();
    assert_eq!(graph.ready_tasks(), vec!["d"]);

    graph.mark_completed("d").unwrap();
    assert!(graph.ready_tasks().is_empty());
    assert!(graph.is_complete());
}

#[test]
fn mark_completed_is_idempotent_and_checks_registration() {
    let mut graph = chain();

    graph.mark_completed("a").unwrap();
    graph.mark_completed("a").unwrap();
    assert_eq!(graph.completed_count(), 1);

    let err = graph.mark_completed("ghost").unwrap_err();
    assert!(matches!(err, GraphError::UnknownTask { .. }));
}

#[test]
fn reset_clears_completion_but_keeps_structure() {
    let mut graph = chain();
    graph.mark_completed("a").unwrap();
    graph.mark_completed("b").unwrap();

    graph.reset();

    assert_eq!(graph.completed_count(), 0);
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.deps("b").unwrap(), ["a"]);
    assert_eq!(graph.ready_tasks(), vec!["a"]);
}

#[test]
fn topological_order_is_a_stable_permutation_respecting_deps() {
    let graph = diamond();

    let order = graph.topological_order().unwrap();
    assert_eq!(order.len(), graph.len());

    let position = |id: &str| order.iter().position(|x| x == id).unwrap();
    for x in ["a", "b", "c", "d"] {
        for y in graph.deps(x).unwrap() {
            assert!(
                position(y) < position(x),
                "prerequisite {y} must precede {x} in {order:?}"
            );
        }
    }

    // Identical graph state, identical order.
    assert_eq!(order, graph.topological_order().unwrap());
}

#[test]
fn accessors_fail_on_unknown_ids() {
    let graph = chain();

    assert!(matches!(graph.task("ghost"), Err(GraphError::UnknownTask { .. })));
    assert!(matches!(graph.deps("ghost"), Err(GraphError::UnknownTask { .. })));
    assert!(matches!(graph.rdeps("ghost"), Err(GraphError::UnknownTask { .. })));
    assert_eq!(graph.task("a").unwrap().id(), "a");
}

#[test]
fn registration_order_drives_iteration() {
    let mut graph = TaskGraph::new();
    for id in ["z", "m", "a"] {
        graph.add_task(noop(id)).unwrap();
    }

    let ids: Vec<&str> = graph.ids().collect();
    assert_eq!(ids, vec!["z", "m", "a"]);
    assert_eq!(graph.ready_tasks(), vec!["z", "m", "a"]);
    assert_eq!(graph.topological_order().unwrap(), vec!["z", "m", "a"]);
}
