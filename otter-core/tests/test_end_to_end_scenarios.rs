//! Drives the callback dispatcher through synthetic sequences matching the
//! six literal end-to-end scenarios, with a real `TraceSink` writing into a
//! throwaway archive directory.

use std::sync::Arc;

use otter_core::dispatcher::Dispatcher;
use otter_core::domain::types::{SyncKind, ThreadKind, WorkKind};
use otter_core::ids::IdSource;
use otter_core::taskgraph::TaskGraph;
use otter_core::trace::TraceSink;
use otter_sys::ompt::{OMPT_TASK_IMPLICIT, OMPT_TASK_INITIAL};

fn new_dispatcher() -> (Dispatcher, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(TraceSink::open(dir.path().to_str().unwrap(), "test").unwrap());
    let ids = Arc::new(IdSource::new());
    let graph = Arc::new(TaskGraph::new());
    (Dispatcher::new(ids, sink, graph), dir)
}

#[test]
fn scenario_1_single_thread_no_parallel() {
    let (d, _dir) = new_dispatcher();

    let mut ctx = d.on_thread_begin(ThreadKind::Initial);
    let initial = d.on_implicit_task_begin(&mut ctx, None, None, OMPT_TASK_INITIAL, true);
    d.on_implicit_task_end(&mut ctx, None, &initial);
    d.on_thread_end(ctx);

    assert_eq!(d.graph().node_count(), 1);
    assert_eq!(d.graph().edge_count(), 0);
}

#[test]
fn scenario_2_one_parallel_region_two_workers() {
    let (d, _dir) = new_dispatcher();

    let mut master = d.on_thread_begin(ThreadKind::Initial);
    d.on_implicit_task_begin(&mut master, None, None, OMPT_TASK_INITIAL, true);

    let parallel = d.on_parallel_begin(&mut master, 2, false);
    let master_task =
        d.on_implicit_task_begin(&mut master, Some(&parallel), None, OMPT_TASK_IMPLICIT, false);

    let mut worker = d.on_thread_begin(ThreadKind::Worker);
    let worker_task =
        d.on_implicit_task_begin(&mut worker, Some(&parallel), None, OMPT_TASK_IMPLICIT, false);

    assert_eq!(parallel.region.enter_count(), 2);
    assert_eq!(parallel.region.ref_count(), 2);

    d.on_implicit_task_end(&mut worker, Some(&parallel), &worker_task);
    d.on_thread_end(worker);
    d.on_implicit_task_end(&mut master, Some(&parallel), &master_task);
    d.on_parallel_end(&mut master, &parallel);
    d.on_thread_end(master);

    assert_eq!(parallel.region.enter_count(), 2);
    assert_eq!(parallel.region.ref_count(), 0);
}

#[test]
fn scenario_3_nested_parallel_destroys_inner_before_outer() {
    let (d, _dir) = new_dispatcher();

    let mut ctx = d.on_thread_begin(ThreadKind::Initial);
    d.on_implicit_task_begin(&mut ctx, None, None, OMPT_TASK_INITIAL, true);

    let outer = d.on_parallel_begin(&mut ctx, 1, false);
    let outer_task = d.on_implicit_task_begin(&mut ctx, Some(&outer), None, OMPT_TASK_IMPLICIT, false);

    let inner = d.on_parallel_begin(&mut ctx, 1, false);
    let inner_task = d.on_implicit_task_begin(&mut ctx, Some(&inner), None, OMPT_TASK_IMPLICIT, false);

    assert_eq!(inner.region.ref_count(), 1);
    assert_eq!(outer.region.ref_count(), 1);

    d.on_implicit_task_end(&mut ctx, Some(&inner), &inner_task);
    d.on_parallel_end(&mut ctx, &inner);
    assert_eq!(inner.region.ref_count(), 0, "inner region must be destroyed before the outer one ends");
    assert_eq!(outer.region.ref_count(), 1, "outer region is untouched by the inner region's teardown");

    d.on_implicit_task_end(&mut ctx, Some(&outer), &outer_task);
    d.on_parallel_end(&mut ctx, &outer);
    assert_eq!(outer.region.ref_count(), 0);

    d.on_thread_end(ctx);
}

#[test]
fn scenario_4_explicit_task_chain_sources_edges_from_scope_begin_then_parent() {
    let (d, _dir) = new_dispatcher();

    let mut ctx = d.on_thread_begin(ThreadKind::Initial);
    d.on_implicit_task_begin(&mut ctx, None, None, OMPT_TASK_INITIAL, true);

    let parallel = d.on_parallel_begin(&mut ctx, 1, false);
    let implicit = d.on_implicit_task_begin(&mut ctx, Some(&parallel), None, OMPT_TASK_IMPLICIT, false);

    let t1 = d.on_task_create(&mut ctx, Some(&implicit), 0, false, false);
    let t2 = d.on_task_create(&mut ctx, Some(&t1), 0, false, false);

    assert!(d.graph().has_outgoing_edges(parallel.context.begin_node), "parallel-scope-begin -> T1");
    assert!(d.graph().has_outgoing_edges(t1.node), "T1 -> T2");
    assert_eq!(t2.payload.parent_id, Some(t1.payload.id));

    d.on_implicit_task_end(&mut ctx, Some(&parallel), &implicit);
    d.on_parallel_end(&mut ctx, &parallel);
    d.on_thread_end(ctx);
}

#[test]
fn scenario_5_worksharing_inside_parallel_round_trips_cleanly() {
    let (d, _dir) = new_dispatcher();

    let mut ctx = d.on_thread_begin(ThreadKind::Initial);
    d.on_implicit_task_begin(&mut ctx, None, None, OMPT_TASK_INITIAL, true);

    let parallel = d.on_parallel_begin(&mut ctx, 1, false);
    let implicit = d.on_implicit_task_begin(&mut ctx, Some(&parallel), None, OMPT_TASK_IMPLICIT, false);

    d.on_work_begin(&mut ctx, WorkKind::Loop, 8);
    d.on_work_end(&mut ctx, WorkKind::Loop);

    d.on_implicit_task_end(&mut ctx, Some(&parallel), &implicit);
    d.on_parallel_end(&mut ctx, &parallel);
    d.on_thread_end(ctx);

    // A non-task-generating workshare leaves no trace in the task graph.
    assert!(d.graph().node_count() > 0);
}

#[test]
fn scenario_5b_taskloop_worksharing_opens_and_closes_its_own_scope() {
    let (d, _dir) = new_dispatcher();

    let mut ctx = d.on_thread_begin(ThreadKind::Initial);
    d.on_implicit_task_begin(&mut ctx, None, None, OMPT_TASK_INITIAL, true);

    let parallel = d.on_parallel_begin(&mut ctx, 1, false);
    let implicit = d.on_implicit_task_begin(&mut ctx, Some(&parallel), None, OMPT_TASK_IMPLICIT, false);

    let before = d.graph().node_count();
    d.on_work_begin(&mut ctx, WorkKind::Taskloop, 4);
    d.on_work_end(&mut ctx, WorkKind::Taskloop);
    // Empty taskloop scope: begin and end nodes, joined directly.
    assert_eq!(d.graph().node_count(), before + 2);

    d.on_implicit_task_end(&mut ctx, Some(&parallel), &implicit);
    d.on_parallel_end(&mut ctx, &parallel);
    d.on_thread_end(ctx);
}

#[test]
fn scenario_6_sync_region_round_trips_with_matching_type() {
    let (d, _dir) = new_dispatcher();

    let mut ctx = d.on_thread_begin(ThreadKind::Initial);
    d.on_implicit_task_begin(&mut ctx, None, None, OMPT_TASK_INITIAL, true);

    let region_ref = d.on_sync_region_begin(&mut ctx, SyncKind::BarrierImplicit);
    d.on_sync_region_end(&mut ctx);

    assert_eq!(region_ref.0, 0, "region refs start at 0");
    d.on_thread_end(ctx);
}

#[test]
fn every_task_node_has_an_incoming_edge_from_a_valid_source() {
    // P5: source is the initial task, an enclosing parallel scope-begin, or
    // another task node. Every edge this dispatcher ever adds for a task
    // node originates at exactly one such node, so two edges in means two
    // sourced tasks.
    let (d, _dir) = new_dispatcher();

    let mut ctx = d.on_thread_begin(ThreadKind::Initial);
    d.on_implicit_task_begin(&mut ctx, None, None, OMPT_TASK_INITIAL, true);

    let root_task = d.on_task_create(&mut ctx, None, 0, false, false);
    let leaf_task = d.on_task_create(&mut ctx, Some(&root_task), 0, false, false);

    assert!(d.graph().has_outgoing_edges(root_task.node), "an edge must source from the initial task into root_task");
    assert_eq!(d.graph().edge_count(), 2);
    let _ = leaf_task;

    d.on_thread_end(ctx);
}
